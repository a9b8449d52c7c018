//! Shared fixtures for unit tests.

use crate::cell_map::{keys, template_workbook, CellMapConfig};
use crate::excel::WorkbookHandle;
use crate::models::{CreditColumn, Question, Quarter, QuarterKey};
use crate::types::CellValue;

pub const REVENUE: [(u16, [f64; 4]); 3] = [
    (2019, [100_000.0, 100_000.0, 100_000.0, 100_000.0]),
    (2020, [100_000.0, 40_000.0, 60_000.0, 90_000.0]),
    (2021, [70_000.0, 75_000.0, 95_000.0, 100_000.0]),
];

pub const CREDIT_WAGES: [(u16, [f64; 4]); 2] = [
    (2020, [10_000.0, 50_000.0, 45_000.0, 20_000.0]),
    (2021, [30_000.0, 35_000.0, 40_000.0, 5_000.0]),
];

/// Questions answered "Yes": (year, quarter, question).
pub const YES_ANSWERS: &[(u16, u8, Question)] = &[
    (2020, 2, Question::GovernmentShutdown),
    (2020, 3, Question::GovernmentShutdown),
    (2021, 1, Question::SupplyDisruption),
    (2020, 2, Question::RevenueReduction50),
    (2021, 1, Question::RevenueReduction20),
    (2021, 2, Question::RevenueReduction20),
    (2020, 4, Question::ReducedHours),
];

fn set_field(wb: &mut WorkbookHandle, field: &str, value: impl Into<CellValue>) {
    let config = CellMapConfig::source();
    let mapping = config.find(field).unwrap_or_else(|| panic!("unknown field {field}"));
    wb.sheet_or_insert(mapping.sheet).set(mapping.address, value);
}

/// The blank template filled with a complete, valid questionnaire.
pub fn sample_workbook() -> WorkbookHandle {
    let mut wb = template_workbook();
    set_field(&mut wb, keys::COMPANY_NAME, "Sample Company LLC");
    set_field(&mut wb, keys::DBA_NAME, "Sample Co");
    set_field(&mut wb, keys::TAX_ID, "12-3456789");
    set_field(&mut wb, keys::STREET_ADDRESS, "100 Main Street");
    set_field(&mut wb, keys::CITY, "Springfield");
    set_field(&mut wb, keys::STATE, "IL");
    set_field(&mut wb, keys::ZIP_CODE, 62701.0);
    set_field(&mut wb, keys::CONTACT_FIRST_NAME, "Jane");
    set_field(&mut wb, keys::CONTACT_LAST_NAME, "Doe");
    set_field(&mut wb, keys::CONTACT_TITLE, "CFO");
    set_field(&mut wb, keys::EMAIL, "jane@samplecompany.com");
    set_field(&mut wb, keys::PHONE, "555-0100");
    set_field(&mut wb, keys::WEBSITE, "https://samplecompany.com");
    set_field(&mut wb, keys::INDUSTRY, "Restaurants");
    set_field(&mut wb, keys::ENTITY_TYPE, "LLC");
    set_field(&mut wb, keys::YEAR_FOUNDED, 2004.0);
    set_field(&mut wb, "owner_1_name", "Jane Doe");
    set_field(&mut wb, "owner_1_percentage", 0.6);
    set_field(&mut wb, "employees_2019", 40.0);
    set_field(&mut wb, "employees_2020", 38.0);
    set_field(&mut wb, "employees_2021", "42");
    set_field(&mut wb, keys::REMARKS, "Dining room closed by county order");
    set_field(&mut wb, keys::PPP_FIRST_DRAW_FORGIVEN, "$100,000.00");
    set_field(&mut wb, keys::PPP_SECOND_DRAW_FORGIVEN, 50_000.0);
    set_field(&mut wb, "standard_full_shutdown", "Yes");
    set_field(&mut wb, "standard_supply_chain", true);
    set_field(&mut wb, "standard_reduced_hours", "no");

    for &(year, quarter, question) in YES_ANSWERS {
        let key = QuarterKey::new(year, quarter_of(quarter));
        set_field(&mut wb, &keys::qq_key(key, question), "Yes");
    }
    for (year, amounts) in REVENUE {
        for (q, amount) in Quarter::ALL.into_iter().zip(amounts) {
            set_field(&mut wb, &keys::revenue_key(QuarterKey::new(year, q)), amount);
        }
    }
    for (year, amounts) in CREDIT_WAGES {
        for (q, amount) in Quarter::ALL.into_iter().zip(amounts) {
            let key = QuarterKey::new(year, q);
            set_field(&mut wb, &keys::credit_key(key, CreditColumn::CreditWages), amount);
            set_field(&mut wb, &keys::credit_key(key, CreditColumn::QualifiedWages), amount + 5_000.0);
            set_field(&mut wb, &keys::credit_key(key, CreditColumn::HealthPlanExpenses), 1_000.0);
            set_field(&mut wb, &keys::credit_key(key, CreditColumn::EmployeeCount), 12.0);
        }
    }
    wb
}

fn quarter_of(n: u8) -> Quarter {
    Quarter::from_number(n).unwrap_or_else(|| panic!("bad quarter {n}"))
}
