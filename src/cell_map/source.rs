//! The questionnaire layout: one table drives both the extractor's cell map
//! and the blank template workbook.

use super::keys;
use super::{
    CellMapConfig, CellMapping, ExpectedType, MappingRole, Section, GROSS_RECEIPTS_SHEET, PAYROLL_CREDITS_SHEET,
    PRIMARY_SHEET,
};
use crate::excel::{CellAddress, Sheet, WorkbookHandle};
use crate::models::{
    qualifying_quarters, CreditColumn, Question, Quarter, QuarterKey, ShutdownStandard, REVENUE_YEARS,
};

const LABEL_COL: char = 'A';
const VALUE_COL: char = 'B';

/// (row, field, type, label) for company identity on the primary sheet.
const COMPANY_ROWS: &[(u32, &str, ExpectedType, &str)] = &[
    (3, keys::COMPANY_NAME, ExpectedType::Text, "Company Name"),
    (4, keys::DBA_NAME, ExpectedType::Text, "DBA Name"),
    (5, keys::TAX_ID, ExpectedType::Text, "EIN / Tax ID"),
    (6, keys::STREET_ADDRESS, ExpectedType::Text, "Street Address"),
    (7, keys::CITY, ExpectedType::Text, "City"),
    (8, keys::STATE, ExpectedType::Text, "State"),
    (9, keys::ZIP_CODE, ExpectedType::Text, "Zip Code"),
    (10, keys::CONTACT_FIRST_NAME, ExpectedType::Text, "Contact First Name"),
    (11, keys::CONTACT_LAST_NAME, ExpectedType::Text, "Contact Last Name"),
    (12, keys::CONTACT_TITLE, ExpectedType::Text, "Contact Title"),
    (13, keys::EMAIL, ExpectedType::Text, "Email"),
    (14, keys::PHONE, ExpectedType::Text, "Phone"),
    (15, keys::WEBSITE, ExpectedType::Text, "Website"),
    (16, keys::INDUSTRY, ExpectedType::Text, "Industry"),
    (17, keys::ENTITY_TYPE, ExpectedType::Text, "Entity Type"),
    (18, keys::YEAR_FOUNDED, ExpectedType::Number, "Year Founded"),
    (19, "owner_1_name", ExpectedType::Text, "Primary Owner Name"),
    (20, "owner_1_percentage", ExpectedType::Percentage, "Primary Owner Percentage"),
    (22, "employees_2019", ExpectedType::Number, "Full Time Employees 2019"),
    (23, "employees_2020", ExpectedType::Number, "Full Time Employees 2020"),
    (24, "employees_2021", ExpectedType::Number, "Full Time Employees 2021"),
    (25, keys::REMARKS, ExpectedType::Text, "Remarks"),
];

const LOAN_ROWS: &[(u32, &str, ExpectedType, &str)] = &[
    (26, keys::PPP_FIRST_DRAW_FORGIVEN, ExpectedType::Number, "PPP First Draw Forgiven"),
    (27, keys::PPP_SECOND_DRAW_FORGIVEN, ExpectedType::Number, "PPP Second Draw Forgiven"),
];

const STANDARDS_FIRST_ROW: u32 = 29;
const QUESTION_HEADER_ROW: u32 = 37;
const QUESTION_FIRST_ROW: u32 = 38;
const QUESTION_FIRST_COL: char = 'C';
const REVENUE_HEADER_ROW: u32 = 4;
const CREDIT_FIRST_ROWS: [(u16, u32); 2] = [(2020, 5), (2021, 11)];

pub(super) fn build() -> CellMapConfig {
    CellMapConfig {
        primary_sheet: PRIMARY_SHEET,
        auxiliary_sheets: vec![GROSS_RECEIPTS_SHEET, PAYROLL_CREDITS_SHEET],
        sections: vec![
            labelled_section("company_info", COMPANY_ROWS),
            labelled_section("loan_forgiveness", LOAN_ROWS),
            standards_section(),
            questions_section(),
            revenue_section(),
            credit_section(),
        ],
    }
}

fn labelled_section(name: &'static str, rows: &[(u32, &str, ExpectedType, &str)]) -> Section {
    let mut mappings = Vec::with_capacity(rows.len() * 2);
    for &(row, field, expected, label) in rows {
        mappings.push(CellMapping::label(PRIMARY_SHEET, CellAddress::at(LABEL_COL, row), field, label));
        mappings.push(CellMapping::value(PRIMARY_SHEET, CellAddress::at(VALUE_COL, row), field, expected));
    }
    Section { name, mappings }
}

fn standards_section() -> Section {
    let mut mappings = Vec::new();
    for (i, standard) in ShutdownStandard::ALL.into_iter().enumerate() {
        let row = STANDARDS_FIRST_ROW + i as u32;
        mappings.push(CellMapping::label(
            PRIMARY_SHEET,
            CellAddress::at(LABEL_COL, row),
            standard.key(),
            standard.label(),
        ));
        mappings.push(CellMapping::value(
            PRIMARY_SHEET,
            CellAddress::at(VALUE_COL, row),
            standard.key(),
            ExpectedType::Boolean,
        ));
    }
    Section {
        name: "shutdown_standards",
        mappings,
    }
}

fn question_col(index: usize) -> u32 {
    CellAddress::at(QUESTION_FIRST_COL, 1).col + index as u32
}

fn questions_section() -> Section {
    let mut mappings = Vec::new();
    let quarters = qualifying_quarters();
    for (i, key) in quarters.iter().enumerate() {
        mappings.push(CellMapping::label(
            PRIMARY_SHEET,
            CellAddress::new(QUESTION_HEADER_ROW - 1, question_col(i)),
            format!("qq_{}_q{}", key.year, key.quarter.number()),
            key.label(),
        ));
    }
    for (qi, question) in Question::ALL.into_iter().enumerate() {
        let row = QUESTION_FIRST_ROW + qi as u32;
        mappings.push(CellMapping::label(
            PRIMARY_SHEET,
            CellAddress::at(LABEL_COL, row),
            question.key(),
            question.text(),
        ));
        for (i, key) in quarters.iter().enumerate() {
            mappings.push(CellMapping::value(
                PRIMARY_SHEET,
                CellAddress::new(row - 1, question_col(i)),
                keys::qq_key(*key, question),
                ExpectedType::Boolean,
            ));
        }
    }
    Section {
        name: "qualifying_questions",
        mappings,
    }
}

fn revenue_section() -> Section {
    let mut mappings = Vec::new();
    for (yi, year) in REVENUE_YEARS.into_iter().enumerate() {
        let col = 1 + yi as u32;
        mappings.push(CellMapping::label(
            GROSS_RECEIPTS_SHEET,
            CellAddress::new(REVENUE_HEADER_ROW - 1, col),
            format!("revenue_{year}"),
            year.to_string(),
        ));
        for quarter in Quarter::ALL {
            let row = REVENUE_HEADER_ROW + u32::from(quarter.number());
            mappings.push(CellMapping::value(
                GROSS_RECEIPTS_SHEET,
                CellAddress::new(row - 1, col),
                keys::revenue_key(QuarterKey::new(year, quarter)),
                ExpectedType::Number,
            ));
        }
    }
    Section {
        name: "gross_receipts",
        mappings,
    }
}

fn credit_section() -> Section {
    let mut mappings = Vec::new();
    for (year, first_row) in CREDIT_FIRST_ROWS {
        for quarter in Quarter::ALL {
            let row = first_row + u32::from(quarter.number()) - 1;
            mappings.push(CellMapping::label(
                PAYROLL_CREDITS_SHEET,
                CellAddress::at(LABEL_COL, row),
                format!("credit_{}_q{}", year, quarter.number()),
                quarter.to_string(),
            ));
            for (ci, column) in CreditColumn::ALL.into_iter().enumerate() {
                mappings.push(CellMapping::value(
                    PAYROLL_CREDITS_SHEET,
                    CellAddress::new(row - 1, 1 + ci as u32),
                    keys::credit_key(QuarterKey::new(year, quarter), column),
                    ExpectedType::Number,
                ));
            }
        }
    }
    Section {
        name: "payroll_credits",
        mappings,
    }
}

/// A blank questionnaire: every label and header in place, no answers.
pub fn template_workbook() -> WorkbookHandle {
    let config = CellMapConfig::source();
    let mut primary = Sheet::new(PRIMARY_SHEET);
    let mut receipts = Sheet::new(GROSS_RECEIPTS_SHEET);
    let mut credits = Sheet::new(PAYROLL_CREDITS_SHEET);

    primary.set(CellAddress::at('A', 1), "Employee Retention Credit Questionnaire");
    primary.set(CellAddress::at('A', 28), "Shutdown Standards");
    primary.set(CellAddress::at('A', 36), "Qualifying Questions");
    receipts.set(CellAddress::at('A', 1), "Quarterly Gross Receipts");
    receipts.set(CellAddress::at('A', REVENUE_HEADER_ROW), "Quarter");
    credits.set(CellAddress::at('A', 1), "Payroll Credits");
    for (year, first_row) in CREDIT_FIRST_ROWS {
        let header_row = first_row - 1;
        credits.set(CellAddress::at('A', header_row), year.to_string());
        for (ci, column) in CreditColumn::ALL.into_iter().enumerate() {
            credits.set(CellAddress::new(header_row - 1, 1 + ci as u32), column.label());
        }
    }
    for quarter in Quarter::ALL {
        let row = REVENUE_HEADER_ROW + u32::from(quarter.number());
        receipts.set(CellAddress::at('A', row), quarter.to_string());
    }

    for mapping in config.mappings() {
        if let MappingRole::Label { expected } = &mapping.role {
            let sheet = match mapping.sheet {
                GROSS_RECEIPTS_SHEET => &mut receipts,
                PAYROLL_CREDITS_SHEET => &mut credits,
                _ => &mut primary,
            };
            sheet.set(mapping.address, expected.as_str());
        }
    }
    WorkbookHandle::new(vec![primary, receipts, credits])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_has_labels_and_no_values() {
        let wb = template_workbook();
        let primary = wb.sheet(PRIMARY_SHEET).unwrap();
        assert_eq!(primary.get(CellAddress::at('A', 3)).as_text(), "Company Name");
        assert!(primary.get(CellAddress::at('B', 3)).is_empty());
        assert_eq!(primary.get(CellAddress::at('C', 37)).as_text(), "2020Q1");
        assert_eq!(primary.get(CellAddress::at('I', 37)).as_text(), "2021Q3");

        let receipts = wb.sheet(GROSS_RECEIPTS_SHEET).unwrap();
        assert_eq!(receipts.get(CellAddress::at('D', 4)).as_text(), "2021");
        assert_eq!(receipts.get(CellAddress::at('A', 8)).as_text(), "Q4");

        let credits = wb.sheet(PAYROLL_CREDITS_SHEET).unwrap();
        assert_eq!(credits.get(CellAddress::at('A', 10)).as_text(), "2021");
        assert_eq!(credits.get(CellAddress::at('D', 10)).as_text(), "Credit Wages");
        assert_eq!(credits.get(CellAddress::at('A', 11)).as_text(), "Q1");
    }
}
