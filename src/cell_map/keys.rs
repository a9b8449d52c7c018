//! Flat field names shared by the extractors and the canonicalizer.

use crate::models::{CreditColumn, Question, QuarterKey};

pub const COMPANY_NAME: &str = "company_name";
pub const DBA_NAME: &str = "dba_name";
pub const TAX_ID: &str = "tax_id";
pub const STREET_ADDRESS: &str = "street_address";
pub const CITY: &str = "city";
pub const STATE: &str = "state";
pub const ZIP_CODE: &str = "zip_code";
pub const CONTACT_FIRST_NAME: &str = "contact_first_name";
pub const CONTACT_LAST_NAME: &str = "contact_last_name";
pub const CONTACT_TITLE: &str = "contact_title";
pub const EMAIL: &str = "email";
pub const PHONE: &str = "phone";
pub const WEBSITE: &str = "website";
pub const INDUSTRY: &str = "industry";
pub const ENTITY_TYPE: &str = "entity_type";
pub const YEAR_FOUNDED: &str = "year_founded";
pub const REMARKS: &str = "remarks";
pub const PPP_FIRST_DRAW_FORGIVEN: &str = "ppp_first_draw_forgiven";
pub const PPP_SECOND_DRAW_FORGIVEN: &str = "ppp_second_draw_forgiven";

pub fn employees_key(year: u16) -> String {
    format!("employees_{year}")
}

pub fn owner_name_key(n: usize) -> String {
    format!("owner_{n}_name")
}

pub fn owner_percentage_key(n: usize) -> String {
    format!("owner_{n}_percentage")
}

/// `qq_2020_q1_government_shutdown`
pub fn qq_key(key: QuarterKey, question: Question) -> String {
    format!("qq_{}_q{}_{}", key.year, key.quarter.number(), question.key())
}

/// `revenue_2019_q1`
pub fn revenue_key(key: QuarterKey) -> String {
    format!("revenue_{}_q{}", key.year, key.quarter.number())
}

/// `credit_2020_q1_credit_wages`
pub fn credit_key(key: QuarterKey, column: CreditColumn) -> String {
    format!("credit_{}_q{}_{}", key.year, key.quarter.number(), column.key())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Quarter;

    #[test]
    fn key_formats() {
        let k = QuarterKey::new(2021, Quarter::Q3);
        assert_eq!(qq_key(k, Question::RevenueReduction20), "qq_2021_q3_revenue_reduction_20");
        assert_eq!(revenue_key(k), "revenue_2021_q3");
        assert_eq!(credit_key(k, CreditColumn::EmployeeCount), "credit_2021_q3_employee_count");
        assert_eq!(employees_key(2019), "employees_2019");
        assert_eq!(owner_percentage_key(2), "owner_2_percentage");
    }
}
