//! Bulk-upload CSV layout: 52 comma-separated fields.

use std::sync::OnceLock;

use super::derive::{
    affected_quarters, case_id, claim_amounts, claimed_quarters, compound_amounts, format_amount, join_quarters,
    large_employer, number_or_blank, owner_names, ownership_percentages, total_claim, trigger_narrative,
};
use super::fields::{FieldTable, FieldType, GeneratorInput};
use crate::models::{quarters_of, CreditColumn, REVENUE_YEARS};
use crate::services::canonicalizer::revenue_decline_quarters;

pub const FIELD_COUNT: usize = 52;

pub fn table() -> &'static FieldTable {
    static TABLE: OnceLock<FieldTable> = OnceLock::new();
    TABLE.get_or_init(build)
}

fn build() -> FieldTable {
    let mut b = FieldTable::builder("bulk_upload")
        .field("case_id", FieldType::Text, |input: &GeneratorInput<'_>| {
            case_id(input.record, &input.context.sequence_suffix)
        })
        .required()
        .field("upload_date", FieldType::Date, |input: &GeneratorInput<'_>| {
            Ok(input.context.upload_date())
        })
        .record_field("company_name", FieldType::Text, |r| r.company_info.company_name.clone())
        .required()
        .record_field("dba_name", FieldType::Text, |r| r.company_info.dba_name.clone())
        .record_field("tax_id", FieldType::Text, |r| r.company_info.tax_id.clone())
        .required()
        .record_field("entity_type", FieldType::Text, |r| r.company_info.entity_type.clone())
        .record_field("industry", FieldType::Text, |r| r.company_info.industry.clone())
        .record_field("year_founded", FieldType::Number, |r| {
            number_or_blank(f64::from(r.company_info.year_founded))
        })
        .record_field("street_address", FieldType::Text, |r| r.company_info.address.street.clone())
        .required()
        .record_field("city", FieldType::Text, |r| r.company_info.address.city.clone())
        .required()
        .record_field("state", FieldType::Text, |r| r.company_info.address.state.clone())
        .required()
        .record_field("zip_code", FieldType::Text, |r| r.company_info.address.zip.clone())
        .required()
        .record_field("contact_first_name", FieldType::Text, |r| r.company_info.contact.first_name.clone())
        .record_field("contact_last_name", FieldType::Text, |r| r.company_info.contact.last_name.clone())
        .record_field("contact_title", FieldType::Text, |r| r.company_info.contact.title.clone())
        .record_field("email", FieldType::Text, |r| r.company_info.contact.email.clone())
        .record_field("phone", FieldType::Text, |r| r.company_info.contact.phone.clone())
        .record_field("website", FieldType::Text, |r| r.company_info.website.clone())
        .record_field("owner_names", FieldType::List, owner_names)
        .record_field("ownership_percentages", FieldType::List, ownership_percentages)
        .record_field("employees_2019", FieldType::Number, |r| {
            number_or_blank(f64::from(r.company_info.headcount.y2019))
        })
        .record_field("employees_2020", FieldType::Number, |r| {
            number_or_blank(f64::from(r.company_info.headcount.y2020))
        })
        .record_field("employees_2021", FieldType::Number, |r| {
            number_or_blank(f64::from(r.company_info.headcount.y2021))
        })
        .field("large_employer_2020", FieldType::Boolean, |input: &GeneratorInput<'_>| {
            large_employer(input.record, 2020)
        })
        .default_value("No")
        .field("large_employer_2021", FieldType::Boolean, |input: &GeneratorInput<'_>| {
            large_employer(input.record, 2021)
        })
        .default_value("No")
        .record_field("operational_triggers", FieldType::List, trigger_narrative)
        .record_field("affected_quarters", FieldType::List, |r| join_quarters(&affected_quarters(r)))
        .record_field("claimed_quarters", FieldType::List, |r| join_quarters(&claimed_quarters(r)))
        .record_field("claim_amounts", FieldType::List, |r| compound_amounts(&claim_amounts(r)))
        .record_field("total_claim_amount", FieldType::Currency, |r| {
            format_amount(total_claim(&claim_amounts(r)))
        });

    for key in quarters_of(&REVENUE_YEARS) {
        let name = format!("revenue_{}_q{}", key.year, key.quarter.number());
        b = b
            .record_field(name, FieldType::Currency, move |r| {
                format_amount(r.revenue_by_quarter.get(key).unwrap_or(0.0))
            })
            .required();
    }

    b.record_field("revenue_decline_quarters", FieldType::List, |r| {
        join_quarters(&revenue_decline_quarters(r))
    })
    .record_field("credit_wages_2020_total", FieldType::Currency, |r| {
        format_amount(r.credit_wages_by_quarter.year_total(2020, CreditColumn::CreditWages))
    })
    .record_field("credit_wages_2021_total", FieldType::Currency, |r| {
        format_amount(r.credit_wages_by_quarter.year_total(2021, CreditColumn::CreditWages))
    })
    .record_field("health_plan_expenses_total", FieldType::Currency, |r| {
        let c = &r.credit_wages_by_quarter;
        format_amount(
            c.year_total(2020, CreditColumn::HealthPlanExpenses) + c.year_total(2021, CreditColumn::HealthPlanExpenses),
        )
    })
    .record_field("ppp_first_draw_forgiven", FieldType::Currency, |r| {
        format_amount(r.loan_forgiveness.first_draw_forgiven)
    })
    .record_field("ppp_second_draw_forgiven", FieldType::Currency, |r| {
        format_amount(r.loan_forgiveness.second_draw_forgiven)
    })
    .record_field("validation_status", FieldType::Text, |r| r.metadata.validation_status.to_string())
    .record_field("missing_fields", FieldType::List, |r| r.metadata.missing_fields.join(";"))
    .record_field("remarks", FieldType::Text, |r| r.company_info.remarks.clone())
    .record_field("extraction_method", FieldType::Text, |r| r.metadata.extraction_method.to_string())
    .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn header_has_52_unique_fields() {
        let header = table().header();
        assert_eq!(header.len(), FIELD_COUNT);
        let unique: HashSet<&String> = header.iter().collect();
        assert_eq!(unique.len(), FIELD_COUNT);
        assert_eq!(header[0], "case_id");
        assert_eq!(header[30], "revenue_2019_q1");
        assert_eq!(header[41], "revenue_2021_q4");
        assert_eq!(header[51], "extraction_method");
    }

    #[test]
    fn required_fields_cover_identity_and_revenue() {
        let required: Vec<&str> = table()
            .fields()
            .iter()
            .filter(|f| f.required)
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(required.len(), 7 + 12);
        assert!(required.contains(&"zip_code"));
        assert!(!required.contains(&"email"));
    }
}
