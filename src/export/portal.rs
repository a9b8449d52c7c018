//! Portal upload layout: 51 tab-separated fields.

use std::sync::OnceLock;

use super::derive::{
    case_id, format_amount, is_claimed, number_or_blank, ownership_summary, trigger_narrative, yes_no,
};
use super::fields::{FieldTable, FieldType, GeneratorInput};
use crate::models::{qualifying_quarters, quarters_of, CreditColumn, CREDIT_YEARS, REVENUE_YEARS};

pub const FIELD_COUNT: usize = 51;

pub fn table() -> &'static FieldTable {
    static TABLE: OnceLock<FieldTable> = OnceLock::new();
    TABLE.get_or_init(build)
}

fn build() -> FieldTable {
    let mut b = FieldTable::builder("portal")
        .record_field("Client Name", FieldType::Text, |r| r.company_info.company_name.clone())
        .required()
        .record_field("DBA", FieldType::Text, |r| r.company_info.dba_name.clone())
        .record_field("EIN", FieldType::Text, |r| r.company_info.tax_id.clone())
        .required()
        .record_field("Entity Type", FieldType::Text, |r| r.company_info.entity_type.clone())
        .record_field("Industry", FieldType::Text, |r| r.company_info.industry.clone())
        .record_field("Address Line 1", FieldType::Text, |r| r.company_info.address.street.clone())
        .required()
        .record_field("City", FieldType::Text, |r| r.company_info.address.city.clone())
        .required()
        .record_field("State", FieldType::Text, |r| r.company_info.address.state.clone())
        .required()
        .record_field("Postal Code", FieldType::Text, |r| r.company_info.address.zip.clone())
        .required()
        .record_field("Primary Contact", FieldType::Text, |r| r.company_info.contact.full_name())
        .record_field("Contact Title", FieldType::Text, |r| r.company_info.contact.title.clone())
        .record_field("Contact Email", FieldType::Text, |r| r.company_info.contact.email.clone())
        .record_field("Contact Phone", FieldType::Text, |r| r.company_info.contact.phone.clone())
        .record_field("Website", FieldType::Text, |r| r.company_info.website.clone())
        .record_field("Ownership Summary", FieldType::List, ownership_summary)
        .record_field("FTE 2019", FieldType::Number, |r| {
            number_or_blank(f64::from(r.company_info.headcount.y2019))
        })
        .record_field("FTE 2020", FieldType::Number, |r| {
            number_or_blank(f64::from(r.company_info.headcount.y2020))
        })
        .record_field("FTE 2021", FieldType::Number, |r| {
            number_or_blank(f64::from(r.company_info.headcount.y2021))
        })
        .record_field("Remarks", FieldType::Text, |r| r.company_info.remarks.clone());

    for key in qualifying_quarters() {
        b = b.record_field(format!("{} Eligible", key.portal_label()), FieldType::Boolean, move |r| {
            yes_no(is_claimed(r, key))
        });
    }
    for key in quarters_of(&CREDIT_YEARS) {
        b = b.record_field(
            format!("{} Qualified Wages", key.portal_label()),
            FieldType::Currency,
            move |r| {
                let wages = r
                    .credit_wages_by_quarter
                    .get(key)
                    .map(|c| c.get(CreditColumn::QualifiedWages))
                    .unwrap_or(0.0);
                format_amount(wages)
            },
        );
    }
    for key in quarters_of(&REVENUE_YEARS) {
        b = b
            .record_field(format!("{} Gross Receipts", key.portal_label()), FieldType::Currency, move |r| {
                format_amount(r.revenue_by_quarter.get(key).unwrap_or(0.0))
            })
            .required();
    }

    b.field("Claim Reference", FieldType::Text, |input: &GeneratorInput<'_>| {
        case_id(input.record, &input.context.sequence_suffix)
    })
    .required()
    .record_field("Shutdown Narrative", FieldType::Text, trigger_narrative)
    .record_field("Total Credit Wages", FieldType::Currency, |r| {
        let c = &r.credit_wages_by_quarter;
        format_amount(c.year_total(2020, CreditColumn::CreditWages) + c.year_total(2021, CreditColumn::CreditWages))
    })
    .record_field("PPP Forgiveness Total", FieldType::Currency, |r| {
        format_amount(r.loan_forgiveness.total())
    })
    .record_field("Record Status", FieldType::Text, |r| r.metadata.validation_status.to_string())
    .build()
}

/// Tabs and line breaks inside a value would split the record.
pub fn sanitize_value(value: &str) -> String {
    value.replace(['\t', '\r', '\n'], " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn header_has_51_unique_fields() {
        let header = table().header();
        assert_eq!(header.len(), FIELD_COUNT);
        assert_eq!(header.iter().collect::<HashSet<_>>().len(), FIELD_COUNT);
        assert_eq!(header[18], "Remarks");
        assert_eq!(header[19], "Q1 2020 Eligible");
        assert_eq!(header[25], "Q3 2021 Eligible");
        assert_eq!(header[26], "Q1 2020 Qualified Wages");
        assert_eq!(header[34], "Q1 2019 Gross Receipts");
        assert_eq!(header[46], "Claim Reference");
        assert_eq!(header[50], "Record Status");
    }

    #[test]
    fn tabs_become_spaces() {
        assert_eq!(sanitize_value("a\tb\nc"), "a b c");
    }
}
