//! Flat extracted values → [`CanonicalRecord`].
//!
//! Total: any input, including an empty map, yields a record with every
//! year/quarter subtree present.

use super::coerce::{field_as_bool, field_as_number, field_as_percentage, field_as_text};
use crate::cell_map::keys;
use crate::models::{
    quarters_of, CanonicalRecord, CreditColumn, OwnershipEntry, Question, QuarterKey, ShutdownStandard, ValidationStatus,
    CREDIT_YEARS, HEADCOUNT_YEARS, QUESTION_YEARS, REVENUE_YEARS,
};
use crate::types::{ExtractedValues, ExtractionMethod};

/// Owners are read until this index or the first gap.
const MAX_OWNERS: usize = 25;

struct Reader<'a> {
    values: &'a ExtractedValues,
}

impl Reader<'_> {
    fn text(&self, key: &str) -> String {
        self.values.get(key).map(field_as_text).unwrap_or_default()
    }

    fn number(&self, key: &str) -> f64 {
        self.values.get(key).map(field_as_number).unwrap_or(0.0)
    }

    fn whole(&self, key: &str) -> u32 {
        let n = self.number(key);
        if n.is_finite() && n > 0.0 {
            n.round().min(f64::from(u32::MAX)) as u32
        } else {
            0
        }
    }

    fn flag(&self, key: &str) -> bool {
        self.values.get(key).map(field_as_bool).unwrap_or(false)
    }
}

pub fn canonicalize(values: &ExtractedValues) -> CanonicalRecord {
    let r = Reader { values };
    let mut record = CanonicalRecord::default();

    let info = &mut record.company_info;
    info.company_name = r.text(keys::COMPANY_NAME);
    info.dba_name = r.text(keys::DBA_NAME);
    info.tax_id = r.text(keys::TAX_ID);
    info.entity_type = r.text(keys::ENTITY_TYPE);
    info.industry = r.text(keys::INDUSTRY);
    info.year_founded = r.whole(keys::YEAR_FOUNDED);
    info.website = r.text(keys::WEBSITE);
    info.remarks = r.text(keys::REMARKS);
    info.address.street = r.text(keys::STREET_ADDRESS);
    info.address.city = r.text(keys::CITY);
    info.address.state = r.text(keys::STATE);
    info.address.zip = r.text(keys::ZIP_CODE);
    info.contact.first_name = r.text(keys::CONTACT_FIRST_NAME);
    info.contact.last_name = r.text(keys::CONTACT_LAST_NAME);
    info.contact.title = r.text(keys::CONTACT_TITLE);
    info.contact.email = r.text(keys::EMAIL);
    info.contact.phone = r.text(keys::PHONE);
    for year in HEADCOUNT_YEARS {
        if let Some(slot) = info.headcount.get_mut(year) {
            *slot = r.whole(&keys::employees_key(year));
        }
    }

    for standard in ShutdownStandard::ALL {
        record.operational_triggers.set(standard, r.flag(standard.key()));
    }

    for key in quarters_of(&QUESTION_YEARS) {
        if let Some(triggers) = record.qualifying_questions.get_mut(key) {
            for question in Question::ALL {
                triggers.set(question, r.flag(&keys::qq_key(key, question)));
            }
        }
    }

    for key in quarters_of(&REVENUE_YEARS) {
        if let Some(slot) = record.revenue_by_quarter.get_mut(key) {
            *slot = r.number(&keys::revenue_key(key));
        }
    }

    for key in quarters_of(&CREDIT_YEARS) {
        if let Some(credit) = record.credit_wages_by_quarter.get_mut(key) {
            for column in CreditColumn::ALL {
                credit.set(column, r.number(&keys::credit_key(key, column)));
            }
        }
    }

    record.loan_forgiveness.first_draw_forgiven = r.number(keys::PPP_FIRST_DRAW_FORGIVEN);
    record.loan_forgiveness.second_draw_forgiven = r.number(keys::PPP_SECOND_DRAW_FORGIVEN);

    record.ownership = ownership(values);

    let missing = missing_critical_fields(&record);
    record.metadata.validation_status = if !values.errors.is_empty() {
        ValidationStatus::Invalid
    } else if !missing.is_empty() {
        ValidationStatus::Partial
    } else {
        ValidationStatus::Valid
    };
    record.metadata.missing_fields = missing;
    record.metadata.extraction_method = values.method;
    record.metadata.warning_count = values.warnings.len();

    tracing::debug!(
        status = %record.metadata.validation_status,
        missing = record.metadata.missing_fields.len(),
        owners = record.ownership.len(),
        "Record canonicalized"
    );
    record
}

fn ownership(values: &ExtractedValues) -> Vec<OwnershipEntry> {
    let mut owners = Vec::new();
    for n in 1..=MAX_OWNERS {
        let name_key = keys::owner_name_key(n);
        let pct_key = keys::owner_percentage_key(n);
        if !values.contains(&name_key) && !values.contains(&pct_key) {
            break;
        }
        let name = values.get(&name_key).map(field_as_text).unwrap_or_default();
        let percentage = values.get(&pct_key).map(field_as_percentage).unwrap_or(0.0);
        if name.is_empty() && percentage == 0.0 {
            continue;
        }
        owners.push(OwnershipEntry { name, percentage });
    }
    owners
}

/// Critical values left at zero, as dotted paths.
pub fn missing_critical_fields(record: &CanonicalRecord) -> Vec<String> {
    let mut missing = Vec::new();
    for key in quarters_of(&REVENUE_YEARS) {
        if record.revenue_by_quarter.get(key).unwrap_or(0.0) == 0.0 {
            missing.push(format!("revenue.{}", key.path()));
        }
    }
    for key in quarters_of(&CREDIT_YEARS) {
        let wages = record
            .credit_wages_by_quarter
            .get(key)
            .map(|c| c.credit_wages)
            .unwrap_or(0.0);
        if wages == 0.0 {
            missing.push(format!("creditWages.{}", key.path()));
        }
    }
    missing
}

/// Zeroed record for batch rows that have no workbook.
pub fn empty_record() -> CanonicalRecord {
    let mut record = CanonicalRecord::default();
    record.metadata.validation_status = ValidationStatus::Partial;
    record.metadata.missing_fields = missing_critical_fields(&record);
    record.metadata.extraction_method = ExtractionMethod::None;
    record
}

/// Quarters whose revenue fell below the year's threshold share of the same 2019 quarter.
pub fn revenue_decline_quarters(record: &CanonicalRecord) -> Vec<QuarterKey> {
    quarters_of(&QUESTION_YEARS)
        .into_iter()
        .filter(|key| {
            let base = record
                .revenue_by_quarter
                .get(QuarterKey::new(2019, key.quarter))
                .unwrap_or(0.0);
            let current = record.revenue_by_quarter.get(*key).unwrap_or(0.0);
            let ratio = if key.year <= 2020 { 0.5 } else { 0.8 };
            base > 0.0 && current < base * ratio
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Quarter;
    use crate::services::extraction::WorkbookExtractor;
    use crate::services::strict_extractor::StrictExtractor;
    use crate::test_support::sample_workbook;
    use crate::types::FieldValue;

    fn sample_record() -> CanonicalRecord {
        let values = StrictExtractor::new().extract(&sample_workbook()).unwrap();
        canonicalize(&values)
    }

    #[test]
    fn empty_map_yields_total_record() {
        let record = canonicalize(&ExtractedValues::default());
        for key in quarters_of(&REVENUE_YEARS) {
            assert_eq!(record.revenue_by_quarter.get(key), Some(0.0));
        }
        for key in quarters_of(&CREDIT_YEARS) {
            assert!(record.credit_wages_by_quarter.get(key).is_some());
            assert!(record.qualifying_questions.get(key).is_some());
        }
        assert_eq!(record.metadata.validation_status, ValidationStatus::Partial);
        assert_eq!(record.metadata.missing_fields.len(), 12 + 8);
        assert_eq!(record.metadata.missing_fields[0], "revenue.2019.Q1");
        assert!(record.metadata.missing_fields.contains(&"creditWages.2020.Q3".to_string()));
        assert!(record.ownership.is_empty());
    }

    #[test]
    fn sample_is_valid_and_nested() {
        let record = sample_record();
        assert_eq!(record.metadata.validation_status, ValidationStatus::Valid, "{:?}", record.metadata);
        assert_eq!(record.company_info.company_name, "Sample Company LLC");
        assert_eq!(record.company_info.address.zip, "62701");
        assert_eq!(record.company_info.headcount.y2021, 42);
        assert_eq!(record.company_info.year_founded, 2004);
        assert!(record.operational_triggers.full_shutdown);
        assert!(!record.operational_triggers.reduced_hours);
        let q2 = record.qualifying_questions.get(QuarterKey::new(2020, Quarter::Q2)).unwrap();
        assert!(q2.government_shutdown && q2.revenue_reduction_50);
        assert_eq!(record.revenue_by_quarter.y2020.q2, 40_000.0);
        assert_eq!(record.credit_wages_by_quarter.y2021.q1.credit_wages, 30_000.0);
        assert_eq!(record.loan_forgiveness.total(), 150_000.0);
        assert_eq!(
            record.ownership,
            vec![OwnershipEntry {
                name: "Jane Doe".into(),
                percentage: 60.0
            }]
        );
        assert_eq!(record.metadata.extraction_method, ExtractionMethod::Strict);
    }

    #[test]
    fn fatal_errors_mark_record_invalid() {
        let mut values = ExtractedValues::new(ExtractionMethod::Strict);
        values.error("owner_1_percentage", None, "not a percentage");
        assert_eq!(canonicalize(&values).metadata.validation_status, ValidationStatus::Invalid);
    }

    #[test]
    fn ownership_percentages_are_normalized() {
        let mut values = ExtractedValues::new(ExtractionMethod::Heuristic);
        values.insert("owner_1_name", FieldValue::Text("A".into()));
        values.insert("owner_1_percentage", FieldValue::Boolean(true));
        values.insert("owner_2_name", FieldValue::Text("B".into()));
        values.insert("owner_2_percentage", FieldValue::Text("0.25".into()));
        values.insert("owner_3_name", FieldValue::Text("C".into()));
        values.insert("owner_3_percentage", FieldValue::Text("15%".into()));
        let owners = canonicalize(&values).ownership;
        let pcts: Vec<f64> = owners.iter().map(|o| o.percentage).collect();
        assert_eq!(pcts, vec![100.0, 25.0, 15.0]);
    }

    #[test]
    fn empty_record_lists_every_critical_field() {
        let record = empty_record();
        assert_eq!(record.metadata.validation_status, ValidationStatus::Partial);
        assert_eq!(record.metadata.missing_fields.len(), 20);
        assert_eq!(record.metadata.extraction_method, ExtractionMethod::None);
    }

    #[test]
    fn decline_quarters_follow_year_thresholds() {
        let labels: Vec<String> = revenue_decline_quarters(&sample_record())
            .iter()
            .map(|k| k.label())
            .collect();
        assert_eq!(labels, vec!["2020Q2", "2021Q1", "2021Q2"]);
    }
}
