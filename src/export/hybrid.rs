//! Hybrid rows: generated bulk-upload fields plus quarterly claim columns,
//! with caller-supplied overrides layered on top.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;

use super::bulk_upload;
use super::derive::{
    claim_amounts, compound_amounts, format_amount, join_quarters, qualification_label, total_claim,
};
use super::fields::{ExportContext, GeneratorInput, GeneratorNote};
use super::links;
use super::writer::write_csv;
use crate::error::ExportError;
use crate::excel::write_table_xlsx;
use crate::models::{hybrid_quarters, quarters_of, CanonicalRecord, QuarterKey, REVENUE_YEARS};
use crate::services::coerce::parse_number;
use crate::types::{keys_match, OverrideMetadata};

pub const CLAIM_TOTAL: &str = "Claim Total";
pub const REFUNDED_BY_IRS: &str = "Refunded by IRS";
pub const DISALLOWED_BY_IRS: &str = "Disallowed by IRS";

const CLAIMED_QUARTERS: &str = "claimed_quarters";
const CLAIM_AMOUNTS: &str = "claim_amounts";
const TOTAL_CLAIM_AMOUNT: &str = "total_claim_amount";

/// `2Q20 Qualification`
pub fn qualification_column(key: QuarterKey) -> String {
    format!("{} Qualification", key.short_label())
}

/// `2Q20 Amount`
pub fn amount_column(key: QuarterKey) -> String {
    format!("{} Amount", key.short_label())
}

/// Quarterly columns appended after the bulk-upload fields.
pub fn quarterly_columns() -> &'static [String] {
    static COLUMNS: OnceLock<Vec<String>> = OnceLock::new();
    COLUMNS.get_or_init(|| {
        let mut cols = vec![CLAIM_TOTAL.to_string()];
        for key in hybrid_quarters() {
            cols.push(qualification_column(key));
            cols.push(amount_column(key));
        }
        cols.push(REFUNDED_BY_IRS.to_string());
        cols.push(DISALLOWED_BY_IRS.to_string());
        cols.extend(quarters_of(&REVENUE_YEARS).into_iter().map(|k| k.wage_label()));
        cols
    })
}

/// Bulk-upload names followed by the quarterly columns.
pub fn standard_columns() -> &'static [String] {
    static COLUMNS: OnceLock<Vec<String>> = OnceLock::new();
    COLUMNS.get_or_init(|| {
        let mut cols = bulk_upload::table().header();
        cols.extend(quarterly_columns().iter().cloned());
        cols
    })
}

fn standard_column(name: &str) -> Option<&'static str> {
    standard_columns()
        .iter()
        .find(|c| keys_match(c, name))
        .map(String::as_str)
}

fn is_amount_column(name: &str) -> bool {
    name.ends_with(" Amount")
        || name.starts_with("revenue_20")
        || name.starts_with("credit_wages_")
        || name.starts_with("ppp_")
        || matches!(
            name,
            CLAIM_TOTAL | REFUNDED_BY_IRS | DISALLOWED_BY_IRS | TOTAL_CLAIM_AMOUNT | "health_plan_expenses_total"
        )
        || quarters_of(&REVENUE_YEARS).iter().any(|k| k.wage_label() == name)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HybridRow {
    /// Keyed by standard column name.
    pub values: BTreeMap<String, String>,
    /// Metadata columns that are not standard columns, in input order.
    pub extras: Vec<(String, String)>,
    pub notes: Vec<GeneratorNote>,
}

impl HybridRow {
    pub fn get(&self, column: &str) -> Option<&str> {
        if let Some(v) = self.values.get(column) {
            return Some(v.as_str());
        }
        self.extras
            .iter()
            .find(|(k, _)| keys_match(k, column))
            .map(|(_, v)| v.as_str())
    }

    fn set(&mut self, column: impl Into<String>, value: impl Into<String>) {
        self.values.insert(column.into(), value.into());
    }
}

pub fn generate_hybrid_row(record: &CanonicalRecord, overrides: &OverrideMetadata, context: &ExportContext) -> HybridRow {
    let table = bulk_upload::table();
    let input = GeneratorInput::new(record, context).with_overrides(overrides);
    let (values, notes) = table.render_row(&input);

    let mut row = HybridRow {
        values: table.header().into_iter().zip(values).collect(),
        extras: Vec::new(),
        notes,
    };

    let amounts = claim_amounts(record);
    row.set(CLAIM_TOTAL, format_amount(total_claim(&amounts)));
    for key in hybrid_quarters() {
        row.set(qualification_column(key), qualification_label(record, key));
        let amount = amounts
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, a)| format_amount(*a))
            .unwrap_or_default();
        row.set(amount_column(key), amount);
    }
    row.set(REFUNDED_BY_IRS, "");
    row.set(DISALLOWED_BY_IRS, "");
    for key in quarters_of(&REVENUE_YEARS) {
        let wages = record
            .credit_wages_by_quarter
            .get(key)
            .map(|c| format_amount(c.qualified_wages))
            .unwrap_or_default();
        row.set(key.wage_label(), wages);
    }

    for (key, value) in overrides.iter() {
        match standard_column(key) {
            Some(column) => {
                let value = value.trim();
                if !value.is_empty() {
                    row.set(column, value);
                }
            }
            None => row.extras.push((key.trim().to_string(), value.to_string())),
        }
    }

    apply_quarter_overrides(&mut row, record, overrides);
    row
}

/// Rebuild the compound claim fields from per-quarter amounts when the
/// caller supplied any per-quarter value.
fn apply_quarter_overrides(row: &mut HybridRow, record: &CanonicalRecord, overrides: &OverrideMetadata) {
    let quarters = hybrid_quarters();
    let supplied = quarters.iter().any(|k| {
        overrides.non_empty(&amount_column(*k)).is_some() || overrides.non_empty(&qualification_column(*k)).is_some()
    });
    if !supplied {
        return;
    }

    let mut amounts: Vec<(QuarterKey, f64)> = claim_amounts(record)
        .into_iter()
        .filter(|(k, _)| !quarters.contains(k))
        .collect();
    for key in quarters {
        let column = amount_column(key);
        let raw = row.values.get(&column).cloned().unwrap_or_default();
        if raw.trim().is_empty() {
            continue;
        }
        match parse_number(&raw) {
            Ok(amount) => {
                row.set(column, format_amount(amount));
                amounts.push((key, amount));
            }
            Err(e) => row.notes.push(GeneratorNote {
                field: column,
                message: e.to_string(),
            }),
        }
    }
    amounts.sort_by_key(|(k, _)| *k);

    let keys: Vec<QuarterKey> = amounts.iter().map(|(k, _)| *k).collect();
    let total = format_amount(total_claim(&amounts));
    row.set(CLAIMED_QUARTERS, join_quarters(&keys));
    row.set(CLAIM_AMOUNTS, compound_amounts(&amounts));
    row.set(TOTAL_CLAIM_AMOUNT, total.clone());
    row.set(CLAIM_TOTAL, total);
}

/// Rows of one batch flattened under a shared header.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CombinedExport {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl CombinedExport {
    /// Header: standard columns, then custom columns in first-seen order.
    pub fn from_rows<'a>(rows: impl IntoIterator<Item = &'a HybridRow>) -> Self {
        let rows: Vec<&HybridRow> = rows.into_iter().collect();
        let mut header: Vec<String> = standard_columns().to_vec();
        for row in &rows {
            for (key, _) in &row.extras {
                if !header.iter().any(|h| keys_match(h, key)) {
                    header.push(key.clone());
                }
            }
        }
        let table = rows
            .iter()
            .map(|row| {
                header
                    .iter()
                    .map(|col| row.get(col).unwrap_or_default().to_string())
                    .collect()
            })
            .collect();
        Self { header, rows: table }
    }

    pub fn remove_links(&mut self) -> usize {
        links::remove_links(&self.header, &mut self.rows)
    }

    pub fn to_csv(&self) -> Result<String, ExportError> {
        write_csv(&self.header, &self.rows)
    }

    pub fn write_xlsx(&self, path: &Path) -> Result<(), ExportError> {
        write_table_xlsx(path, "Batch Export", &self.header, &self.rows, is_amount_column)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{canonicalize, StrictExtractor, WorkbookExtractor};
    use crate::test_support::sample_workbook;
    use chrono::{TimeZone, Utc};

    fn sample_record() -> CanonicalRecord {
        canonicalize(&StrictExtractor::new().extract(&sample_workbook()).unwrap())
    }

    fn ctx() -> ExportContext {
        ExportContext::at(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap())
    }

    #[test]
    fn quarterly_columns_are_laid_out_in_order() {
        let cols = quarterly_columns();
        assert_eq!(cols.len(), 1 + 14 + 2 + 12);
        assert_eq!(cols[0], "Claim Total");
        assert_eq!(cols[1], "2Q20 Qualification");
        assert_eq!(cols[2], "2Q20 Amount");
        assert_eq!(cols[14], "4Q21 Amount");
        assert_eq!(cols[15], "Refunded by IRS");
        assert_eq!(cols[17], "19Q1");
        assert_eq!(cols[28], "21Q4");
        assert_eq!(standard_columns().len(), bulk_upload::FIELD_COUNT + cols.len());
    }

    #[test]
    fn generated_values_fill_quarterly_columns() {
        let row = generate_hybrid_row(&sample_record(), &OverrideMetadata::new(), &ctx());
        assert_eq!(row.get("Claim Total"), Some("160000.00"));
        assert_eq!(row.get("2Q20 Qualification"), Some("Government Order"));
        assert_eq!(row.get("2Q20 Amount"), Some("50000.00"));
        assert_eq!(row.get("4Q20 Amount"), Some(""));
        assert_eq!(row.get("19Q1"), Some(""));
        assert_eq!(row.get("20Q2"), Some("55000.00"));
        assert_eq!(row.get("case_id"), Some("SC123456789001"));
        assert!(row.extras.is_empty());
    }

    #[test]
    fn quarter_override_rebuilds_compound_fields() {
        let overrides: OverrideMetadata = [("2Q20 Amount", "500.00")].into_iter().collect();
        let row = generate_hybrid_row(&sample_record(), &overrides, &ctx());
        let amounts = row.get("claim_amounts").unwrap();
        assert!(amounts.contains("2020Q2:500.00"), "{amounts}");
        assert!(!amounts.contains("2020Q2:50000.00"));
        assert_eq!(row.get("2Q20 Amount"), Some("500.00"));
        assert_eq!(row.get("total_claim_amount"), Some("110500.00"));
        assert_eq!(row.get("Claim Total"), Some("110500.00"));
    }

    #[test]
    fn compound_beats_explicit_override() {
        let overrides: OverrideMetadata = [("claim_amounts", "typed by hand"), ("4Q20 Amount", "1,250")]
            .into_iter()
            .collect();
        let row = generate_hybrid_row(&sample_record(), &overrides, &ctx());
        let amounts = row.get("claim_amounts").unwrap();
        assert!(amounts.contains("2020Q4:1250.00"));
        assert!(!amounts.contains("typed"));
        assert_eq!(
            row.get("claimed_quarters"),
            Some("2020Q2,2020Q3,2020Q4,2021Q1,2021Q2")
        );
    }

    #[test]
    fn explicit_override_beats_generated_and_extras_pass_through() {
        let overrides: OverrideMetadata = [
            ("Company_Name", "Override Co"),
            ("dba_name", "  "),
            ("Account Manager", "Pat"),
        ]
        .into_iter()
        .collect();
        let row = generate_hybrid_row(&sample_record(), &overrides, &ctx());
        assert_eq!(row.get("company_name"), Some("Override Co"));
        assert_eq!(row.get("dba_name"), Some("Sample Co"));
        assert_eq!(row.extras, vec![("Account Manager".to_string(), "Pat".to_string())]);
    }

    #[test]
    fn combined_header_appends_extras_in_first_seen_order() {
        let record = sample_record();
        let a = generate_hybrid_row(&record, &[("Notes", "x")].into_iter().collect(), &ctx());
        let b = generate_hybrid_row(
            &record,
            &[("Rep", "Pat"), ("notes", "y")].into_iter().collect(),
            &ctx(),
        );
        let combined = CombinedExport::from_rows([&a, &b]);
        let n = standard_columns().len();
        assert_eq!(&combined.header[n..], ["Notes".to_string(), "Rep".to_string()]);
        assert_eq!(combined.rows[1][n], "y");
        assert_eq!(combined.rows[0][n + 1], "");
    }

    #[test]
    fn remove_links_keeps_email() {
        let record = sample_record();
        let overrides: OverrideMetadata =
            [("Notes", "https://docs.google.com/spreadsheets/d/abc")].into_iter().collect();
        let mut combined = CombinedExport::from_rows([&generate_hybrid_row(&record, &overrides, &ctx())]);
        combined.remove_links();
        let col = |name: &str| combined.header.iter().position(|h| h == name).unwrap();
        assert_eq!(combined.rows[0][col("Notes")], "");
        assert_eq!(combined.rows[0][col("website")], "");
        assert_eq!(combined.rows[0][col("email")], "jane@samplecompany.com");
        assert_eq!(combined.rows[0][col("company_name")], "Sample Company LLC");
    }

    #[test]
    fn writes_xlsx_with_amount_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("batch.xlsx");
        let combined = CombinedExport::from_rows([&generate_hybrid_row(
            &sample_record(),
            &OverrideMetadata::new(),
            &ctx(),
        )]);
        combined.write_xlsx(&path).unwrap();
        assert!(path.exists());
        assert!(is_amount_column("2Q20 Amount"));
        assert!(is_amount_column("21Q3"));
        assert!(!is_amount_column("2Q20 Qualification"));
    }
}
