//! Cell-address extraction against the declared source map.

use super::coerce::{coerce, zero_value};
use super::excel_scanner::normalize_label;
use super::extraction::WorkbookExtractor;
use crate::cell_map::{CellMapConfig, CellMapping, ExpectedType, MappingRole};
use crate::error::{CoerceError, ExtractionError};
use crate::excel::{Sheet, WorkbookHandle};
use crate::types::{CellValue, ExtractedValues, ExtractionMethod};

pub struct StrictExtractor {
    config: &'static CellMapConfig,
}

impl StrictExtractor {
    pub fn new() -> Self {
        Self::with_config(CellMapConfig::source())
    }

    pub fn with_config(config: &'static CellMapConfig) -> Self {
        Self { config }
    }

    fn check_label(&self, sheet: &Sheet, mapping: &CellMapping, expected: &str, out: &mut ExtractedValues) {
        let cell = sheet.get(mapping.address);
        if cell.is_empty() {
            return;
        }
        let found = cell.as_text();
        if normalize_label(&found) != normalize_label(expected) {
            out.warn(
                mapping.field.as_str(),
                Some(sheet.location(mapping.address)),
                format!("Expected label {:?}, found {:?}; rows may have shifted", expected, found),
            );
        }
    }

    fn read_value(&self, sheet: &Sheet, mapping: &CellMapping, out: &mut ExtractedValues) {
        let cell = sheet.get(mapping.address);
        let location = sheet.location(mapping.address);
        if cell.is_empty() {
            out.warn(mapping.field.as_str(), Some(location), "Empty cell, defaulted");
            out.insert(mapping.field.as_str(), zero_value(mapping.expected));
            return;
        }
        match coerce(cell, mapping.expected) {
            Ok(value) => {
                if mapping.expected == ExpectedType::Text && matches!(cell, CellValue::Number(_)) {
                    out.warn(mapping.field.as_str(), Some(location), "Numeric cell read as text");
                }
                out.insert(mapping.field.as_str(), value);
            }
            // No lenient fallback for percentages.
            Err(e @ CoerceError::NotPercentage(_)) => {
                out.error(mapping.field.as_str(), Some(location), e.to_string());
                out.insert(mapping.field.as_str(), zero_value(mapping.expected));
            }
            Err(e) => {
                out.warn(mapping.field.as_str(), Some(location), format!("{e}, defaulted"));
                out.insert(mapping.field.as_str(), zero_value(mapping.expected));
            }
        }
    }
}

impl Default for StrictExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkbookExtractor for StrictExtractor {
    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::Strict
    }

    fn precondition(&self, workbook: &WorkbookHandle) -> Result<(), ExtractionError> {
        if workbook.is_empty() {
            return Err(ExtractionError::EmptyWorkbook);
        }
        match workbook.sheet(self.config.primary_sheet) {
            Some(_) => Ok(()),
            None => Err(ExtractionError::PrimarySheetMissing(self.config.primary_sheet.to_string())),
        }
    }

    fn extract(&self, workbook: &WorkbookHandle) -> Result<ExtractedValues, ExtractionError> {
        self.precondition(workbook)?;
        let mut out = ExtractedValues::new(ExtractionMethod::Strict);

        for aux in &self.config.auxiliary_sheets {
            if workbook.sheet(aux).is_none() {
                out.warn(*aux, None, "Sheet missing; its fields default to zero");
            }
        }

        for mapping in self.config.mappings() {
            let Some(sheet) = workbook.sheet(mapping.sheet) else {
                continue;
            };
            match &mapping.role {
                MappingRole::Label { expected } => self.check_label(sheet, mapping, expected, &mut out),
                MappingRole::DataValue => self.read_value(sheet, mapping, &mut out),
            }
        }

        tracing::debug!(
            fields = out.len(),
            warnings = out.warnings.len(),
            errors = out.errors.len(),
            "Strict extraction finished"
        );
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell_map::{keys, GROSS_RECEIPTS_SHEET, PRIMARY_SHEET};
    use crate::excel::CellAddress;
    use crate::test_support::sample_workbook;
    use crate::types::FieldValue;

    #[test]
    fn reads_sample_questionnaire() {
        let values = StrictExtractor::new().extract(&sample_workbook()).unwrap();
        assert!(values.is_success(), "{:?}", values.errors);
        assert_eq!(values.get(keys::COMPANY_NAME), Some(&FieldValue::Text("Sample Company LLC".into())));
        assert_eq!(values.get(keys::ZIP_CODE), Some(&FieldValue::Text("62701".into())));
        assert_eq!(values.get("owner_1_percentage"), Some(&FieldValue::Number(60.0)));
        assert_eq!(values.get("employees_2021"), Some(&FieldValue::Number(42.0)));
        assert_eq!(values.get(keys::PPP_FIRST_DRAW_FORGIVEN), Some(&FieldValue::Number(100_000.0)));
        assert_eq!(values.get("standard_full_shutdown"), Some(&FieldValue::Boolean(true)));
        assert_eq!(values.get("qq_2020_q2_government_shutdown"), Some(&FieldValue::Boolean(true)));
        assert_eq!(values.get("qq_2020_q1_government_shutdown"), Some(&FieldValue::Boolean(false)));
        assert_eq!(values.get("revenue_2020_q2"), Some(&FieldValue::Number(40_000.0)));
        assert_eq!(values.get("credit_2021_q4_credit_wages"), Some(&FieldValue::Number(5_000.0)));
        assert!(values.warnings.iter().any(|w| w.field == keys::ZIP_CODE));
    }

    #[test]
    fn missing_primary_sheet_fails_precondition() {
        let mut wb = sample_workbook();
        wb.remove_sheet(PRIMARY_SHEET);
        let err = StrictExtractor::new().precondition(&wb).unwrap_err();
        assert!(matches!(err, ExtractionError::PrimarySheetMissing(_)));
    }

    #[test]
    fn missing_auxiliary_sheet_is_a_warning() {
        let mut wb = sample_workbook();
        wb.remove_sheet(GROSS_RECEIPTS_SHEET);
        let values = StrictExtractor::new().extract(&wb).unwrap();
        assert!(values.is_success());
        assert!(values.warnings.iter().any(|w| w.field == GROSS_RECEIPTS_SHEET));
        assert!(!values.contains("revenue_2019_q1"));
    }

    #[test]
    fn bad_values_are_lenient_except_percentages() {
        let mut wb = sample_workbook();
        let sheet = wb.sheet_mut(PRIMARY_SHEET).unwrap();
        sheet.set(CellAddress::at('B', 18), "nineteen-ninety");
        sheet.set(CellAddress::at('B', 29), "perhaps");
        sheet.set(CellAddress::at('B', 20), "most of it");
        sheet.set(CellAddress::at('B', 4), "");

        let values = StrictExtractor::new().extract(&wb).unwrap();
        assert_eq!(values.get(keys::YEAR_FOUNDED), Some(&FieldValue::Number(0.0)));
        assert_eq!(values.get("standard_full_shutdown"), Some(&FieldValue::Boolean(false)));
        assert_eq!(values.get(keys::DBA_NAME), Some(&FieldValue::Text(String::new())));
        assert_eq!(values.errors.len(), 1);
        assert_eq!(values.errors[0].field, "owner_1_percentage");
        assert_eq!(values.errors[0].location.as_deref(), Some("Questionnaire!B20"));
    }

    #[test]
    fn shifted_label_warns() {
        let mut wb = sample_workbook();
        wb.sheet_mut(PRIMARY_SHEET)
            .unwrap()
            .set(CellAddress::at('A', 3), "Legal Entity");
        let values = StrictExtractor::new().extract(&wb).unwrap();
        assert!(values
            .warnings
            .iter()
            .any(|w| w.field == keys::COMPANY_NAME && w.message.contains("shifted")));
    }
}
