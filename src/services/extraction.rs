//! Extraction strategies behind one interface, and the strict → heuristic
//! fallback that picks between them.

use crate::error::ExtractionError;
use crate::excel::WorkbookHandle;
use crate::types::{ExtractedValues, ExtractionMethod};

/// A way of reading the questionnaire out of a workbook.
pub trait WorkbookExtractor: Send + Sync {
    fn method(&self) -> ExtractionMethod;

    /// Structural check run before `extract`. An error here means this
    /// strategy cannot read the workbook at all.
    fn precondition(&self, workbook: &WorkbookHandle) -> Result<(), ExtractionError>;

    /// Read every field. Non-fatal issues go into the returned warnings;
    /// fatal value errors go into `errors`.
    fn extract(&self, workbook: &WorkbookHandle) -> Result<ExtractedValues, ExtractionError>;
}

/// Run `primary`, falling back to `fallback` when the primary's precondition
/// fails or its result carries fatal errors.
pub fn extract_with_fallback(
    workbook: &WorkbookHandle,
    primary: &dyn WorkbookExtractor,
    fallback: &dyn WorkbookExtractor,
) -> Result<ExtractedValues, ExtractionError> {
    let primary_err = match run_checked(workbook, primary) {
        Ok(values) => return Ok(values),
        Err(e) => e,
    };
    tracing::info!(
        primary = %primary.method(),
        fallback = %fallback.method(),
        reason = %primary_err,
        "Falling back to secondary extraction"
    );
    match run_checked(workbook, fallback) {
        Ok(values) => Ok(values),
        Err(fallback_err) => {
            tracing::warn!(error = %fallback_err, "Fallback extraction failed");
            Err(ExtractionError::BothFailed {
                strict: Box::new(primary_err),
                heuristic: Box::new(fallback_err),
            })
        }
    }
}

fn run_checked(workbook: &WorkbookHandle, extractor: &dyn WorkbookExtractor) -> Result<ExtractedValues, ExtractionError> {
    extractor.precondition(workbook)?;
    let values = extractor.extract(workbook)?;
    if let Some(first) = values.errors.first() {
        return Err(ExtractionError::FatalValues {
            count: values.errors.len(),
            first: first.to_string(),
        });
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FieldValue;

    struct Fixed {
        method: ExtractionMethod,
        precondition_ok: bool,
        fatal: bool,
    }

    impl WorkbookExtractor for Fixed {
        fn method(&self) -> ExtractionMethod {
            self.method
        }

        fn precondition(&self, _workbook: &WorkbookHandle) -> Result<(), ExtractionError> {
            if self.precondition_ok {
                Ok(())
            } else {
                Err(ExtractionError::PrimarySheetMissing("Questionnaire".into()))
            }
        }

        fn extract(&self, _workbook: &WorkbookHandle) -> Result<ExtractedValues, ExtractionError> {
            let mut values = ExtractedValues::new(self.method);
            values.insert("company_name", FieldValue::Text(self.method.to_string()));
            if self.fatal {
                values.error("owner_1_percentage", None, "not a percentage");
            }
            Ok(values)
        }
    }

    fn fixed(method: ExtractionMethod, precondition_ok: bool, fatal: bool) -> Fixed {
        Fixed {
            method,
            precondition_ok,
            fatal,
        }
    }

    #[test]
    fn primary_used_when_it_succeeds() {
        let wb = WorkbookHandle::default();
        let strict = fixed(ExtractionMethod::Strict, true, false);
        let heuristic = fixed(ExtractionMethod::Heuristic, true, false);
        let values = extract_with_fallback(&wb, &strict, &heuristic).unwrap();
        assert_eq!(values.method, ExtractionMethod::Strict);
    }

    #[test]
    fn falls_back_on_precondition_or_fatal_error() {
        let wb = WorkbookHandle::default();
        let heuristic = fixed(ExtractionMethod::Heuristic, true, false);

        let missing_sheet = fixed(ExtractionMethod::Strict, false, false);
        let values = extract_with_fallback(&wb, &missing_sheet, &heuristic).unwrap();
        assert_eq!(values.method, ExtractionMethod::Heuristic);

        let fatal = fixed(ExtractionMethod::Strict, true, true);
        let values = extract_with_fallback(&wb, &fatal, &heuristic).unwrap();
        assert_eq!(values.method, ExtractionMethod::Heuristic);
    }

    #[test]
    fn both_failing_reports_both_reasons() {
        let wb = WorkbookHandle::default();
        let strict = fixed(ExtractionMethod::Strict, false, false);
        let heuristic = fixed(ExtractionMethod::Heuristic, false, false);
        let err = extract_with_fallback(&wb, &strict, &heuristic).unwrap_err();
        assert!(matches!(err, ExtractionError::BothFailed { .. }));
        assert!(err.to_string().contains("Questionnaire"));
    }

    #[test]
    fn extractor_trait_is_object_safe() {
        fn _assert(_: &dyn WorkbookExtractor) {}
        let boxed: Box<dyn WorkbookExtractor> = Box::new(fixed(ExtractionMethod::Strict, true, false));
        _assert(boxed.as_ref());
    }
}
