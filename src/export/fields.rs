//! Ordered output-field tables. Each field binds a name to a generator: a
//! pure function from the canonical record to one string value.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::GeneratorError;
use crate::models::CanonicalRecord;
use crate::types::OverrideMetadata;

pub const DEFAULT_SEQUENCE_SUFFIX: &str = "001";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Number,
    Currency,
    Date,
    Boolean,
    List,
}

impl FieldType {
    /// Blank text counts as absent; numeric fields also treat zero as absent.
    pub fn is_absent(self, value: &str) -> bool {
        let v = value.trim();
        if v.is_empty() {
            return true;
        }
        match self {
            FieldType::Number | FieldType::Currency => v.parse::<f64>().is_ok_and(|n| n == 0.0),
            _ => false,
        }
    }
}

/// Everything a generator may read besides the record. The upload timestamp
/// is the only wall-clock input; fixing it makes exports reproducible.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportContext {
    pub uploaded_at: DateTime<Utc>,
    pub sequence_suffix: String,
}

impl ExportContext {
    pub fn now() -> Self {
        Self::at(Utc::now())
    }

    pub fn at(uploaded_at: DateTime<Utc>) -> Self {
        Self {
            uploaded_at,
            sequence_suffix: DEFAULT_SEQUENCE_SUFFIX.to_string(),
        }
    }

    pub fn upload_date(&self) -> String {
        self.uploaded_at.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

pub struct GeneratorInput<'a> {
    pub record: &'a CanonicalRecord,
    pub context: &'a ExportContext,
    pub overrides: Option<&'a OverrideMetadata>,
}

impl<'a> GeneratorInput<'a> {
    pub fn new(record: &'a CanonicalRecord, context: &'a ExportContext) -> Self {
        Self {
            record,
            context,
            overrides: None,
        }
    }

    pub fn with_overrides(mut self, overrides: &'a OverrideMetadata) -> Self {
        self.overrides = Some(overrides);
        self
    }
}

pub type Generator = Box<dyn Fn(&GeneratorInput<'_>) -> Result<String, GeneratorError> + Send + Sync>;

pub struct OutputFieldSpec {
    pub ordinal: usize,
    pub name: String,
    pub field_type: FieldType,
    pub required: bool,
    pub default_value: &'static str,
    generator: Generator,
}

impl OutputFieldSpec {
    pub fn generate(&self, input: &GeneratorInput<'_>) -> Result<String, GeneratorError> {
        (self.generator)(input)
    }
}

impl std::fmt::Debug for OutputFieldSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputFieldSpec")
            .field("ordinal", &self.ordinal)
            .field("name", &self.name)
            .field("field_type", &self.field_type)
            .field("required", &self.required)
            .field("default_value", &self.default_value)
            .finish_non_exhaustive()
    }
}

/// A generator failed and its field fell back to the default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorNote {
    pub field: String,
    pub message: String,
}

#[derive(Debug)]
pub struct FieldTable {
    name: &'static str,
    fields: Vec<OutputFieldSpec>,
}

impl FieldTable {
    pub fn builder(name: &'static str) -> FieldTableBuilder {
        FieldTableBuilder {
            name,
            fields: Vec::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn fields(&self) -> &[OutputFieldSpec] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn header(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// One value per field, in ordinal order. Failing generators yield the
    /// field default and a note.
    pub fn render_row(&self, input: &GeneratorInput<'_>) -> (Vec<String>, Vec<GeneratorNote>) {
        let mut notes = Vec::new();
        let values = self
            .fields
            .iter()
            .map(|spec| match spec.generate(input) {
                Ok(v) => v,
                Err(e) => {
                    tracing::debug!(table = self.name, field = %spec.name, error = %e, "Generator fell back to default");
                    notes.push(GeneratorNote {
                        field: spec.name.clone(),
                        message: e.to_string(),
                    });
                    spec.default_value.to_string()
                }
            })
            .collect();
        (values, notes)
    }

    /// Names of required fields whose generated value is absent or whose
    /// generator failed.
    pub fn missing_required(&self, input: &GeneratorInput<'_>) -> Vec<String> {
        self.fields
            .iter()
            .filter(|spec| spec.required)
            .filter(|spec| match spec.generate(input) {
                Ok(v) => spec.field_type.is_absent(&v),
                Err(_) => true,
            })
            .map(|spec| spec.name.clone())
            .collect()
    }
}

pub struct FieldTableBuilder {
    name: &'static str,
    fields: Vec<OutputFieldSpec>,
}

impl FieldTableBuilder {
    /// Append a field; ordinals follow insertion order starting at 1.
    pub fn field<G>(mut self, name: impl Into<String>, field_type: FieldType, generator: G) -> Self
    where
        G: Fn(&GeneratorInput<'_>) -> Result<String, GeneratorError> + Send + Sync + 'static,
    {
        self.fields.push(OutputFieldSpec {
            ordinal: self.fields.len() + 1,
            name: name.into(),
            field_type,
            required: false,
            default_value: "",
            generator: Box::new(generator),
        });
        self
    }

    /// Append a field computed from the record alone.
    pub fn record_field<F>(self, name: impl Into<String>, field_type: FieldType, f: F) -> Self
    where
        F: Fn(&CanonicalRecord) -> String + Send + Sync + 'static,
    {
        self.field(name, field_type, move |input: &GeneratorInput<'_>| Ok(f(input.record)))
    }

    /// Mark the last field required.
    pub fn required(mut self) -> Self {
        if let Some(last) = self.fields.last_mut() {
            last.required = true;
        }
        self
    }

    /// Set the last field's fallback value.
    pub fn default_value(mut self, value: &'static str) -> Self {
        if let Some(last) = self.fields.last_mut() {
            last.default_value = value;
        }
        self
    }

    pub fn build(self) -> FieldTable {
        FieldTable {
            name: self.name,
            fields: self.fields,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn table() -> FieldTable {
        FieldTable::builder("test")
            .record_field("name", FieldType::Text, |r| r.company_info.company_name.clone())
            .required()
            .field("fails", FieldType::Text, |_| Err(GeneratorError::MissingInput("anything")))
            .default_value("n/a")
            .field("uploaded", FieldType::Date, |input| Ok(input.context.upload_date()))
            .build()
    }

    #[test]
    fn ordinals_are_contiguous_from_one() {
        let t = table();
        let ordinals: Vec<usize> = t.fields().iter().map(|f| f.ordinal).collect();
        assert_eq!(ordinals, vec![1, 2, 3]);
        assert!(t.fields()[0].required);
        assert_eq!(t.header(), vec!["name", "fails", "uploaded"]);
    }

    #[test]
    fn failing_generator_falls_back_with_note() {
        let mut record = CanonicalRecord::default();
        record.company_info.company_name = "Acme".into();
        let ctx = ExportContext::at(Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap());
        let (values, notes) = table().render_row(&GeneratorInput::new(&record, &ctx));
        assert_eq!(values, vec!["Acme", "n/a", "2024-03-01 09:30:00"]);
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].field, "fails");
    }

    #[test]
    fn absent_values_by_type() {
        assert!(FieldType::Text.is_absent("  "));
        assert!(!FieldType::Text.is_absent("0"));
        assert!(FieldType::Currency.is_absent("0.00"));
        assert!(!FieldType::Currency.is_absent("12.50"));
        assert!(FieldType::Number.is_absent(""));
    }

    #[test]
    fn missing_required_reads_only_required_fields() {
        let ctx = ExportContext::at(Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap());
        let blank = CanonicalRecord::default();
        let input = GeneratorInput::new(&blank, &ctx);
        assert_eq!(table().missing_required(&input), vec!["name"]);

        let mut record = CanonicalRecord::default();
        record.company_info.company_name = "Acme".into();
        assert!(table().missing_required(&GeneratorInput::new(&record, &ctx)).is_empty());
    }
}
