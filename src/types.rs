use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Raw content of one workbook cell.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl CellValue {
    /// Whitespace-only text counts as empty.
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Display text of the cell. Integral numbers render without a fraction.
    pub fn as_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.trim().to_string(),
            CellValue::Number(n) => format_plain_number(*n),
            CellValue::Bool(b) => b.to_string(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Bool(b)
    }
}

/// Render a number the way a spreadsheet shows it: `12` not `12.0`.
pub fn format_plain_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// One extracted primitive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Boolean(bool),
    Number(f64),
    Text(String),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Boolean(b) => write!(f, "{b}"),
            FieldValue::Number(n) => write!(f, "{}", format_plain_number(*n)),
            FieldValue::Text(s) => write!(f, "{s}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMethod {
    Strict,
    Heuristic,
    /// No workbook was read (metadata-only batch rows).
    #[default]
    None,
}

impl fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExtractionMethod::Strict => "strict",
            ExtractionMethod::Heuristic => "heuristic",
            ExtractionMethod::None => "none",
        };
        f.write_str(s)
    }
}

/// A warning or error raised while reading one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionIssue {
    pub field: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub message: String,
}

impl fmt::Display for ExtractionIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(loc) => write!(f, "{} ({}): {}", self.field, loc, self.message),
            None => write!(f, "{}: {}", self.field, self.message),
        }
    }
}

/// Flat field map produced by one extraction attempt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedValues {
    pub method: ExtractionMethod,
    pub values: BTreeMap<String, FieldValue>,
    pub warnings: Vec<ExtractionIssue>,
    pub errors: Vec<ExtractionIssue>,
}

impl ExtractedValues {
    pub fn new(method: ExtractionMethod) -> Self {
        Self {
            method,
            ..Default::default()
        }
    }

    pub fn insert(&mut self, field: impl Into<String>, value: FieldValue) {
        self.values.insert(field.into(), value);
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.values.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.values.contains_key(field)
    }

    pub fn warn(&mut self, field: impl Into<String>, location: Option<String>, message: impl Into<String>) {
        self.warnings.push(ExtractionIssue {
            field: field.into(),
            location,
            message: message.into(),
        });
    }

    pub fn error(&mut self, field: impl Into<String>, location: Option<String>, message: impl Into<String>) {
        self.errors.push(ExtractionIssue {
            field: field.into(),
            location,
            message: message.into(),
        });
    }

    /// True when no fatal error was recorded.
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Caller-supplied per-row values, in input column order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OverrideMetadata {
    entries: Vec<(String, String)>,
}

impl OverrideMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Later duplicates of a key replace the earlier value in place.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| keys_match(k, &key)) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Case-insensitive, whitespace-trimmed key lookup.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| keys_match(k, key))
            .map(|(_, v)| v.as_str())
    }

    /// Like `get` but treats blank values as absent.
    pub fn non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).map(str::trim).filter(|v| !v.is_empty())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn has_any_value(&self) -> bool {
        self.entries.iter().any(|(_, v)| !v.trim().is_empty())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for OverrideMetadata {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut meta = OverrideMetadata::new();
        for (k, v) in iter {
            meta.insert(k, v);
        }
        meta
    }
}

pub fn keys_match(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}
