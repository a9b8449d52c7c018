//! Raw cell → primitive coercion.
//!
//! The `coerce_*` functions are strict and return a [`CoerceError`]. The
//! `lenient_*` variants never fail and degrade to the type's zero value; the
//! heuristic extractor uses those.

use crate::cell_map::ExpectedType;
use crate::error::CoerceError;
use crate::types::{format_plain_number, CellValue, FieldValue};

const CURRENCY_CHARS: &[char] = &['$', '€', '£', '¥', ',', '\u{a0}', ' ', '\''];

/// Parse a numeric string the way a bookkeeper writes it: currency symbols,
/// thousands separators and accounting parentheses are accepted.
pub fn parse_number(raw: &str) -> Result<f64, CoerceError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(CoerceError::Empty);
    }
    let (negative, body) = match trimmed.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
        Some(inner) => (true, inner),
        None => (false, trimmed),
    };
    let cleaned: String = body.chars().filter(|c| !CURRENCY_CHARS.contains(c)).collect();
    let cleaned = cleaned.trim_start_matches("USD").trim_end_matches("USD");
    if cleaned.is_empty() {
        return Err(CoerceError::NotNumeric(raw.to_string()));
    }
    let n: f64 = cleaned
        .parse()
        .map_err(|_| CoerceError::NotNumeric(raw.to_string()))?;
    if !n.is_finite() {
        return Err(CoerceError::NotNumeric(raw.to_string()));
    }
    Ok(if negative { -n } else { n })
}

pub fn coerce_number(cell: &CellValue) -> Result<f64, CoerceError> {
    match cell {
        CellValue::Empty => Err(CoerceError::Empty),
        CellValue::Number(n) => Ok(*n),
        CellValue::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        CellValue::Text(s) => parse_number(s),
    }
}

/// Yes/no coercion. Any numeric value resolves by truthiness, so `"3"` is
/// true and `"0.0"` is false. Empty is false.
pub fn coerce_bool(cell: &CellValue) -> Result<bool, CoerceError> {
    match cell {
        CellValue::Empty => Ok(false),
        CellValue::Bool(b) => Ok(*b),
        CellValue::Number(n) => Ok(*n != 0.0),
        CellValue::Text(s) => {
            let token = s.trim().to_lowercase();
            match token.as_str() {
                "true" | "yes" | "y" | "1" | "x" | "✓" => Ok(true),
                "false" | "no" | "n" | "0" | "" | "-" | "n/a" => Ok(false),
                _ => parse_number(&token)
                    .map(|n| n != 0.0)
                    .map_err(|_| CoerceError::NotBoolean(s.clone())),
            }
        }
    }
}

/// Percentage on the 0–100 scale. Numbers up to 1 are fractions; larger
/// numbers and `%`-suffixed text are already scaled.
pub fn coerce_percentage(cell: &CellValue) -> Result<f64, CoerceError> {
    match cell {
        CellValue::Empty => Err(CoerceError::Empty),
        CellValue::Bool(b) => Ok(if *b { 100.0 } else { 0.0 }),
        CellValue::Number(n) => Ok(scale_fraction(*n)),
        CellValue::Text(s) => {
            let t = s.trim();
            if let Some(body) = t.strip_suffix('%') {
                return parse_number(body).map_err(|_| CoerceError::NotPercentage(s.clone()));
            }
            match t.to_lowercase().as_str() {
                "true" | "yes" => return Ok(100.0),
                "false" | "no" => return Ok(0.0),
                _ => {}
            }
            parse_number(t)
                .map(scale_fraction)
                .map_err(|_| CoerceError::NotPercentage(s.clone()))
        }
    }
}

fn scale_fraction(n: f64) -> f64 {
    if n.abs() <= 1.0 {
        n * 100.0
    } else {
        n
    }
}

/// Text rendering; integral numbers lose their `.0`.
pub fn coerce_text(cell: &CellValue) -> String {
    cell.as_text()
}

/// Coerce into the declared type.
pub fn coerce(cell: &CellValue, expected: ExpectedType) -> Result<FieldValue, CoerceError> {
    match expected {
        ExpectedType::Text => Ok(FieldValue::Text(coerce_text(cell))),
        ExpectedType::Number => coerce_number(cell).map(FieldValue::Number),
        ExpectedType::Boolean => coerce_bool(cell).map(FieldValue::Boolean),
        ExpectedType::Percentage => coerce_percentage(cell).map(FieldValue::Number),
    }
}

pub fn zero_value(expected: ExpectedType) -> FieldValue {
    match expected {
        ExpectedType::Text => FieldValue::Text(String::new()),
        ExpectedType::Number | ExpectedType::Percentage => FieldValue::Number(0.0),
        ExpectedType::Boolean => FieldValue::Boolean(false),
    }
}

pub fn lenient_number(cell: &CellValue) -> f64 {
    coerce_number(cell).unwrap_or(0.0)
}

pub fn lenient_bool(cell: &CellValue) -> bool {
    coerce_bool(cell).unwrap_or(false)
}

pub fn lenient_percentage(cell: &CellValue) -> f64 {
    coerce_percentage(cell).unwrap_or(0.0)
}

/// Field-value readers used by the canonicalizer.
pub fn field_as_number(value: &FieldValue) -> f64 {
    match value {
        FieldValue::Number(n) => *n,
        FieldValue::Boolean(b) => f64::from(u8::from(*b)),
        FieldValue::Text(s) => parse_number(s).unwrap_or(0.0),
    }
}

pub fn field_as_bool(value: &FieldValue) -> bool {
    match value {
        FieldValue::Boolean(b) => *b,
        FieldValue::Number(n) => *n != 0.0,
        FieldValue::Text(s) => coerce_bool(&CellValue::Text(s.clone())).unwrap_or(false),
    }
}

pub fn field_as_text(value: &FieldValue) -> String {
    match value {
        FieldValue::Text(s) => s.trim().to_string(),
        FieldValue::Number(n) => format_plain_number(*n),
        FieldValue::Boolean(b) => b.to_string(),
    }
}

/// Percentage read from an already-extracted value. Numbers are taken as
/// extracted (the extractor scaled them); text goes through percentage parsing.
pub fn field_as_percentage(value: &FieldValue) -> f64 {
    match value {
        FieldValue::Boolean(b) => {
            if *b {
                100.0
            } else {
                0.0
            }
        }
        FieldValue::Number(n) => *n,
        FieldValue::Text(s) => lenient_percentage(&CellValue::Text(s.clone())),
    }
}
