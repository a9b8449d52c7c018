//! Declarative cell maps: which cell of which sheet holds which field.
//!
//! Only the source questionnaire is described here. The output mappings are
//! the field tables in `export::{bulk_upload, portal}`.

pub mod keys;
mod source;

pub use source::template_workbook;

use std::sync::OnceLock;

use crate::excel::CellAddress;

pub const PRIMARY_SHEET: &str = "Questionnaire";
pub const GROSS_RECEIPTS_SHEET: &str = "Gross Receipts";
pub const PAYROLL_CREDITS_SHEET: &str = "Payroll Credits";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedType {
    Text,
    Number,
    Boolean,
    Percentage,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappingRole {
    /// The cell holds the field's value.
    DataValue,
    /// The cell holds the label printed next to a value. A mismatch means
    /// the rows have drifted.
    Label { expected: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct CellMapping {
    pub sheet: &'static str,
    pub address: CellAddress,
    pub field: String,
    pub expected: ExpectedType,
    pub role: MappingRole,
}

impl CellMapping {
    pub fn value(sheet: &'static str, address: CellAddress, field: impl Into<String>, expected: ExpectedType) -> Self {
        Self {
            sheet,
            address,
            field: field.into(),
            expected,
            role: MappingRole::DataValue,
        }
    }

    pub fn label(sheet: &'static str, address: CellAddress, field: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            sheet,
            address,
            field: field.into(),
            expected: ExpectedType::Text,
            role: MappingRole::Label { expected: text.into() },
        }
    }

    pub fn is_value(&self) -> bool {
        matches!(self.role, MappingRole::DataValue)
    }
}

#[derive(Debug, Clone)]
pub struct Section {
    pub name: &'static str,
    pub mappings: Vec<CellMapping>,
}

#[derive(Debug, Clone)]
pub struct CellMapConfig {
    pub primary_sheet: &'static str,
    pub auxiliary_sheets: Vec<&'static str>,
    pub sections: Vec<Section>,
}

static SOURCE: OnceLock<CellMapConfig> = OnceLock::new();

impl CellMapConfig {
    /// The questionnaire source map, built once.
    pub fn source() -> &'static CellMapConfig {
        SOURCE.get_or_init(source::build)
    }

    pub fn mappings(&self) -> impl Iterator<Item = &CellMapping> {
        self.sections.iter().flat_map(|s| s.mappings.iter())
    }

    pub fn value_mappings(&self) -> impl Iterator<Item = &CellMapping> {
        self.mappings().filter(|m| m.is_value())
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name == name)
    }

    pub fn find(&self, field: &str) -> Option<&CellMapping> {
        self.value_mappings().find(|m| m.field == field)
    }
}
