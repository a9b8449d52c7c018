//! Error types for each stage of the intake pipeline.
//!
//! Each stage owns its own enum so a failure can be traced back to where it
//! happened: a coercion, a workbook read, an extraction strategy, an export,
//! or a batch run.

use std::path::PathBuf;

use thiserror::Error;

/// A raw cell could not be coerced into the declared primitive type.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoerceError {
    #[error("cell is empty")]
    Empty,

    #[error("not a number: {0:?}")]
    NotNumeric(String),

    #[error("not a yes/no value: {0:?}")]
    NotBoolean(String),

    #[error("not a percentage: {0:?}")]
    NotPercentage(String),
}

#[derive(Error, Debug)]
pub enum WorkbookError {
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Could not open workbook: {0}")]
    InvalidFormat(String),

    #[error("Sheet not found: {0}")]
    SheetNotFound(String),

    #[error("Invalid cell address: {0:?}")]
    InvalidAddress(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Excel write error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
}

#[derive(Error, Debug, Clone)]
pub enum ExtractionError {
    #[error("Primary sheet '{0}' is missing")]
    PrimarySheetMissing(String),

    #[error("Workbook has no sheets")]
    EmptyWorkbook,

    #[error("No known labels found in any sheet")]
    NoAnchors,

    #[error("{count} value(s) could not be parsed, first: {first}")]
    FatalValues { count: usize, first: String },

    #[error("strict extraction failed ({strict}); heuristic extraction failed ({heuristic})")]
    BothFailed {
        strict: Box<ExtractionError>,
        heuristic: Box<ExtractionError>,
    },
}

/// Failure of the external workbook fetch collaborator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    #[error("Source not found: {0}")]
    NotFound(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Timed out fetching {0}")]
    Timeout(String),

    #[error("Fetch failed: {0}")]
    Io(String),
}

/// Generator-level failure. Never surfaced to users: the field falls back
/// to its static default and the failure becomes a note.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeneratorError {
    #[error("missing input: {0}")]
    MissingInput(&'static str),

    #[error("value out of range: {0}")]
    OutOfRange(String),
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Record {record} is missing required fields: {}", .fields.join(", "))]
    MissingFields { record: usize, fields: Vec<String> },

    #[error("No records to export")]
    NoRecords,

    #[error("CSV error: {0}")]
    Csv(String),

    #[error("Workbook error: {0}")]
    Workbook(#[from] WorkbookError),
}

impl From<csv::Error> for ExportError {
    fn from(e: csv::Error) -> Self {
        ExportError::Csv(e.to_string())
    }
}

#[derive(Error, Debug)]
pub enum InputError {
    #[error("Batch input has no header row")]
    MissingHeader,

    #[error("No source column found (expected one of: {})", .0.join(", "))]
    MissingSourceColumn(Vec<String>),

    #[error("Unsupported batch input format: {0}")]
    UnsupportedFormat(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Workbook error: {0}")]
    Workbook(#[from] WorkbookError),
}

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Another batch session is already processing: {0}")]
    AlreadyRunning(String),

    #[error("Session {id} cannot start from status {status}")]
    NotIdle { id: String, status: String },

    #[error("Session store lock poisoned")]
    StoreUnavailable,
}

/// A single batch job failed; the session continues.
#[derive(Error, Debug)]
pub enum JobError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("workbook could not be loaded: {0}")]
    Workbook(#[from] WorkbookError),

    #[error("extraction failed: {0}")]
    Extraction(#[from] ExtractionError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}
