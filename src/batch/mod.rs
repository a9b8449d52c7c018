//! Batch runs over many questionnaire workbooks.

pub mod input;
pub mod orchestrator;
pub mod report;
pub mod source;

pub use input::read_batch_input;
pub use orchestrator::{BatchConfig, BatchOrchestrator, BatchOutcome};
pub use report::BatchReport;
pub use source::{DefaultFetcher, HttpFetcher, LocalFileFetcher, WorkbookFetcher};
