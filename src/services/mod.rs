pub mod canonicalizer;
pub mod coerce;
pub mod excel_scanner;
pub mod extraction;
pub mod strict_extractor;

pub use canonicalizer::{canonicalize, empty_record};
pub use excel_scanner::HeuristicExtractor;
pub use extraction::{extract_with_fallback, WorkbookExtractor};
pub use strict_extractor::StrictExtractor;
