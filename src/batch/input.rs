//! Batch input: one row per workbook, a source column plus free-form
//! metadata columns.

use csv::ReaderBuilder;
use std::path::Path;

use crate::error::InputError;
use crate::excel::{load_workbook_from_path, WorkbookHandle};
use crate::models::{BatchJob, SourceReference};
use crate::types::OverrideMetadata;

/// Header names recognised as the source column, in priority order.
pub const SOURCE_COLUMNS: &[&str] = &[
    "source",
    "source reference",
    "source_reference",
    "spreadsheet url",
    "sheet url",
    "workbook",
    "file",
    "url",
    "link",
];

fn source_column(header: &[String]) -> Option<usize> {
    SOURCE_COLUMNS
        .iter()
        .find_map(|name| header.iter().position(|h| h.trim().eq_ignore_ascii_case(name)))
}

/// Turn a header and its rows into jobs. Fully blank rows are skipped; rows
/// without a usable source become metadata-only jobs. A job's `row_index` is
/// its data row's position in the input, blank rows included.
pub fn jobs_from_rows(
    header: Vec<String>,
    rows: impl IntoIterator<Item = Vec<String>>,
) -> Result<Vec<BatchJob>, InputError> {
    let header: Vec<String> = header.into_iter().map(|h| h.trim().to_string()).collect();
    if header.iter().all(|h| h.is_empty()) {
        return Err(InputError::MissingHeader);
    }
    let source_idx = source_column(&header)
        .ok_or_else(|| InputError::MissingSourceColumn(SOURCE_COLUMNS.iter().map(|s| s.to_string()).collect()))?;

    let mut jobs = Vec::new();
    let mut skipped = 0usize;
    for (row_index, row) in rows.into_iter().enumerate() {
        if row.iter().all(|v| v.trim().is_empty()) {
            skipped += 1;
            continue;
        }
        let source = row.get(source_idx).and_then(|raw| SourceReference::parse(raw));
        let metadata: OverrideMetadata = header
            .iter()
            .enumerate()
            .filter(|(i, h)| *i != source_idx && !h.is_empty())
            .map(|(i, h)| (h.clone(), row.get(i).map(|v| v.trim().to_string()).unwrap_or_default()))
            .collect();
        jobs.push(BatchJob::new(row_index, source, metadata));
    }

    let without_source = jobs.iter().filter(|j| j.source.is_none()).count();
    tracing::info!(jobs = jobs.len(), skipped, without_source, "Batch input parsed");
    Ok(jobs)
}

pub fn parse_delimited(text: &str, delimiter: u8) -> Result<Vec<BatchJob>, InputError> {
    let mut rdr = ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .has_headers(false)
        .from_reader(text.trim_start_matches('\u{feff}').as_bytes());
    let mut records = rdr.records();
    let header = match records.next() {
        Some(rec) => rec?.iter().map(str::to_string).collect(),
        None => return Err(InputError::MissingHeader),
    };
    let rows = records
        .map(|rec| rec.map(|r| r.iter().map(str::to_string).collect::<Vec<String>>()))
        .collect::<Result<Vec<_>, _>>()?;
    jobs_from_rows(header, rows)
}

/// First sheet, first row as header.
pub fn parse_workbook(workbook: &WorkbookHandle) -> Result<Vec<BatchJob>, InputError> {
    let sheet = workbook.sheets().first().ok_or(InputError::MissingHeader)?;
    let (Some(max_row), Some(max_col)) = (sheet.max_row(), sheet.max_col()) else {
        return Err(InputError::MissingHeader);
    };
    let row_text = |r: u32| -> Vec<String> { (0..=max_col).map(|c| sheet.cell(r, c).as_text()).collect() };
    let header = row_text(0);
    let rows: Vec<Vec<String>> = (1..=max_row).map(row_text).collect();
    jobs_from_rows(header, rows)
}

/// Read a batch input file; the format follows the extension.
pub fn read_batch_input(path: &Path) -> Result<Vec<BatchJob>, InputError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "csv" => parse_delimited(&std::fs::read_to_string(path).map_err(csv::Error::from)?, b','),
        "tsv" | "tab" | "txt" => parse_delimited(&std::fs::read_to_string(path).map_err(csv::Error::from)?, b'\t'),
        "xlsx" | "xlsm" | "xls" | "ods" => parse_workbook(&load_workbook_from_path(path)?),
        other => Err(InputError::UnsupportedFormat(other.to_string())),
    }
}
