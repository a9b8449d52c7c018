//! Field-mapped exports of canonical records.

pub mod bulk_upload;
pub mod derive;
pub mod fields;
pub mod hybrid;
pub mod links;
pub mod portal;
pub mod writer;

pub use fields::{ExportContext, FieldTable, GeneratorInput, GeneratorNote, OutputFieldSpec};
pub use hybrid::{generate_hybrid_row, CombinedExport, HybridRow};

use crate::error::ExportError;
use crate::models::CanonicalRecord;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportOutput {
    pub content: String,
    pub notes: Vec<GeneratorNote>,
}

/// Check every record against the table's required fields before anything
/// is rendered.
pub fn validate_required(
    table: &FieldTable,
    records: &[CanonicalRecord],
    context: &ExportContext,
) -> Result<(), ExportError> {
    if records.is_empty() {
        return Err(ExportError::NoRecords);
    }
    for (index, record) in records.iter().enumerate() {
        let fields = table.missing_required(&GeneratorInput::new(record, context));
        if !fields.is_empty() {
            tracing::warn!(table = table.name(), record = index, missing = fields.len(), "Export blocked");
            return Err(ExportError::MissingFields { record: index, fields });
        }
    }
    Ok(())
}

fn render(
    table: &FieldTable,
    records: &[CanonicalRecord],
    context: &ExportContext,
    clean: impl Fn(String) -> String,
) -> (Vec<Vec<String>>, Vec<GeneratorNote>) {
    let mut notes = Vec::new();
    let rows = records
        .iter()
        .map(|record| {
            let (values, row_notes) = table.render_row(&GeneratorInput::new(record, context));
            notes.extend(row_notes);
            values.into_iter().map(&clean).collect()
        })
        .collect();
    (rows, notes)
}

/// Comma-separated bulk-upload file. Nothing is produced if any record
/// lacks a required field.
pub fn export_bulk_upload(records: &[CanonicalRecord], context: &ExportContext) -> Result<ExportOutput, ExportError> {
    let table = bulk_upload::table();
    validate_required(table, records, context)?;
    let (rows, notes) = render(table, records, context, |v| v);
    let content = writer::write_csv(&table.header(), &rows)?;
    tracing::info!(records = records.len(), notes = notes.len(), "Bulk upload export rendered");
    Ok(ExportOutput { content, notes })
}

/// Tab-separated portal file.
pub fn export_portal(records: &[CanonicalRecord], context: &ExportContext) -> Result<ExportOutput, ExportError> {
    let table = portal::table();
    validate_required(table, records, context)?;
    let (rows, notes) = render(table, records, context, |v| portal::sanitize_value(&v));
    let content = writer::write_tsv(&table.header(), &rows)?;
    tracing::info!(records = records.len(), notes = notes.len(), "Portal export rendered");
    Ok(ExportOutput { content, notes })
}
