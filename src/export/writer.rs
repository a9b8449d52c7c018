use csv::{QuoteStyle, Terminator, WriterBuilder};

use crate::error::ExportError;

/// Render a header plus rows as delimited text.
pub fn write_delimited(
    header: &[String],
    rows: &[Vec<String>],
    delimiter: u8,
    quote_style: QuoteStyle,
) -> Result<String, ExportError> {
    let mut wtr = WriterBuilder::new()
        .delimiter(delimiter)
        .quote_style(quote_style)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    wtr.write_record(header)?;
    for row in rows {
        wtr.write_record(row)?;
    }
    let bytes = wtr.into_inner().map_err(|e| ExportError::Csv(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| ExportError::Csv(e.to_string()))
}

pub fn write_csv(header: &[String], rows: &[Vec<String>]) -> Result<String, ExportError> {
    write_delimited(header, rows, b',', QuoteStyle::Necessary)
}

pub fn write_tsv(header: &[String], rows: &[Vec<String>]) -> Result<String, ExportError> {
    write_delimited(header, rows, b'\t', QuoteStyle::Never)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_quotes_only_when_needed() {
        let header = vec!["a".to_string(), "b".to_string()];
        let rows = vec![vec!["x, y".to_string(), "say \"hi\"".to_string()]];
        let out = write_csv(&header, &rows).unwrap();
        assert_eq!(out, "a,b\n\"x, y\",\"say \"\"hi\"\"\"\n");
    }

    #[test]
    fn tsv_never_quotes() {
        let header = vec!["a".to_string(), "b".to_string()];
        let rows = vec![vec!["1,2".to_string(), "\"q\"".to_string()]];
        assert_eq!(write_tsv(&header, &rows).unwrap(), "a\tb\n1,2\t\"q\"\n");
    }
}
