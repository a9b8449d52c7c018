//! Link scrubbing for combined exports shared outside the team.

use regex::Regex;
use std::sync::OnceLock;

fn url_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(?:https?://|www\.)\S+|\b(?:docs|drive|sheets)\.google\.com\S*|\b[a-z0-9][a-z0-9-]*(?:\.[a-z0-9-]+)*\.(?:com|net|org|io|gov|co|us)(?:/\S*)?\b",
        )
        .expect("url regex")
    })
}

/// Columns whose values are links by nature.
const LINK_FIELDS: &[&str] = &[
    "website",
    "url",
    "link",
    "links",
    "source",
    "source reference",
    "source_reference",
    "spreadsheet url",
    "sheet url",
    "workbook",
    "file",
    "drive link",
    "folder link",
    "document link",
];

/// Identity columns that are never blanked, even if they look like links.
const PROTECTED_FIELDS: &[&str] = &["email", "tax_id", "Contact Email", "EIN"];

pub fn is_protected(column: &str) -> bool {
    PROTECTED_FIELDS.iter().any(|p| p.eq_ignore_ascii_case(column.trim()))
}

pub fn is_link_field(column: &str) -> bool {
    LINK_FIELDS.iter().any(|f| f.eq_ignore_ascii_case(column.trim()))
}

pub fn contains_url(value: &str) -> bool {
    url_pattern().is_match(value)
}

/// Blank link columns and URL-bearing values in place. Returns the number
/// of cells cleared.
pub fn remove_links(header: &[String], rows: &mut [Vec<String>]) -> usize {
    let mut cleared = 0;
    for (col, name) in header.iter().enumerate() {
        if is_protected(name) {
            continue;
        }
        let whole_column = is_link_field(name);
        for row in rows.iter_mut() {
            let Some(cell) = row.get_mut(col) else {
                continue;
            };
            if !cell.is_empty() && (whole_column || contains_url(cell)) {
                cell.clear();
                cleared += 1;
            }
        }
    }
    cleared
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_url_like_text() {
        assert!(contains_url("see https://docs.google.com/spreadsheets/d/abc/edit"));
        assert!(contains_url("docs.google.com/spreadsheets/d/abc"));
        assert!(contains_url("www.example.org"));
        assert!(contains_url("samplecompany.com"));
        assert!(!contains_url("Dining room closed by county order"));
        assert!(!contains_url("2020Q2:50000.00"));
    }

    #[test]
    fn blanks_links_but_keeps_protected_columns() {
        let header: Vec<String> = ["company_name", "email", "website", "Notes", "Claim Total"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let mut rows = vec![vec![
            "Sample Company LLC".to_string(),
            "jane@samplecompany.com".to_string(),
            "Sample Co homepage".to_string(),
            "https://docs.google.com/spreadsheets/d/xyz".to_string(),
            "160000.00".to_string(),
        ]];
        let cleared = remove_links(&header, &mut rows);
        assert_eq!(cleared, 2);
        assert_eq!(rows[0][0], "Sample Company LLC");
        assert_eq!(rows[0][1], "jane@samplecompany.com");
        assert_eq!(rows[0][2], "");
        assert_eq!(rows[0][3], "");
        assert_eq!(rows[0][4], "160000.00");
    }
}
