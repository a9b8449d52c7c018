//! Label-anchored scanning for questionnaires that do not match the fixed
//! layout: rows shifted, sheets renamed, sections moved.
//!
//! Every lookup finds a label cell by its text and reads the answer at a
//! fixed offset from it. Coercions here never fail; unreadable cells become
//! `0`/`false`.

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

use super::coerce::{coerce_percentage, lenient_bool, lenient_number};
use super::extraction::WorkbookExtractor;
use crate::cell_map::{keys, ExpectedType, PRIMARY_SHEET};
use crate::error::ExtractionError;
use crate::excel::{CellAddress, Sheet, WorkbookHandle};
use crate::models::{
    qualifying_quarters, CreditColumn, Question, Quarter, QuarterKey, ShutdownStandard, CREDIT_YEARS, HEADCOUNT_YEARS,
    REVENUE_YEARS,
};
use crate::types::{CellValue, ExtractedValues, ExtractionMethod, FieldValue};

/// Rows searched below an anchor for headers and quarter labels.
const PROXIMITY_ROWS: u32 = 15;
const MAX_OWNERS: u32 = 25;
const CREDIT_BLOCK_ROWS: u32 = 40;

/// Lowercase, punctuation to spaces, whitespace collapsed.
pub(crate) fn normalize_label(s: &str) -> String {
    let mapped: String = s
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '%' || c == '&' {
                c.to_ascii_lowercase()
            } else {
                ' '
            }
        })
        .collect();
    mapped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whole-word phrase match on normalized text.
fn contains_phrase(label: &str, phrase: &str) -> bool {
    format!(" {label} ").contains(&format!(" {phrase} "))
}

fn quarter_label_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:q ?([1-4])|quarter ([1-4])|([1-4])(?:st|nd|rd|th) quarter|([1-4])q)$")
            .expect("quarter label regex")
    })
}

fn quarter_of_label(label: &str) -> Option<Quarter> {
    let caps = quarter_label_regex().captures(label)?;
    let digit = (1..=4).find_map(|i| caps.get(i))?;
    digit.as_str().parse::<u8>().ok().and_then(Quarter::from_number)
}

fn year_of_cell(cell: &CellValue, years: &[u16]) -> Option<u16> {
    let year = match cell {
        CellValue::Number(n) if n.fract() == 0.0 => *n as i64,
        CellValue::Text(s) => {
            let norm = normalize_label(s);
            norm.strip_prefix("fy ").unwrap_or(norm.as_str()).trim().parse::<i64>().ok()?
        }
        _ => return None,
    };
    years.iter().copied().find(|y| i64::from(*y) == year)
}

fn year_in_label(label: &str) -> Option<u16> {
    label
        .split(' ')
        .filter_map(|w| w.parse::<u16>().ok())
        .find(|y| HEADCOUNT_YEARS.contains(y))
}

/// A text cell found during the scan.
#[derive(Debug, Clone)]
struct LabelCell {
    sheet: usize,
    address: CellAddress,
    text: String,
    words: usize,
}

#[derive(Debug, Clone, Copy)]
enum Match {
    /// Normalized label equals the phrase.
    Exact,
    /// Phrase appears as whole words in a short label.
    Short,
    /// Phrase appears anywhere, for question sentences.
    Anywhere,
}

struct LabelLookup {
    field: &'static str,
    phrases: &'static [&'static str],
    expected: ExpectedType,
}

const IDENTITY_LOOKUPS: &[LabelLookup] = &[
    LabelLookup { field: keys::COMPANY_NAME, phrases: &["company name", "legal business name", "business name", "legal name"], expected: ExpectedType::Text },
    LabelLookup { field: keys::DBA_NAME, phrases: &["dba name", "dba", "doing business as"], expected: ExpectedType::Text },
    LabelLookup { field: keys::TAX_ID, phrases: &["tax id", "ein", "fein", "employer identification number"], expected: ExpectedType::Text },
    LabelLookup { field: keys::STREET_ADDRESS, phrases: &["street address", "address line 1", "mailing address", "business address"], expected: ExpectedType::Text },
    LabelLookup { field: keys::CITY, phrases: &["city"], expected: ExpectedType::Text },
    LabelLookup { field: keys::STATE, phrases: &["state"], expected: ExpectedType::Text },
    LabelLookup { field: keys::ZIP_CODE, phrases: &["zip code", "zip", "postal code"], expected: ExpectedType::Text },
    LabelLookup { field: keys::CONTACT_FIRST_NAME, phrases: &["contact first name", "first name"], expected: ExpectedType::Text },
    LabelLookup { field: keys::CONTACT_LAST_NAME, phrases: &["contact last name", "last name"], expected: ExpectedType::Text },
    LabelLookup { field: keys::CONTACT_TITLE, phrases: &["contact title", "title"], expected: ExpectedType::Text },
    LabelLookup { field: keys::EMAIL, phrases: &["email", "email address", "contact email"], expected: ExpectedType::Text },
    LabelLookup { field: keys::PHONE, phrases: &["phone", "phone number", "telephone"], expected: ExpectedType::Text },
    LabelLookup { field: keys::WEBSITE, phrases: &["website", "web site"], expected: ExpectedType::Text },
    LabelLookup { field: keys::INDUSTRY, phrases: &["industry"], expected: ExpectedType::Text },
    LabelLookup { field: keys::ENTITY_TYPE, phrases: &["entity type", "business type"], expected: ExpectedType::Text },
    LabelLookup { field: keys::YEAR_FOUNDED, phrases: &["year founded", "year established"], expected: ExpectedType::Number },
    LabelLookup { field: "owner_1_name", phrases: &["owner name"], expected: ExpectedType::Text },
    LabelLookup { field: "owner_1_percentage", phrases: &["owner percentage", "ownership percentage"], expected: ExpectedType::Percentage },
    LabelLookup { field: keys::PPP_FIRST_DRAW_FORGIVEN, phrases: &["first draw"], expected: ExpectedType::Number },
    LabelLookup { field: keys::PPP_SECOND_DRAW_FORGIVEN, phrases: &["second draw"], expected: ExpectedType::Number },
];

const REMARKS_PHRASES: &[&str] = &["remarks", "notes", "comments"];
const HEADCOUNT_PHRASES: &[&str] = &["full time employees", "fte count", "number of employees"];
const OWNERSHIP_PHRASES: &[&str] = &["ownership structure"];
const REVENUE_ANCHORS: &[&str] = &[
    "gross receipts",
    "quarterly gross receipts",
    "revenue",
    "quarterly revenue",
    "gross revenue",
];
const CREDIT_ANCHORS: &[&str] = &["payroll credits", "payroll credit", "payroll credit breakdown"];

const QUESTION_PHRASES: &[(&str, Question)] = &[
    ("government order suspending", Question::GovernmentShutdown),
    ("supply chain disruptions", Question::SupplyDisruption),
    ("vendors unable to deliver", Question::VendorDisruption),
    ("occupancy limits", Question::CapacityRestriction),
    ("business hours reduced", Question::ReducedHours),
    ("unable to work remotely", Question::RemoteWorkLimits),
];
/// Answers start two columns right of the question text.
const QUESTION_ANSWER_OFFSET: i64 = 2;

fn standard_phrases(standard: ShutdownStandard) -> &'static [&'static str] {
    match standard {
        ShutdownStandard::FullShutdown => &["full shutdown"],
        ShutdownStandard::PartialShutdown => &["partial shutdown"],
        ShutdownStandard::SupplyChain => &["supply chain standard"],
        ShutdownStandard::VendorDisruption => &["vendor standard", "vendor disruption standard"],
        ShutdownStandard::CapacityLimits => &["capacity limits standard", "capacity standard"],
        ShutdownStandard::ReducedHours => &["reduced hours standard"],
    }
}

fn credit_column_of_label(label: &str) -> Option<CreditColumn> {
    if contains_phrase(label, "qualified wages") {
        Some(CreditColumn::QualifiedWages)
    } else if contains_phrase(label, "health plan") {
        Some(CreditColumn::HealthPlanExpenses)
    } else if contains_phrase(label, "credit wages") {
        Some(CreditColumn::CreditWages)
    } else if contains_phrase(label, "employee count") || label == "employees" {
        Some(CreditColumn::EmployeeCount)
    } else {
        None
    }
}

/// Text-anchored fallback extractor.
#[derive(Debug, Default)]
pub struct HeuristicExtractor;

impl HeuristicExtractor {
    pub fn new() -> Self {
        Self
    }
}

/// One extraction pass over a workbook.
struct Scan<'a> {
    sheets: Vec<&'a Sheet>,
    labels: Vec<LabelCell>,
    out: ExtractedValues,
    anchors: usize,
}

impl<'a> Scan<'a> {
    fn new(workbook: &'a WorkbookHandle) -> Self {
        let mut sheets: Vec<&Sheet> = Vec::new();
        if let Some(primary) = workbook.sheet(PRIMARY_SHEET) {
            sheets.push(primary);
        }
        for sheet in workbook.sheets() {
            if !sheets.iter().any(|s| std::ptr::eq(*s, sheet)) {
                sheets.push(sheet);
            }
        }
        let mut labels = Vec::new();
        for (i, sheet) in sheets.iter().enumerate() {
            for (address, value) in sheet.cells() {
                if let CellValue::Text(s) = value {
                    let text = normalize_label(s);
                    if text.is_empty() {
                        continue;
                    }
                    let words = text.split(' ').count();
                    labels.push(LabelCell {
                        sheet: i,
                        address,
                        text,
                        words,
                    });
                }
            }
        }
        Self {
            sheets,
            labels,
            out: ExtractedValues::new(ExtractionMethod::Heuristic),
            anchors: 0,
        }
    }

    fn matches(label: &LabelCell, phrase: &str, mode: Match) -> bool {
        match mode {
            Match::Exact => label.text == phrase,
            Match::Short => {
                let phrase_words = phrase.split(' ').count();
                label.words <= phrase_words + 2 && contains_phrase(&label.text, phrase)
            }
            Match::Anywhere => label.text.contains(phrase),
        }
    }

    /// Labels matching any phrase, phrases tried in order.
    fn find_all(&self, phrases: &[&str], mode: Match) -> Vec<LabelCell> {
        let mut found: Vec<LabelCell> = Vec::new();
        for phrase in phrases {
            for label in self.labels.iter().filter(|l| Self::matches(l, phrase, mode)) {
                if !found.iter().any(|f| f.sheet == label.sheet && f.address == label.address) {
                    found.push(label.clone());
                }
            }
        }
        found
    }

    fn find_first(&self, phrases: &[&str], mode: Match) -> Option<LabelCell> {
        self.find_all(phrases, mode).into_iter().next()
    }

    fn cell(&self, sheet: usize, address: Option<CellAddress>) -> &CellValue {
        static EMPTY: CellValue = CellValue::Empty;
        match (self.sheets.get(sheet), address) {
            (Some(s), Some(a)) => s.get(a),
            _ => &EMPTY,
        }
    }

    /// First non-empty cell among the three to the right of a label.
    fn value_right_of(&self, label: &LabelCell) -> Option<CellValue> {
        (1..=3)
            .map(|dc| self.cell(label.sheet, label.address.offset(0, dc)))
            .find(|c| !c.is_empty())
            .cloned()
    }

    fn location(&self, label: &LabelCell) -> String {
        self.sheets
            .get(label.sheet)
            .map(|s| s.location(label.address))
            .unwrap_or_default()
    }

    fn insert_lenient(&mut self, field: &str, expected: ExpectedType, cell: &CellValue) {
        let value = match expected {
            ExpectedType::Text => FieldValue::Text(cell.as_text()),
            ExpectedType::Number => FieldValue::Number(lenient_number(cell)),
            ExpectedType::Boolean => FieldValue::Boolean(lenient_bool(cell)),
            ExpectedType::Percentage => FieldValue::Number(coerce_percentage(cell).unwrap_or(0.0)),
        };
        self.out.insert(field, value);
    }

    fn identity(&mut self) {
        for lookup in IDENTITY_LOOKUPS {
            let candidates = self.find_all(lookup.phrases, Match::Short);
            if candidates.is_empty() {
                continue;
            }
            self.anchors += 1;
            if let Some(value) = candidates.iter().find_map(|l| self.value_right_of(l)) {
                self.insert_lenient(lookup.field, lookup.expected, &value);
            }
        }
    }

    fn remarks(&mut self) {
        let Some(label) = self.find_first(REMARKS_PHRASES, Match::Short) else {
            return;
        };
        self.anchors += 1;
        let right = self.cell(label.sheet, label.address.offset(0, 1));
        let below = self.cell(label.sheet, label.address.offset(1, 0));
        let text = if right.is_empty() { below.as_text() } else { right.as_text() };
        self.out.insert(keys::REMARKS, FieldValue::Text(text));
    }

    fn headcount(&mut self) {
        let labels = self.find_all(HEADCOUNT_PHRASES, Match::Short);
        if labels.is_empty() {
            self.out.warn("headcount", None, "Full-time employee labels not found");
            return;
        }
        self.anchors += 1;
        for label in labels {
            match year_in_label(&label.text) {
                Some(year) => {
                    let key = keys::employees_key(year);
                    if !self.out.contains(&key) {
                        let n = lenient_number(self.cell(label.sheet, label.address.offset(0, 1)));
                        self.out.insert(key, FieldValue::Number(n));
                    }
                }
                None => {
                    for (i, year) in HEADCOUNT_YEARS.into_iter().enumerate() {
                        let n = lenient_number(self.cell(label.sheet, label.address.offset(0, 1 + i as i64)));
                        self.out.insert(keys::employees_key(year), FieldValue::Number(n));
                    }
                }
            }
        }
    }

    fn standards(&mut self) {
        for standard in ShutdownStandard::ALL {
            if let Some(label) = self.find_first(standard_phrases(standard), Match::Short) {
                self.anchors += 1;
                let b = lenient_bool(self.cell(label.sheet, label.address.offset(0, 1)));
                self.out.insert(standard.key(), FieldValue::Boolean(b));
            }
        }
    }

    fn questions(&mut self) {
        let quarters = qualifying_quarters();
        for &(phrase, question) in QUESTION_PHRASES {
            let Some(label) = self.find_first(&[phrase], Match::Anywhere) else {
                self.out.warn(question.key(), None, format!("Question containing {phrase:?} not found"));
                continue;
            };
            self.anchors += 1;
            for (i, key) in quarters.iter().enumerate() {
                let address = label.address.offset(0, QUESTION_ANSWER_OFFSET + i as i64);
                let b = lenient_bool(self.cell(label.sheet, address));
                self.out.insert(keys::qq_key(*key, question), FieldValue::Boolean(b));
            }
        }
    }

    fn row_cells(&self, sheet: usize, row: u32) -> Vec<(CellAddress, &CellValue)> {
        match self.sheets.get(sheet) {
            Some(s) => s.cells().filter(|(a, _)| a.row == row).collect(),
            None => Vec::new(),
        }
    }

    /// Year → column, from the first row near the anchor that names at
    /// least two of the revenue years.
    fn revenue_header(&self, anchor: &LabelCell) -> Option<(u32, BTreeMap<u16, u32>)> {
        for row in anchor.address.row..=anchor.address.row + PROXIMITY_ROWS {
            let years: BTreeMap<u16, u32> = self
                .row_cells(anchor.sheet, row)
                .into_iter()
                .filter_map(|(a, c)| year_of_cell(c, &REVENUE_YEARS).map(|y| (y, a.col)))
                .collect();
            if years.len() >= 2 {
                return Some((row, years));
            }
        }
        None
    }

    fn revenue(&mut self) -> bool {
        for anchor in self.find_all(REVENUE_ANCHORS, Match::Exact) {
            let Some((header_row, year_cols)) = self.revenue_header(&anchor) else {
                continue;
            };
            let mut located = Vec::new();
            for row in header_row + 1..=header_row + PROXIMITY_ROWS {
                let quarter = self.row_cells(anchor.sheet, row).into_iter().find_map(|(_, c)| match c {
                    CellValue::Text(s) => quarter_of_label(&normalize_label(s)),
                    _ => None,
                });
                let Some(quarter) = quarter else { continue };
                for (&year, &col) in &year_cols {
                    let key = QuarterKey::new(year, quarter);
                    if located.contains(&key) {
                        continue;
                    }
                    let n = lenient_number(self.cell(anchor.sheet, Some(CellAddress::new(row, col))));
                    located.push(key);
                    self.out.insert(keys::revenue_key(key), FieldValue::Number(n));
                }
            }
            if !located.is_empty() {
                self.anchors += 1;
                tracing::debug!(location = %self.location(&anchor), quarters = located.len(), "Revenue table located");
                return true;
            }
        }
        self.out.warn("gross_receipts", None, "Gross receipts table not found");
        false
    }

    fn credits(&mut self) {
        let Some(anchor) = self.find_first(CREDIT_ANCHORS, Match::Exact) else {
            self.out.warn("payroll_credits", None, "Payroll credit table not found");
            return;
        };
        self.anchors += 1;
        let mut year: Option<u16> = None;
        let mut columns: BTreeMap<u32, CreditColumn> = BTreeMap::new();
        let last_row = anchor.address.row + CREDIT_BLOCK_ROWS;
        for row in anchor.address.row + 1..=last_row {
            let (quarter, row_year, headers) = {
                let cells = self.row_cells(anchor.sheet, row);
                let quarter = cells.iter().find_map(|(_, c)| match c {
                    CellValue::Text(s) => quarter_of_label(&normalize_label(s)),
                    _ => None,
                });
                let row_year = cells.iter().find_map(|(_, c)| year_of_cell(c, &CREDIT_YEARS));
                let headers: Vec<(u32, CreditColumn)> = cells
                    .iter()
                    .filter_map(|(a, c)| match c {
                        CellValue::Text(s) => credit_column_of_label(&normalize_label(s)).map(|col| (a.col, col)),
                        _ => None,
                    })
                    .collect();
                (quarter, row_year, headers)
            };
            let Some(q) = quarter else {
                // Year marker and column headers share rows above each block.
                if row_year.is_some() {
                    year = row_year;
                }
                columns.extend(headers);
                continue;
            };
            let Some(y) = year else { continue };
            let key = QuarterKey::new(y, q);
            for (&col, &column) in &columns {
                let n = lenient_number(self.cell(anchor.sheet, Some(CellAddress::new(row, col))));
                self.out.insert(keys::credit_key(key, column), FieldValue::Number(n));
            }
        }
    }

    fn ownership(&mut self) {
        let Some(label) = self.find_first(OWNERSHIP_PHRASES, Match::Short) else {
            return;
        };
        self.anchors += 1;
        // One header row sits between the label and the first owner.
        let first = label.address.row + 2;
        let mut n = 0usize;
        for row in first..first + MAX_OWNERS {
            let name_cell = self.cell(label.sheet, Some(CellAddress::new(row, label.address.col)));
            if name_cell.is_empty() {
                break;
            }
            let pct_cell = self.cell(label.sheet, Some(CellAddress::new(row, label.address.col + 1)));
            let Ok(pct) = coerce_percentage(pct_cell) else {
                break;
            };
            n += 1;
            let name = name_cell.as_text();
            self.out.insert(keys::owner_name_key(n), FieldValue::Text(name));
            self.out.insert(keys::owner_percentage_key(n), FieldValue::Number(pct));
        }
    }

    /// Revenue-reduction answers follow from the located receipts: 2020
    /// quarters below half of 2019, 2021 quarters below 80%.
    fn derive_revenue_questions(&mut self) {
        for key in qualifying_quarters() {
            let base_key = keys::revenue_key(QuarterKey::new(2019, key.quarter));
            let current_key = keys::revenue_key(key);
            let (Some(FieldValue::Number(base)), Some(FieldValue::Number(current))) =
                (self.out.get(&base_key), self.out.get(&current_key))
            else {
                continue;
            };
            let (base, current) = (*base, *current);
            let question = Question::revenue_threshold_for(key.year);
            let ratio = if key.year <= 2020 { 0.5 } else { 0.8 };
            let reduced = base > 0.0 && current < base * ratio;
            self.out.insert(keys::qq_key(key, question), FieldValue::Boolean(reduced));
        }
    }
}

impl WorkbookExtractor for HeuristicExtractor {
    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::Heuristic
    }

    fn precondition(&self, workbook: &WorkbookHandle) -> Result<(), ExtractionError> {
        if workbook.is_empty() {
            Err(ExtractionError::EmptyWorkbook)
        } else {
            Ok(())
        }
    }

    fn extract(&self, workbook: &WorkbookHandle) -> Result<ExtractedValues, ExtractionError> {
        self.precondition(workbook)?;
        let mut scan = Scan::new(workbook);
        scan.identity();
        scan.remarks();
        scan.headcount();
        scan.standards();
        scan.questions();
        scan.ownership();
        if scan.revenue() {
            scan.derive_revenue_questions();
        }
        scan.credits();

        if scan.anchors == 0 {
            return Err(ExtractionError::NoAnchors);
        }
        let mut out = scan.out;
        out.warn("workbook", None, "Values located by label search; review before filing");
        tracing::info!(
            anchors = scan.anchors,
            fields = out.len(),
            warnings = out.warnings.len(),
            "Heuristic extraction finished"
        );
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell_map::{GROSS_RECEIPTS_SHEET, PAYROLL_CREDITS_SHEET};
    use crate::test_support::sample_workbook;

    /// The sample questionnaire with every sheet renamed and its rows pushed down.
    fn drifted_workbook(shift: u32) -> WorkbookHandle {
        let sample = sample_workbook();
        let sheets = sample
            .sheets()
            .iter()
            .map(|s| {
                let mut moved = Sheet::new(format!("Copy of {}", s.name()));
                for (address, value) in s.cells() {
                    moved.set(CellAddress::new(address.row + shift, address.col), value.clone());
                }
                moved
            })
            .collect();
        WorkbookHandle::new(sheets)
    }

    #[test]
    fn normalization() {
        assert_eq!(normalize_label("  EIN / Tax-ID: "), "ein tax id");
        assert_eq!(normalize_label("Full_Time   Employees"), "full time employees");
        assert!(contains_phrase("ein tax id", "ein"));
        assert!(!contains_phrase("being late", "ein"));
    }

    #[test]
    fn quarter_labels() {
        assert_eq!(quarter_of_label("q1"), Some(Quarter::Q1));
        assert_eq!(quarter_of_label("quarter 3"), Some(Quarter::Q3));
        assert_eq!(quarter_of_label("2nd quarter"), Some(Quarter::Q2));
        assert_eq!(quarter_of_label("4q"), Some(Quarter::Q4));
        assert_eq!(quarter_of_label("q5"), None);
        assert_eq!(quarter_of_label("quarterly revenue"), None);
    }

    #[test]
    fn finds_values_after_rows_drift() {
        let values = HeuristicExtractor::new().extract(&drifted_workbook(3)).unwrap();
        assert_eq!(values.method, ExtractionMethod::Heuristic);
        assert_eq!(values.get(keys::COMPANY_NAME), Some(&FieldValue::Text("Sample Company LLC".into())));
        assert_eq!(values.get(keys::TAX_ID), Some(&FieldValue::Text("12-3456789".into())));
        assert_eq!(values.get(keys::CITY), Some(&FieldValue::Text("Springfield".into())));
        assert_eq!(
            values.get(keys::REMARKS),
            Some(&FieldValue::Text("Dining room closed by county order".into()))
        );
        assert_eq!(values.get("employees_2020"), Some(&FieldValue::Number(38.0)));
        assert_eq!(values.get("employees_2021"), Some(&FieldValue::Number(42.0)));
        assert_eq!(values.get("standard_full_shutdown"), Some(&FieldValue::Boolean(true)));
        assert_eq!(values.get("standard_supply_chain"), Some(&FieldValue::Boolean(true)));
        assert_eq!(values.get("qq_2020_q2_government_shutdown"), Some(&FieldValue::Boolean(true)));
        assert_eq!(values.get("qq_2021_q1_supply_disruption"), Some(&FieldValue::Boolean(true)));
        assert_eq!(values.get("qq_2020_q4_reduced_hours"), Some(&FieldValue::Boolean(true)));
        assert_eq!(values.get("revenue_2019_q4"), Some(&FieldValue::Number(100_000.0)));
        assert_eq!(values.get("revenue_2021_q2"), Some(&FieldValue::Number(75_000.0)));
        assert_eq!(values.get("credit_2020_q2_credit_wages"), Some(&FieldValue::Number(50_000.0)));
        assert_eq!(values.get("credit_2021_q4_qualified_wages"), Some(&FieldValue::Number(10_000.0)));
        assert_eq!(values.get("credit_2021_q1_employee_count"), Some(&FieldValue::Number(12.0)));
        assert!(values.is_success());
    }

    #[test]
    fn revenue_questions_are_derived_from_receipts() {
        let values = HeuristicExtractor::new().extract(&drifted_workbook(0)).unwrap();
        assert_eq!(values.get("qq_2020_q2_revenue_reduction_50"), Some(&FieldValue::Boolean(true)));
        assert_eq!(values.get("qq_2020_q3_revenue_reduction_50"), Some(&FieldValue::Boolean(false)));
        assert_eq!(values.get("qq_2021_q1_revenue_reduction_20"), Some(&FieldValue::Boolean(true)));
        assert_eq!(values.get("qq_2021_q3_revenue_reduction_20"), Some(&FieldValue::Boolean(false)));
    }

    #[test]
    fn ownership_table_is_walked_until_pattern_breaks() {
        let mut sheet = Sheet::new("Owners");
        sheet.set(CellAddress::at('A', 2), "Ownership Structure");
        sheet.set(CellAddress::at('A', 3), "Owner");
        sheet.set(CellAddress::at('B', 3), "Share");
        sheet.set(CellAddress::at('A', 4), "Ada Lovelace");
        sheet.set(CellAddress::at('B', 4), 0.5);
        sheet.set(CellAddress::at('A', 5), "Charles Babbage");
        sheet.set(CellAddress::at('B', 5), "30%");
        sheet.set(CellAddress::at('A', 6), "Total");
        sheet.set(CellAddress::at('B', 6), "see above");
        let values = HeuristicExtractor::new()
            .extract(&WorkbookHandle::new(vec![sheet]))
            .unwrap();
        assert_eq!(values.get("owner_1_name"), Some(&FieldValue::Text("Ada Lovelace".into())));
        assert_eq!(values.get("owner_1_percentage"), Some(&FieldValue::Number(50.0)));
        assert_eq!(values.get("owner_2_percentage"), Some(&FieldValue::Number(30.0)));
        assert!(!values.contains("owner_3_name"));
    }

    #[test]
    fn missing_tables_are_warnings() {
        let mut wb = drifted_workbook(0);
        wb.remove_sheet(&format!("Copy of {GROSS_RECEIPTS_SHEET}"));
        wb.remove_sheet(&format!("Copy of {PAYROLL_CREDITS_SHEET}"));
        let values = HeuristicExtractor::new().extract(&wb).unwrap();
        assert!(values.warnings.iter().any(|w| w.field == "gross_receipts"));
        assert!(values.warnings.iter().any(|w| w.field == "payroll_credits"));
        assert!(!values.contains("qq_2020_q2_revenue_reduction_50"));
    }

    #[test]
    fn unrelated_workbook_has_no_anchors() {
        let mut sheet = Sheet::new("Sheet1");
        sheet.set(CellAddress::at('A', 1), "Invoice 4411");
        sheet.set(CellAddress::at('B', 1), 12.0);
        let err = HeuristicExtractor::new()
            .extract(&WorkbookHandle::new(vec![sheet]))
            .unwrap_err();
        assert!(matches!(err, ExtractionError::NoAnchors));

        let err = HeuristicExtractor::new().extract(&WorkbookHandle::default()).unwrap_err();
        assert!(matches!(err, ExtractionError::EmptyWorkbook));
    }
}
