use calamine::{open_workbook_auto_from_rs, Data, Reader};
use rust_xlsxwriter::{Color, Format, FormatAlign, Workbook, Worksheet, XlsxError};
use std::collections::BTreeMap;
use std::fmt;
use std::io::Cursor;
use std::path::Path;
use std::str::FromStr;

use crate::error::WorkbookError;
use crate::services::coerce::parse_number;
use crate::types::CellValue;

/// Column letters used in `Sheet!A1` diagnostics and label checks
/// (0→A, 25→Z, 26→AA).
pub fn col_index_to_letter(index: u32) -> String {
    let mut letters = Vec::new();
    let mut n = u64::from(index) + 1;
    while n > 0 {
        let rem = ((n - 1) % 26) as u8;
        letters.push(char::from(b'A' + rem));
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// Excel letters to column index (A→0, Z→25, AA→26). Case-insensitive.
pub fn col_letter_to_index(letters: &str) -> Option<u32> {
    if letters.is_empty() || letters.len() > 3 {
        return None;
    }
    let mut n: u32 = 0;
    for c in letters.chars() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        n = n * 26 + (c.to_ascii_uppercase() as u32 - 'A' as u32 + 1);
    }
    Some(n - 1)
}

/// Zero-based cell coordinate. Displays and parses as A1 notation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellAddress {
    pub row: u32,
    pub col: u32,
}

impl CellAddress {
    pub const fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// Build from a column letter index and a 1-based row, as written in A1 notation.
    pub const fn at(col: char, row_1based: u32) -> Self {
        Self {
            row: row_1based.saturating_sub(1),
            col: (col as u32).saturating_sub('A' as u32),
        }
    }

    pub fn parse(a1: &str) -> Result<Self, WorkbookError> {
        let s = a1.trim();
        let split = s
            .find(|c: char| c.is_ascii_digit())
            .ok_or_else(|| WorkbookError::InvalidAddress(a1.to_string()))?;
        let (letters, digits) = s.split_at(split);
        let col = col_letter_to_index(letters).ok_or_else(|| WorkbookError::InvalidAddress(a1.to_string()))?;
        let row: u32 = digits
            .parse()
            .ok()
            .filter(|r| *r >= 1)
            .ok_or_else(|| WorkbookError::InvalidAddress(a1.to_string()))?;
        Ok(Self { row: row - 1, col })
    }

    /// Shift by a row/column delta; `None` when it would leave the sheet.
    pub fn offset(&self, rows: i64, cols: i64) -> Option<Self> {
        let row = i64::from(self.row) + rows;
        let col = i64::from(self.col) + cols;
        if row < 0 || col < 0 {
            return None;
        }
        Some(Self {
            row: u32::try_from(row).ok()?,
            col: u32::try_from(col).ok()?,
        })
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", col_index_to_letter(self.col), self.row + 1)
    }
}

impl FromStr for CellAddress {
    type Err = WorkbookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CellAddress::parse(s)
    }
}

static EMPTY_CELL: CellValue = CellValue::Empty;

/// One worksheet held in memory as a sparse grid.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sheet {
    name: String,
    cells: BTreeMap<CellAddress, CellValue>,
}

impl Sheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cells: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Empty values are not stored.
    pub fn set(&mut self, address: CellAddress, value: impl Into<CellValue>) {
        let value = value.into();
        if value.is_empty() {
            self.cells.remove(&address);
        } else {
            self.cells.insert(address, value);
        }
    }

    pub fn set_a1(&mut self, a1: &str, value: impl Into<CellValue>) -> Result<(), WorkbookError> {
        let address = CellAddress::parse(a1)?;
        self.set(address, value);
        Ok(())
    }

    pub fn get(&self, address: CellAddress) -> &CellValue {
        self.cells.get(&address).unwrap_or(&EMPTY_CELL)
    }

    pub fn cell(&self, row: u32, col: u32) -> &CellValue {
        self.get(CellAddress::new(row, col))
    }

    /// Non-empty cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = (CellAddress, &CellValue)> {
        self.cells.iter().map(|(a, v)| (*a, v))
    }

    pub fn is_blank(&self) -> bool {
        self.cells.is_empty()
    }

    /// Last used row (0-based), if any.
    pub fn max_row(&self) -> Option<u32> {
        self.cells.keys().map(|a| a.row).max()
    }

    pub fn max_col(&self) -> Option<u32> {
        self.cells.keys().map(|a| a.col).max()
    }

    /// `Sheet!B25` style location for diagnostics.
    pub fn location(&self, address: CellAddress) -> String {
        format!("{}!{}", self.name, address)
    }
}

/// A loaded workbook: sheets in workbook order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkbookHandle {
    sheets: Vec<Sheet>,
}

impl WorkbookHandle {
    pub fn new(sheets: Vec<Sheet>) -> Self {
        Self { sheets }
    }

    /// Exact name match first, then case-insensitive trimmed match.
    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name).or_else(|| {
            let wanted = name.trim();
            self.sheets
                .iter()
                .find(|s| s.name.trim().eq_ignore_ascii_case(wanted))
        })
    }

    pub fn sheet_mut(&mut self, name: &str) -> Option<&mut Sheet> {
        let idx = self.sheets.iter().position(|s| s.name == name).or_else(|| {
            self.sheets
                .iter()
                .position(|s| s.name.trim().eq_ignore_ascii_case(name.trim()))
        })?;
        self.sheets.get_mut(idx)
    }

    /// Returns the sheet with that name, creating it at the end if absent.
    pub fn sheet_or_insert(&mut self, name: &str) -> &mut Sheet {
        let idx = match self.sheets.iter().position(|s| s.name == name) {
            Some(i) => i,
            None => {
                self.sheets.push(Sheet::new(name));
                self.sheets.len() - 1
            }
        };
        &mut self.sheets[idx]
    }

    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }

    pub fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|s| s.name.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }

    pub fn remove_sheet(&mut self, name: &str) -> Option<Sheet> {
        let idx = self.sheets.iter().position(|s| s.name == name)?;
        Some(self.sheets.remove(idx))
    }
}

fn convert_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        other => CellValue::Text(other.to_string()),
    }
}

/// Parse workbook bytes (xlsx, xlsm, xls, ods) into memory.
pub fn load_workbook(bytes: &[u8]) -> Result<WorkbookHandle, WorkbookError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| WorkbookError::InvalidFormat(e.to_string()))?;
    let names = workbook.sheet_names().to_vec();
    let mut sheets = Vec::with_capacity(names.len());
    for name in names {
        let range = workbook
            .worksheet_range(&name)
            .map_err(|e| WorkbookError::InvalidFormat(format!("Sheet '{}': {}", name, e)))?;
        let mut sheet = Sheet::new(name.clone());
        if let Some((start_row, start_col)) = range.start() {
            for (r, c, cell) in range.used_cells() {
                let address = CellAddress::new(start_row + r as u32, start_col + c as u32);
                sheet.set(address, convert_cell(cell));
            }
        }
        sheets.push(sheet);
    }
    tracing::debug!(sheets = sheets.len(), "Workbook loaded");
    Ok(WorkbookHandle::new(sheets))
}

pub fn load_workbook_from_path(path: &Path) -> Result<WorkbookHandle, WorkbookError> {
    if !path.exists() {
        return Err(WorkbookError::NotFound(path.to_path_buf()));
    }
    let bytes = std::fs::read(path)?;
    load_workbook(&bytes)
}

/// Answers pasted into questionnaires from other tools can carry control
/// characters that xlsx XML rejects. Tabs and line breaks survive.
fn xml_safe_text(s: &str) -> String {
    s.chars()
        .filter(|c| matches!(c, '\t' | '\n' | '\r') || !(c.is_control() || matches!(c, '\u{FFFE}' | '\u{FFFF}')))
        .collect()
}

/// Write a whole in-memory workbook as xlsx bytes.
pub fn workbook_to_xlsx_bytes(handle: &WorkbookHandle) -> Result<Vec<u8>, WorkbookError> {
    let mut workbook = Workbook::new();
    for sheet in handle.sheets() {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(sheet.name())?;
        for (address, value) in sheet.cells() {
            let col = address.col as u16;
            match value {
                CellValue::Empty => {}
                CellValue::Text(s) => {
                    worksheet.write_string(address.row, col, xml_safe_text(s).as_str())?;
                }
                CellValue::Number(n) => {
                    worksheet.write_number(address.row, col, *n)?;
                }
                CellValue::Bool(b) => {
                    worksheet.write_boolean(address.row, col, *b)?;
                }
            }
        }
    }
    Ok(workbook.save_to_buffer()?)
}

/// Combined-export columns are sized to their longest value, within
/// readable bounds.
fn column_width_for(text: &str) -> f64 {
    (text.chars().count() as f64 + 2.0).clamp(10.0, 50.0)
}

/// Claim amounts arrive as formatted strings (`160000.00`, `$1,250`); they
/// are written as numbers so totals sum in Excel. Anything else stays text.
fn write_amount_cell(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: &str,
    amount_format: &Format,
) -> Result<(), XlsxError> {
    match parse_number(value) {
        Ok(amount) => worksheet.write_number_with_format(row, col, amount, amount_format)?,
        Err(_) => worksheet.write_string(row, col, xml_safe_text(value).as_str())?,
    };
    Ok(())
}

/// Write a header + rows table to a new xlsx file. Columns flagged by
/// `is_amount` are written as numbers with a `#,##0.00` format.
pub fn write_table_xlsx(
    path: &Path,
    sheet_name: &str,
    header: &[String],
    rows: &[Vec<String>],
    is_amount: impl Fn(&str) -> bool,
) -> Result<(), WorkbookError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet_name)?;

    let header_format = Format::new()
        .set_bold()
        .set_background_color(Color::RGB(0x2563EB))
        .set_font_color(Color::RGB(0xFFFFFF));
    let amount_format = Format::new()
        .set_num_format("#,##0.00")
        .set_align(FormatAlign::Right);

    let mut widths: Vec<f64> = header.iter().map(|h| column_width_for(h)).collect();
    for row in rows {
        for (col, value) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(col) {
                *w = w.max(column_width_for(value));
            }
        }
    }
    for (col, w) in widths.iter().enumerate() {
        worksheet.set_column_width(col as u16, *w)?;
    }

    for (col, name) in header.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, xml_safe_text(name).as_str(), &header_format)?;
    }
    let amount_cols: Vec<bool> = header.iter().map(|h| is_amount(h)).collect();
    for (row_idx, row) in rows.iter().enumerate() {
        let r = (row_idx + 1) as u32;
        for (col, value) in row.iter().enumerate() {
            if value.is_empty() {
                continue;
            }
            if amount_cols.get(col).copied().unwrap_or(false) {
                write_amount_cell(worksheet, r, col as u16, value, &amount_format)?;
            } else {
                worksheet.write_string(r, col as u16, xml_safe_text(value).as_str())?;
            }
        }
    }
    worksheet.set_freeze_panes(1, 0)?;
    workbook.save(path)?;
    Ok(())
}
