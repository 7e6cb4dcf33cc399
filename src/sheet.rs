// 📋 Sheet Model - the tabular store behind the ledger
// Cells, A1 ranges, sheets and a workbook persisted as one CSV file per sheet.
//
// Rows and columns are 1-based everywhere in this module, like the sheet UI.

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SheetError {
    #[error("invalid A1 range: '{0}'")]
    InvalidRange(String),
    #[error("invalid column: '{0}'")]
    InvalidColumn(String),
}

// ============================================================================
// CELL
// ============================================================================

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Cell {
    #[default]
    Empty,
    Text(String),
    Number(Decimal),
    Date(NaiveDateTime),
    Formula(String),
}

const DATE_FORMATS: [&str; 2] = ["%d/%m/%Y", "%Y-%m-%d"];
const DATETIME_FORMATS: [&str; 5] = [
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
];

impl Cell {
    /// Interpret raw cell text the way the sheet would on paste
    pub fn parse(raw: &str) -> Cell {
        let trimmed = raw.trim();

        if trimmed.is_empty() {
            return Cell::Empty;
        }
        if trimmed.starts_with('=') {
            return Cell::Formula(trimmed.to_string());
        }
        if let Some(datetime) = parse_datetime(trimmed) {
            return Cell::Date(datetime);
        }
        if let Some(number) = parse_number(trimmed) {
            return Cell::Number(number);
        }

        Cell::Text(raw.to_string())
    }

    pub fn text(value: impl Into<String>) -> Cell {
        Cell::Text(value.into())
    }

    pub fn formula(value: impl Into<String>) -> Cell {
        Cell::Formula(value.into())
    }

    pub fn date(value: NaiveDate) -> Cell {
        Cell::Date(value.and_time(NaiveTime::MIN))
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(text) => text.trim().is_empty(),
            _ => false,
        }
    }

    /// Empty or numerically zero (the sheet's `x == 0 || x == null`)
    pub fn is_blank_or_zero(&self) -> bool {
        self.is_empty() || self.as_number().map_or(false, |n| n.is_zero())
    }

    pub fn as_number(&self) -> Option<Decimal> {
        match self {
            Cell::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Number, with empty cells read as zero (sheet arithmetic semantics)
    pub fn as_number_or_zero(&self) -> Option<Decimal> {
        if self.is_empty() {
            Some(Decimal::ZERO)
        } else {
            self.as_number()
        }
    }

    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            Cell::Date(dt) => Some(*dt),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        self.as_datetime().map(|dt| dt.date())
    }

    /// Display text for non-empty cells
    pub fn as_text(&self) -> Option<String> {
        (!self.is_empty()).then(|| self.to_string())
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Text(text) => f.write_str(text),
            Cell::Number(n) => write!(f, "{}", n.normalize()),
            Cell::Date(dt) if dt.time() == NaiveTime::MIN => {
                write!(f, "{}", dt.format("%d/%m/%Y"))
            }
            Cell::Date(dt) => write!(f, "{}", dt.format("%d/%m/%Y %H:%M:%S")),
            Cell::Formula(formula) => f.write_str(formula),
        }
    }
}

impl From<Decimal> for Cell {
    fn from(value: Decimal) -> Self {
        Cell::Number(value)
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
        .map(|date| date.and_time(NaiveTime::MIN))
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        })
}

/// "1234.5", "-54" or the Spanish "1.234,50"
fn parse_number(text: &str) -> Option<Decimal> {
    if let Ok(n) = Decimal::from_str(text) {
        return Some(n);
    }
    if text.contains(',') {
        let normalized = text.replace('.', "").replace(',', ".");
        return Decimal::from_str(&normalized).ok();
    }
    None
}

// ============================================================================
// A1 RANGES
// ============================================================================

/// "A" → 1, "AA" → 27
pub fn column_index(letters: &str) -> Result<usize, SheetError> {
    if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(SheetError::InvalidColumn(letters.to_string()));
    }
    letters
        .chars()
        .try_fold(0usize, |acc, c| {
            acc.checked_mul(26)?
                .checked_add(c.to_ascii_uppercase() as usize - 'A' as usize + 1)
        })
        .ok_or_else(|| SheetError::InvalidColumn(letters.to_string()))
}

/// 1 → "A", 27 → "AA"
pub fn column_letters(mut index: usize) -> String {
    let mut letters = Vec::new();
    while index > 0 {
        let rem = (index - 1) % 26;
        letters.push((b'A' + rem as u8) as char);
        index = (index - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// `F25`, `B44:F44`, `A1:G` (rows open at the bottom) or `A:A` (whole column)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct A1Range {
    pub start_col: usize,
    pub start_row: Option<usize>,
    pub end_col: usize,
    pub end_row: Option<usize>,
}

impl A1Range {
    pub fn cell(row: usize, col: usize) -> Self {
        A1Range {
            start_col: col,
            start_row: Some(row),
            end_col: col,
            end_row: Some(row),
        }
    }

    /// Concrete row span, with open ends resolved against `last_row`
    pub fn row_span(&self, last_row: usize) -> (usize, usize) {
        let start = self.start_row.unwrap_or(1);
        let end = self.end_row.unwrap_or(last_row.max(start));
        (start, end)
    }

    pub fn width(&self) -> usize {
        self.end_col + 1 - self.start_col
    }
}

fn split_ref(reference: &str) -> Option<(usize, Option<usize>)> {
    let digits_at = reference
        .find(|c: char| c.is_ascii_digit())
        .unwrap_or(reference.len());
    let (letters, digits) = reference.split_at(digits_at);
    let col = column_index(letters).ok()?;
    let row = if digits.is_empty() {
        None
    } else {
        Some(digits.parse::<usize>().ok().filter(|r| *r > 0)?)
    };
    Some((col, row))
}

impl FromStr for A1Range {
    type Err = SheetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || SheetError::InvalidRange(s.to_string());
        let (start, end) = match s.trim().split_once(':') {
            Some((start, end)) => (start, Some(end)),
            None => (s.trim(), None),
        };

        let (start_col, start_row) = split_ref(start).ok_or_else(invalid)?;
        let (end_col, end_row) = match end {
            Some(end) => split_ref(end).ok_or_else(invalid)?,
            None => (start_col, start_row),
        };

        // "F" alone is not a range, and ranges must run left-to-right / top-to-bottom
        if end.is_none() && start_row.is_none() {
            return Err(invalid());
        }
        if end_col < start_col {
            return Err(invalid());
        }
        if let (Some(a), Some(b)) = (start_row, end_row) {
            if b < a {
                return Err(invalid());
            }
        }

        Ok(A1Range {
            start_col,
            start_row,
            end_col,
            end_row,
        })
    }
}

impl fmt::Display for A1Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let part = |col: usize, row: Option<usize>| match row {
            Some(row) => format!("{}{}", column_letters(col), row),
            None => column_letters(col),
        };
        let start = part(self.start_col, self.start_row);
        let end = part(self.end_col, self.end_row);
        if start == end {
            f.write_str(&start)
        } else {
            write!(f, "{}:{}", start, end)
        }
    }
}

// ============================================================================
// SHEET
// ============================================================================

static EMPTY: Cell = Cell::Empty;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sheet {
    name: String,
    rows: Vec<Vec<Cell>>,
}

impl Sheet {
    pub fn new(name: impl Into<String>) -> Self {
        Sheet {
            name: name.into(),
            rows: Vec::new(),
        }
    }

    pub fn from_rows(name: impl Into<String>, rows: Vec<Vec<Cell>>) -> Self {
        Sheet {
            name: name.into(),
            rows,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn get(&self, row: usize, col: usize) -> &Cell {
        if row == 0 || col == 0 {
            return &EMPTY;
        }
        self.rows
            .get(row - 1)
            .and_then(|r| r.get(col - 1))
            .unwrap_or(&EMPTY)
    }

    pub fn set(&mut self, row: usize, col: usize, cell: Cell) {
        if row == 0 || col == 0 {
            log::warn!("{}: ignoring write to row {} col {}", self.name, row, col);
            return;
        }
        if self.rows.len() < row {
            self.rows.resize_with(row, Vec::new);
        }
        let cells = &mut self.rows[row - 1];
        if cells.len() < col {
            cells.resize(col, Cell::Empty);
        }
        cells[col - 1] = cell;
    }

    /// Block of `num_rows` x `num_cols` starting at (`row`, `col`)
    pub fn values(&self, row: usize, col: usize, num_rows: usize, num_cols: usize) -> Vec<Vec<Cell>> {
        (row..row + num_rows)
            .map(|r| (col..col + num_cols).map(|c| self.get(r, c).clone()).collect())
            .collect()
    }

    pub fn range_values(&self, range: &A1Range) -> Vec<Vec<Cell>> {
        let (start, end) = range.row_span(self.last_row());
        if end < start {
            return Vec::new();
        }
        self.values(start, range.start_col, end + 1 - start, range.width())
    }

    pub fn set_values(&mut self, row: usize, col: usize, values: &[Vec<Cell>]) {
        for (i, cells) in values.iter().enumerate() {
            for (j, cell) in cells.iter().enumerate() {
                self.set(row + i, col + j, cell.clone());
            }
        }
    }

    /// Shift everything from `row` down by `count` empty rows
    pub fn insert_rows_before(&mut self, row: usize, count: usize) {
        let at = row.saturating_sub(1);
        if self.rows.len() < at {
            self.rows.resize_with(at, Vec::new);
        }
        for _ in 0..count {
            self.rows.insert(at, Vec::new());
        }
    }

    /// Clear contents only
    pub fn clear(&mut self, range: &A1Range) {
        let (start, end) = range.row_span(self.last_row());
        for row in start..=end.min(self.rows.len()) {
            let cells = &mut self.rows[row - 1];
            for col in range.start_col..=range.end_col.min(cells.len()) {
                cells[col - 1] = Cell::Empty;
            }
        }
    }

    /// Last row holding any non-empty cell (0 when the sheet is blank)
    pub fn last_row(&self) -> usize {
        self.rows
            .iter()
            .rposition(|cells| cells.iter().any(|c| !c.is_empty()))
            .map_or(0, |i| i + 1)
    }

    pub fn last_row_in_column(&self, col: usize) -> usize {
        (1..=self.rows.len())
            .rev()
            .find(|row| !self.get(*row, col).is_empty())
            .unwrap_or(0)
    }

    // ------------------------------------------------------------------------
    // CSV persistence
    // ------------------------------------------------------------------------

    pub fn from_csv(name: impl Into<String>, path: &Path) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(path)
            .with_context(|| format!("Failed to open sheet file: {}", path.display()))?;

        let mut rows = Vec::new();
        for (line_num, record) in reader.records().enumerate() {
            let record = record.with_context(|| {
                format!("Failed to parse CSV line {} in {}", line_num + 1, path.display())
            })?;
            rows.push(record.iter().map(Cell::parse).collect());
        }

        Ok(Sheet::from_rows(name, rows))
    }

    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_path(path)
            .with_context(|| format!("Failed to create sheet file: {}", path.display()))?;

        // Blank lines are skipped on read, so every row keeps the full width
        let width = self.rows.iter().map(Vec::len).max().unwrap_or(0).max(1);
        for cells in &self.rows {
            let record: Vec<String> = (0..width)
                .map(|i| cells.get(i).map(|c| c.to_string()).unwrap_or_default())
                .collect();
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }
}

// ============================================================================
// WORKBOOK
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct Workbook {
    sheets: BTreeMap<String, Sheet>,
}

impl Workbook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_sheet(&mut self, sheet: Sheet) {
        self.sheets.insert(sheet.name().to_string(), sheet);
    }

    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.get(name)
    }

    pub fn sheet_mut(&mut self, name: &str) -> Option<&mut Sheet> {
        self.sheets.get_mut(name)
    }

    pub fn sheet_names(&self) -> impl Iterator<Item = &str> {
        self.sheets.keys().map(String::as_str)
    }

    /// Every `<sheet name>.csv` in `dir` becomes a sheet
    pub fn load_dir(dir: &Path) -> Result<Self> {
        let mut book = Workbook::new();
        let entries = fs::read_dir(dir)
            .with_context(|| format!("Failed to read workbook directory: {}", dir.display()))?;

        for entry in entries {
            let path = entry?.path();
            let is_csv = path
                .extension()
                .and_then(|e| e.to_str())
                .map_or(false, |e| e.eq_ignore_ascii_case("csv"));
            if !is_csv {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            book.add_sheet(Sheet::from_csv(name, &path)?);
        }

        log::debug!("loaded {} sheets from {}", book.sheets.len(), dir.display());
        Ok(book)
    }

    pub fn save_dir(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create workbook directory: {}", dir.display()))?;
        for sheet in self.sheets.values() {
            sheet.write_csv(&dir.join(format!("{}.csv", sheet.name())))?;
        }
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
