//! In-memory tabular document reader.
//!
//! Whole files are loaded up front into a table-of-sheets; supplier
//! files are bounded (tens of thousands of rows at most) and read once,
//! so there is no streaming path. All cell access is typed and
//! bounds-checked: an out-of-range coordinate or a wrong-typed cell is
//! a validation error naming the coordinate, never a silent default.

pub mod positioned;

use std::fmt;
use std::io::Cursor;

use calamine::{Data, Xls, Xlsx};
use chrono::NaiveDateTime;
use regex::Regex;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::addressing::{row_index, ColumnRef};
use crate::dates::datetime_from_serial;
use crate::error::RatesheetError;

/// Input encodings the reader accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    /// Legacy binary workbook (.xls).
    Xls,
    /// XML-based workbook (.xlsx).
    Xlsx,
    /// Comma-separated text, one implicit sheet.
    Csv,
    /// Page/x/y positioned text (PDF-derived), see [`positioned`].
    Positioned,
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SourceFormat::Xls => "xls",
            SourceFormat::Xlsx => "xlsx",
            SourceFormat::Csv => "csv",
            SourceFormat::Positioned => "positioned",
        };
        write!(f, "{s}")
    }
}

/// A sheet named by 0-based position or by exact title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetRef {
    Index(usize),
    Title(String),
}

impl From<usize> for SheetRef {
    fn from(i: usize) -> Self {
        SheetRef::Index(i)
    }
}

impl From<&str> for SheetRef {
    fn from(s: &str) -> Self {
        SheetRef::Title(s.to_string())
    }
}

impl fmt::Display for SheetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SheetRef::Index(i) => write!(f, "sheet {i}"),
            SheetRef::Title(t) => write!(f, "sheet '{t}'"),
        }
    }
}

/// A (sheet, row, column) address in Excel-style row numbering
/// (row -1 = header row, row 0 = first data row).
#[derive(Debug, Clone, PartialEq)]
pub struct Coord {
    pub sheet: SheetRef,
    pub row: i64,
    pub col: ColumnRef,
}

impl Coord {
    pub fn new(sheet: impl Into<SheetRef>, row: i64, col: impl Into<ColumnRef>) -> Self {
        Coord {
            sheet: sheet.into(),
            row,
            col: col.into(),
        }
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, row {}, column {}", self.sheet, self.row, self.col)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    Int,
    Float,
    Text,
    DateTime,
    Empty,
}

impl fmt::Display for CellKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CellKind::Int => "integer",
            CellKind::Float => "float",
            CellKind::Text => "text",
            CellKind::DateTime => "datetime",
            CellKind::Empty => "empty",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Int(i64),
    Float(Decimal),
    Text(String),
    DateTime(NaiveDateTime),
    Empty,
}

impl CellValue {
    pub fn kind(&self) -> CellKind {
        match self {
            CellValue::Int(_) => CellKind::Int,
            CellValue::Float(_) => CellKind::Float,
            CellValue::Text(_) => CellKind::Text,
            CellValue::DateTime(_) => CellKind::DateTime,
            CellValue::Empty => CellKind::Empty,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric view of the cell (integers widen to decimal).
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            CellValue::Int(i) => Some(Decimal::from(*i)),
            CellValue::Float(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            CellValue::Int(i) => Some(*i),
            CellValue::Float(d) if d.fract().is_zero() => d.to_i64(),
            _ => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Int(i) => write!(f, "{i}"),
            CellValue::Float(d) => write!(f, "{d}"),
            CellValue::Text(s) => write!(f, "{s}"),
            CellValue::DateTime(dt) => write!(f, "{dt}"),
            CellValue::Empty => write!(f, ""),
        }
    }
}

/// One sheet: a title plus its cells, header row first.
///
/// Internal row 0 is the header row; data rows follow. Rows are padded
/// to a uniform width at load time.
#[derive(Debug, Clone)]
pub struct Sheet {
    pub title: String,
    pub rows: Vec<Vec<CellValue>>,
}

impl Sheet {
    pub fn new(title: impl Into<String>, rows: Vec<Vec<CellValue>>) -> Self {
        let mut rows = rows;
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        for row in &mut rows {
            row.resize(width, CellValue::Empty);
        }
        Sheet {
            title: title.into(),
            rows,
        }
    }

    pub fn width(&self) -> usize {
        self.rows.first().map(Vec::len).unwrap_or(0)
    }
}

/// A whole loaded document: one or more ordered, named sheets.
#[derive(Debug, Clone)]
pub struct Document {
    sheets: Vec<Sheet>,
}

impl Document {
    /// Build a document from pre-constructed sheets (used by adapter
    /// preprocessing and by tests).
    pub fn from_sheets(sheets: Vec<Sheet>) -> Self {
        Document { sheets }
    }

    /// Parse a whole file into memory.
    pub fn load(bytes: &[u8], format: SourceFormat) -> Result<Self, RatesheetError> {
        let sheets = match format {
            SourceFormat::Xls => {
                let mut workbook: Xls<_> = calamine::open_workbook_from_rs(Cursor::new(bytes))
                    .map_err(|e| RatesheetError::Load(format!("failed to open xls: {e}")))?;
                sheets_from_workbook(&mut workbook)?
            }
            SourceFormat::Xlsx => {
                let mut workbook: Xlsx<_> = calamine::open_workbook_from_rs(Cursor::new(bytes))
                    .map_err(|e| RatesheetError::Load(format!("failed to open xlsx: {e}")))?;
                sheets_from_workbook(&mut workbook)?
            }
            SourceFormat::Csv => vec![load_csv(bytes)?],
            SourceFormat::Positioned => {
                return Err(RatesheetError::Load(
                    "positioned sources must be normalized to row/column form before load".into(),
                ));
            }
        };
        Ok(Document { sheets })
    }

    pub fn sheet_titles(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.title.as_str()).collect()
    }

    pub fn sheet(&self, sheet: &SheetRef) -> Result<&Sheet, RatesheetError> {
        match sheet {
            SheetRef::Index(i) => self.sheets.get(*i),
            SheetRef::Title(t) => self.sheets.iter().find(|s| &s.title == t),
        }
        .ok_or_else(|| RatesheetError::validation(format!("{sheet} not found in document")))
    }

    /// Number of data rows (the header row is not counted), so adapters
    /// can loop `0..get_height(..)` in Excel row numbers.
    pub fn get_height(&self, sheet: &SheetRef) -> Result<usize, RatesheetError> {
        Ok(self.sheet(sheet)?.rows.len().saturating_sub(1))
    }

    pub fn get_width(&self, sheet: &SheetRef) -> Result<usize, RatesheetError> {
        Ok(self.sheet(sheet)?.width())
    }

    fn cell(&self, coord: &Coord) -> Result<&CellValue, RatesheetError> {
        let sheet = self.sheet(&coord.sheet)?;
        let row = row_index(coord.row)?;
        let col = coord.col.index()?;
        sheet
            .rows
            .get(row)
            .and_then(|r| r.get(col))
            .ok_or_else(|| {
                RatesheetError::validation(format!(
                    "coordinate out of bounds: {coord} (sheet is {} rows x {} columns)",
                    sheet.rows.len(),
                    sheet.width()
                ))
            })
    }

    /// Typed cell lookup. `kinds` lists the acceptable cell types; a
    /// mismatch fails with the coordinate, expected/actual types, and
    /// the text of the four neighboring cells.
    pub fn get(
        &self,
        sheet: impl Into<SheetRef>,
        row: i64,
        col: impl Into<ColumnRef>,
        kinds: &[CellKind],
    ) -> Result<CellValue, RatesheetError> {
        let coord = Coord::new(sheet, row, col);
        let value = self.cell(&coord)?.clone();
        if kinds.contains(&value.kind()) {
            return Ok(value);
        }
        // Numeric widening: spreadsheet programs store whole numbers
        // interchangeably as integer or float cells.
        if kinds.contains(&CellKind::Float) {
            if let CellValue::Int(i) = value {
                return Ok(CellValue::Float(Decimal::from(i)));
            }
        }
        if kinds.contains(&CellKind::Int) {
            if let Some(i) = value.as_i64() {
                return Ok(CellValue::Int(i));
            }
        }
        let expected = kinds
            .iter()
            .map(|k| k.to_string())
            .collect::<Vec<_>>()
            .join(" or ");
        Err(RatesheetError::validation(format!(
            "cell at {coord} has type {} (value '{value}'), expected {expected}; neighbors: {}",
            value.kind(),
            self.neighbor_summary(&coord)
        )))
    }

    /// Regex extraction with type coercion. The cell must be text, the
    /// regex must match, and the number of capture groups must equal
    /// the number of requested kinds. Numeric conversion strips
    /// thousands separators.
    pub fn get_matches(
        &self,
        sheet: impl Into<SheetRef>,
        row: i64,
        col: impl Into<ColumnRef>,
        pattern: &Regex,
        kinds: &[CellKind],
    ) -> Result<Vec<CellValue>, RatesheetError> {
        let coord = Coord::new(sheet, row, col);
        let value = self.cell(&coord)?;
        let text = value.as_text().ok_or_else(|| {
            RatesheetError::validation(format!(
                "cell at {coord} has type {} (value '{value}'), expected text for regex match",
                value.kind()
            ))
        })?;
        let captures = pattern.captures(text).ok_or_else(|| {
            RatesheetError::validation(format!(
                "cell at {coord}: '{text}' does not match /{pattern}/"
            ))
        })?;
        let groups = captures.len() - 1;
        if groups != kinds.len() {
            return Err(RatesheetError::validation(format!(
                "cell at {coord}: /{pattern}/ has {groups} capture group(s), expected {}",
                kinds.len()
            )));
        }
        let mut values = Vec::with_capacity(kinds.len());
        for (i, kind) in kinds.iter().enumerate() {
            let group = captures.get(i + 1).ok_or_else(|| {
                RatesheetError::validation(format!(
                    "cell at {coord}: capture group {} of /{pattern}/ did not participate",
                    i + 1
                ))
            })?;
            values.push(convert_group(group.as_str(), *kind, &coord)?);
        }
        Ok(values)
    }

    fn neighbor_summary(&self, coord: &Coord) -> String {
        let col = coord.col.index().unwrap_or(0);
        let around = [
            (coord.row - 1, ColumnRef::Index(col)),
            (coord.row + 1, ColumnRef::Index(col)),
            (coord.row, ColumnRef::Index(col.saturating_sub(1))),
            (coord.row, ColumnRef::Index(col + 1)),
        ];
        around
            .iter()
            .map(|(r, c)| {
                let neighbor = Coord {
                    sheet: coord.sheet.clone(),
                    row: *r,
                    col: *c,
                };
                match self.cell(&neighbor) {
                    Ok(v) => format!("'{v}'"),
                    Err(_) => "<out of bounds>".to_string(),
                }
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Convert one regex capture group to the requested cell kind.
fn convert_group(s: &str, kind: CellKind, coord: &Coord) -> Result<CellValue, RatesheetError> {
    let cleaned = s.replace(',', "");
    match kind {
        CellKind::Text => Ok(CellValue::Text(s.to_string())),
        CellKind::Int => cleaned
            .trim()
            .parse::<i64>()
            .map(CellValue::Int)
            .map_err(|e| {
                RatesheetError::validation(format!(
                    "cell at {coord}: group '{s}' is not an integer: {e}"
                ))
            }),
        CellKind::Float => cleaned
            .trim()
            .parse::<Decimal>()
            .map(CellValue::Float)
            .map_err(|e| {
                RatesheetError::validation(format!(
                    "cell at {coord}: group '{s}' is not a number: {e}"
                ))
            }),
        CellKind::DateTime | CellKind::Empty => Err(RatesheetError::validation(format!(
            "cell at {coord}: cannot convert regex group to {kind}"
        ))),
    }
}

fn sheets_from_workbook<RS, R>(workbook: &mut R) -> Result<Vec<Sheet>, RatesheetError>
where
    RS: std::io::Read + std::io::Seek,
    R: calamine::Reader<RS>,
    R::Error: fmt::Display,
{
    let names = workbook.sheet_names().to_owned();
    let mut sheets = Vec::with_capacity(names.len());
    for name in names {
        let range = workbook
            .worksheet_range(&name)
            .map_err(|e| RatesheetError::Load(format!("failed to read sheet '{name}': {e}")))?;
        let (height, width) = range
            .end()
            .map(|(r, c)| (r as usize + 1, c as usize + 1))
            .unwrap_or((0, 0));
        let mut rows = Vec::with_capacity(height);
        for r in 0..height {
            let mut row = Vec::with_capacity(width);
            for c in 0..width {
                row.push(convert_cell(range.get_value((r as u32, c as u32))));
            }
            rows.push(row);
        }
        sheets.push(Sheet::new(name, rows));
    }
    Ok(sheets)
}

fn convert_cell(cell: Option<&Data>) -> CellValue {
    match cell {
        None | Some(Data::Empty) | Some(Data::Error(_)) => CellValue::Empty,
        Some(Data::Int(i)) => CellValue::Int(*i),
        Some(Data::Float(f)) => CellValue::Float(decimal_from_f64(*f)),
        Some(Data::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                CellValue::Empty
            } else {
                CellValue::Text(trimmed.to_string())
            }
        }
        Some(Data::Bool(b)) => CellValue::Text(b.to_string()),
        Some(Data::DateTime(dt)) => match datetime_from_serial(dt.as_f64()) {
            Some(ndt) => CellValue::DateTime(ndt),
            None => CellValue::Empty,
        },
        Some(Data::DateTimeIso(s)) => match s.parse::<NaiveDateTime>() {
            Ok(ndt) => CellValue::DateTime(ndt),
            Err(_) => CellValue::Text(s.clone()),
        },
        Some(Data::DurationIso(s)) => CellValue::Text(s.clone()),
    }
}

fn load_csv(bytes: &[u8]) -> Result<Sheet, RatesheetError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);
    let mut rows = Vec::new();
    for record in reader.records() {
        let record =
            record.map_err(|e| RatesheetError::Load(format!("failed to read csv: {e}")))?;
        rows.push(record.iter().map(infer_text_cell).collect());
    }
    Ok(Sheet::new("Sheet1", rows))
}

/// Untyped text sources (CSV fields, positioned PDF spans) get their
/// cell types inferred the same way a spreadsheet import would:
/// integer, then number, then text.
pub(crate) fn infer_text_cell(field: &str) -> CellValue {
    let trimmed = field.trim();
    if trimmed.is_empty() {
        return CellValue::Empty;
    }
    if let Ok(i) = trimmed.parse::<i64>() {
        return CellValue::Int(i);
    }
    if let Ok(d) = trimmed.parse::<Decimal>() {
        return CellValue::Float(d);
    }
    CellValue::Text(trimmed.to_string())
}

/// Compile a regex pattern, folding a bad pattern into the validation
/// error kind (patterns come from adapter configuration).
pub(crate) fn compile_regex(pattern: &str) -> Result<Regex, RatesheetError> {
    Regex::new(pattern)
        .map_err(|e| RatesheetError::validation(format!("invalid pattern /{pattern}/: {e}")))
}

/// Convert f64 to Decimal via string round-trip to avoid floating-point
/// artifacts (e.g., 0.0035_f64 becoming 0.00349999...).
pub(crate) fn decimal_from_f64(f: f64) -> Decimal {
    let s = format!("{f}");
    s.parse::<Decimal>()
        .unwrap_or_else(|_| Decimal::try_from(f).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.into())
    }

    fn sample_doc() -> Document {
        Document::from_sheets(vec![Sheet::new(
            "Daily Matrix Price",
            vec![
                vec![text("State"), text("Utility"), text("Usage"), text("Price")],
                vec![text("CT"), text("CLP"), text("0-100"), CellValue::Float(dec!(0.0715))],
                vec![text("CT"), text("UI"), text("100-500"), CellValue::Int(8)],
            ],
        )])
    }

    #[test]
    fn header_row_is_minus_one() {
        let doc = sample_doc();
        let v = doc.get(0, -1, 'A', &[CellKind::Text]).unwrap();
        assert_eq!(v, text("State"));
        let v = doc.get(0, 0, 'A', &[CellKind::Text]).unwrap();
        assert_eq!(v, text("CT"));
    }

    #[test]
    fn letter_and_index_columns_hit_same_cell() {
        let doc = sample_doc();
        let by_letter = doc.get(0, 0, 'C', &[CellKind::Text]).unwrap();
        let by_index = doc.get(0, 0, 2usize, &[CellKind::Text]).unwrap();
        assert_eq!(by_letter, by_index);
    }

    #[test]
    fn sheet_by_title() {
        let doc = sample_doc();
        let v = doc
            .get("Daily Matrix Price", 0, 'B', &[CellKind::Text])
            .unwrap();
        assert_eq!(v, text("CLP"));
    }

    #[test]
    fn out_of_bounds_is_validation_error() {
        let doc = sample_doc();
        let err = doc.get(0, 99, 'A', &[CellKind::Text]).unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("row 99"));
    }

    #[test]
    fn missing_sheet_is_validation_error() {
        let doc = sample_doc();
        let err = doc.get("Other Sheet", 0, 'A', &[CellKind::Text]).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn type_mismatch_names_coordinate_and_neighbors() {
        let doc = sample_doc();
        let err = doc.get(0, 0, 'A', &[CellKind::Int]).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("column A"));
        assert!(msg.contains("expected integer"));
        assert!(msg.contains("neighbors"));
    }

    #[test]
    fn int_widens_to_float_on_request() {
        let doc = sample_doc();
        let v = doc.get(0, 1, 'D', &[CellKind::Float]).unwrap();
        assert_eq!(v, CellValue::Float(dec!(8)));
    }

    #[test]
    fn get_matches_converts_groups() {
        let doc = sample_doc();
        let re = Regex::new(r"(\d+)-(\d+)").unwrap();
        let values = doc
            .get_matches(0, 0, 'C', &re, &[CellKind::Int, CellKind::Int])
            .unwrap();
        assert_eq!(values, vec![CellValue::Int(0), CellValue::Int(100)]);
    }

    #[test]
    fn get_matches_rejects_wrong_arity() {
        let doc = sample_doc();
        let re = Regex::new(r"(\d+)-(\d+)").unwrap();
        let err = doc.get_matches(0, 0, 'C', &re, &[CellKind::Int]).unwrap_err();
        assert!(err.to_string().contains("capture group"));
    }

    #[test]
    fn get_matches_rejects_no_match() {
        let doc = sample_doc();
        let re = Regex::new(r"^price: (\d+)$").unwrap();
        let err = doc.get_matches(0, 0, 'C', &re, &[CellKind::Int]).unwrap_err();
        assert!(err.to_string().contains("does not match"));
    }

    #[test]
    fn thousands_separators_stripped_in_groups() {
        let doc = Document::from_sheets(vec![Sheet::new(
            "S",
            vec![vec![], vec![text("1,000 - 5,000 kWh")]],
        )]);
        let re = Regex::new(r"([\d,]+) - ([\d,]+)").unwrap();
        let values = doc
            .get_matches(0, 0, 'A', &re, &[CellKind::Int, CellKind::Int])
            .unwrap();
        assert_eq!(values, vec![CellValue::Int(1000), CellValue::Int(5000)]);
    }

    #[test]
    fn height_counts_data_rows_only() {
        let doc = sample_doc();
        assert_eq!(doc.get_height(&SheetRef::Index(0)).unwrap(), 2);
        assert_eq!(doc.get_width(&SheetRef::Index(0)).unwrap(), 4);
    }

    #[test]
    fn csv_loads_with_inferred_types() {
        let bytes = b"Utility,Term,Price\nCLP,12,0.0715\nUI,24,0.0699\n";
        let doc = Document::load(bytes, SourceFormat::Csv).unwrap();
        assert_eq!(doc.sheet_titles(), vec!["Sheet1"]);
        assert_eq!(
            doc.get(0, 0, 'B', &[CellKind::Int]).unwrap(),
            CellValue::Int(12)
        );
        assert_eq!(
            doc.get(0, 0, 'C', &[CellKind::Float]).unwrap(),
            CellValue::Float(dec!(0.0715))
        );
    }
}
