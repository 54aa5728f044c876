//! Spreadsheet-style cell addressing.
//!
//! Columns can be named either by letter ("C") or by 0-based index (2);
//! both resolve to the same cell. Rows use Excel-style numbering where
//! row -1 is the sheet's header row and row 0 is the first data row
//! beneath it.

use std::fmt;

use crate::error::RatesheetError;

/// A column named by letter or by 0-based index.
///
/// Single letters A-Z only; supplier matrix sheets never reach column AA.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRef {
    Index(usize),
    Letter(char),
}

impl ColumnRef {
    pub fn index(&self) -> Result<usize, RatesheetError> {
        match self {
            ColumnRef::Index(i) => Ok(*i),
            ColumnRef::Letter(c) => column_index(*c),
        }
    }
}

impl From<usize> for ColumnRef {
    fn from(i: usize) -> Self {
        ColumnRef::Index(i)
    }
}

impl From<char> for ColumnRef {
    fn from(c: char) -> Self {
        ColumnRef::Letter(c)
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnRef::Index(i) => match column_letter(*i) {
                Some(c) => write!(f, "{c}"),
                None => write!(f, "#{i}"),
            },
            ColumnRef::Letter(c) => write!(f, "{c}"),
        }
    }
}

/// Convert a column letter to its 0-based index ("A" -> 0, "Z" -> 25).
pub fn column_index(letter: char) -> Result<usize, RatesheetError> {
    let upper = letter.to_ascii_uppercase();
    if upper.is_ascii_uppercase() {
        Ok(upper as usize - 'A' as usize)
    } else {
        Err(RatesheetError::validation(format!(
            "invalid column letter '{letter}' (expected A-Z)"
        )))
    }
}

/// Convert a 0-based column index back to its letter, if it has one.
pub fn column_letter(index: usize) -> Option<char> {
    if index < 26 {
        Some((b'A' + index as u8) as char)
    } else {
        None
    }
}

/// Resolve an Excel-style row number to an internal 0-based index.
///
/// Row -1 addresses the header row (internal index 0); row 0 addresses
/// the first data row (internal index 1).
pub fn row_index(excel_row: i64) -> Result<usize, RatesheetError> {
    if excel_row < -1 {
        return Err(RatesheetError::validation(format!(
            "invalid row {excel_row} (rows start at -1, the header row)"
        )));
    }
    Ok((excel_row + 1) as usize)
}

/// Expand a column range into a sequence of 0-based indices.
///
/// Unlike the usual half-open range convention, `stop` is included by
/// default: spreadsheet column ranges are conventionally inclusive
/// ("columns D through I" means both endpoints).
pub fn column_range(
    start: ColumnRef,
    stop: ColumnRef,
    step: usize,
    inclusive: bool,
) -> Result<Vec<usize>, RatesheetError> {
    if step == 0 {
        return Err(RatesheetError::validation("column range step must be > 0"));
    }
    let start = start.index()?;
    let stop = stop.index()?;
    if stop < start {
        return Err(RatesheetError::validation(format!(
            "column range stop ({}) before start ({})",
            ColumnRef::Index(stop),
            ColumnRef::Index(start)
        )));
    }
    let end = if inclusive { stop + 1 } else { stop };
    Ok((start..end).step_by(step).collect())
}
