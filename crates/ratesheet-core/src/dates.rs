//! Validity-date derivation strategies.
//!
//! A matrix sheet states (or implies) the day(s) its prices are good
//! for. Suppliers encode this three different ways, so the strategies
//! form a closed set behind one contract: given the loaded document and
//! the file name, produce the (valid_from, valid_until) window.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::RatesheetError;
use crate::reader::{CellKind, CellValue, Coord, Document};

/// Lifetime of a quote's correctness: inclusive start, exclusive end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidityWindow {
    pub valid_from: NaiveDate,
    pub valid_until: NaiveDate,
}

impl ValidityWindow {
    /// A window covering exactly one calendar day.
    pub fn single_day(day: NaiveDate) -> Self {
        ValidityWindow {
            valid_from: day,
            valid_until: day + Duration::days(1),
        }
    }
}

/// A regex with exactly one capture group plus the chrono format string
/// used to parse what the group captured.
#[derive(Debug, Clone)]
pub struct DatePattern {
    pub pattern: String,
    pub format: String,
}

impl DatePattern {
    pub fn new(pattern: impl Into<String>, format: impl Into<String>) -> Self {
        DatePattern {
            pattern: pattern.into(),
            format: format.into(),
        }
    }
}

/// How a supplier's sheet states its validity dates.
#[derive(Debug, Clone)]
pub enum DateStrategy {
    /// One cell holds the date; prices are valid for exactly that day.
    /// The cell may be a native date/time, a numeric spreadsheet
    /// serial, or (with a pattern) text to be matched and parsed.
    SingleCell {
        coord: Coord,
        pattern: Option<DatePattern>,
    },
    /// Explicit start and end cells; the window includes the end day.
    StartEndCells {
        start: Coord,
        end: Coord,
        pattern: Option<DatePattern>,
    },
    /// The date lives in the file name, not the file contents.
    FromFileName { pattern: DatePattern },
}

impl DateStrategy {
    pub fn get_dates(
        &self,
        doc: &Document,
        file_name: Option<&str>,
    ) -> Result<ValidityWindow, RatesheetError> {
        match self {
            DateStrategy::SingleCell { coord, pattern } => {
                let day = read_date_cell(doc, coord, pattern.as_ref())?;
                Ok(ValidityWindow::single_day(day))
            }
            DateStrategy::StartEndCells {
                start,
                end,
                pattern,
            } => {
                let from = read_date_cell(doc, start, pattern.as_ref())?;
                let until = read_date_cell(doc, end, pattern.as_ref())?;
                if until < from {
                    return Err(RatesheetError::validation(format!(
                        "validity end {until} at {end} precedes start {from} at {start}"
                    )));
                }
                Ok(ValidityWindow {
                    valid_from: from,
                    valid_until: until + Duration::days(1),
                })
            }
            DateStrategy::FromFileName { pattern } => {
                let name = file_name.ok_or_else(|| {
                    RatesheetError::validation(format!(
                        "no file name available to match /{}/ against",
                        pattern.pattern
                    ))
                })?;
                let regex = crate::reader::compile_regex(&pattern.pattern)?;
                let captures = regex.captures(name).ok_or_else(|| {
                    RatesheetError::validation(format!(
                        "file name '{name}' does not match /{}/",
                        pattern.pattern
                    ))
                })?;
                let group = captures.get(1).ok_or_else(|| {
                    RatesheetError::validation(format!(
                        "/{}/ must have one capture group",
                        pattern.pattern
                    ))
                })?;
                let day = parse_date(group.as_str(), &pattern.format)?;
                Ok(ValidityWindow::single_day(day))
            }
        }
    }
}

/// Read one cell as a calendar date: native date/time, numeric
/// spreadsheet serial, or regex-then-parse when a pattern is given.
fn read_date_cell(
    doc: &Document,
    coord: &Coord,
    pattern: Option<&DatePattern>,
) -> Result<NaiveDate, RatesheetError> {
    if let Some(dp) = pattern {
        let regex = crate::reader::compile_regex(&dp.pattern)?;
        let values = doc.get_matches(
            coord.sheet.clone(),
            coord.row,
            coord.col,
            &regex,
            &[CellKind::Text],
        )?;
        let text = match &values[0] {
            CellValue::Text(s) => s.clone(),
            other => other.to_string(),
        };
        return parse_date(&text, &dp.format);
    }
    let value = doc.get(
        coord.sheet.clone(),
        coord.row,
        coord.col,
        &[CellKind::DateTime, CellKind::Int, CellKind::Float],
    )?;
    match value {
        CellValue::DateTime(dt) => Ok(dt.date()),
        CellValue::Int(i) => date_from_serial(i as f64).ok_or_else(|| {
            RatesheetError::validation(format!("cell at {coord}: {i} is not a valid date serial"))
        }),
        CellValue::Float(d) => {
            use rust_decimal::prelude::ToPrimitive;
            let f = d.to_f64().unwrap_or(f64::NAN);
            date_from_serial(f).ok_or_else(|| {
                RatesheetError::validation(format!(
                    "cell at {coord}: {d} is not a valid date serial"
                ))
            })
        }
        other => Err(RatesheetError::validation(format!(
            "cell at {coord} has type {}, expected a date",
            other.kind()
        ))),
    }
}

fn parse_date(text: &str, format: &str) -> Result<NaiveDate, RatesheetError> {
    NaiveDate::parse_from_str(text.trim(), format).map_err(|e| {
        RatesheetError::validation(format!("'{text}' does not parse with format '{format}': {e}"))
    })
}

/// Spreadsheet date serials count days since 1899-12-30.
pub fn datetime_from_serial(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let seconds = (serial * 86_400.0).round() as i64;
    base.checked_add_signed(Duration::seconds(seconds))
}

pub fn date_from_serial(serial: f64) -> Option<NaiveDate> {
    datetime_from_serial(serial).map(|dt| dt.date())
}

/// The service-period window for a contract starting any day in the
/// given month: first of that month (inclusive) to first of the next
/// (exclusive).
pub fn month_window(day: NaiveDate) -> (NaiveDate, NaiveDate) {
    let start = NaiveDate::from_ymd_opt(day.year(), day.month(), 1).unwrap_or(day);
    (start, add_months(start, 1))
}

/// Advance a date by whole months, clamping to the last day where the
/// target month is shorter.
pub fn add_months(date: NaiveDate, months: u32) -> NaiveDate {
    let total = date.year() * 12 + date.month0() as i32 + months as i32;
    let year = total.div_euclid(12);
    let month = total.rem_euclid(12) as u32 + 1;
    let mut day = date.day();
    loop {
        if let Some(d) = NaiveDate::from_ymd_opt(year, month, day) {
            return d;
        }
        day -= 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::Sheet;

    fn doc_with_cell(value: CellValue) -> Document {
        Document::from_sheets(vec![Sheet::new("S", vec![vec![value]])])
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn single_cell_regex_one_day_window() {
        let doc = doc_with_cell(CellValue::Text("as of 5/4/2015".into()));
        let strategy = DateStrategy::SingleCell {
            coord: Coord::new(0, -1, 'A'),
            pattern: Some(DatePattern::new(r"as of (\d+/\d+/\d+)", "%m/%d/%Y")),
        };
        let window = strategy.get_dates(&doc, None).unwrap();
        assert_eq!(window.valid_from, date(2015, 5, 4));
        assert_eq!(window.valid_until, date(2015, 5, 5));
    }

    #[test]
    fn single_cell_native_datetime() {
        let doc = doc_with_cell(CellValue::DateTime(
            date(2015, 5, 4).and_hms_opt(9, 30, 0).unwrap(),
        ));
        let strategy = DateStrategy::SingleCell {
            coord: Coord::new(0, -1, 'A'),
            pattern: None,
        };
        let window = strategy.get_dates(&doc, None).unwrap();
        assert_eq!(window.valid_from, date(2015, 5, 4));
    }

    #[test]
    fn single_cell_numeric_serial() {
        // 42128 days after 1899-12-30 is 2015-05-04
        let doc = doc_with_cell(CellValue::Int(42128));
        let strategy = DateStrategy::SingleCell {
            coord: Coord::new(0, -1, 'A'),
            pattern: None,
        };
        let window = strategy.get_dates(&doc, None).unwrap();
        assert_eq!(window.valid_from, date(2015, 5, 4));
    }

    #[test]
    fn start_end_cells_widen_to_include_end_day() {
        let doc = Document::from_sheets(vec![Sheet::new(
            "S",
            vec![vec![
                CellValue::DateTime(date(2015, 5, 4).and_hms_opt(0, 0, 0).unwrap()),
                CellValue::DateTime(date(2015, 5, 8).and_hms_opt(0, 0, 0).unwrap()),
            ]],
        )]);
        let strategy = DateStrategy::StartEndCells {
            start: Coord::new(0, -1, 'A'),
            end: Coord::new(0, -1, 'B'),
            pattern: None,
        };
        let window = strategy.get_dates(&doc, None).unwrap();
        assert_eq!(window.valid_from, date(2015, 5, 4));
        assert_eq!(window.valid_until, date(2015, 5, 9));
    }

    #[test]
    fn end_before_start_rejected() {
        let doc = Document::from_sheets(vec![Sheet::new(
            "S",
            vec![vec![
                CellValue::DateTime(date(2015, 5, 8).and_hms_opt(0, 0, 0).unwrap()),
                CellValue::DateTime(date(2015, 5, 4).and_hms_opt(0, 0, 0).unwrap()),
            ]],
        )]);
        let strategy = DateStrategy::StartEndCells {
            start: Coord::new(0, -1, 'A'),
            end: Coord::new(0, -1, 'B'),
            pattern: None,
        };
        assert!(strategy.get_dates(&doc, None).is_err());
    }

    #[test]
    fn file_name_strategy() {
        let doc = doc_with_cell(CellValue::Empty);
        let strategy = DateStrategy::FromFileName {
            pattern: DatePattern::new(r"matrix_(\d{4}-\d{2}-\d{2})\.csv", "%Y-%m-%d"),
        };
        let window = strategy
            .get_dates(&doc, Some("matrix_2015-05-04.csv"))
            .unwrap();
        assert_eq!(window.valid_from, date(2015, 5, 4));
        assert_eq!(window.valid_until, date(2015, 5, 5));
    }

    #[test]
    fn file_name_mismatch_names_regex_and_name() {
        let doc = doc_with_cell(CellValue::Empty);
        let strategy = DateStrategy::FromFileName {
            pattern: DatePattern::new(r"matrix_(\d{4}-\d{2}-\d{2})\.csv", "%Y-%m-%d"),
        };
        let err = strategy.get_dates(&doc, Some("prices.csv")).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("prices.csv"));
        assert!(msg.contains("matrix_"));
    }

    #[test]
    fn month_window_spans_one_month() {
        let (from, until) = month_window(date(2015, 6, 18));
        assert_eq!(from, date(2015, 6, 1));
        assert_eq!(until, date(2015, 7, 1));
    }

    #[test]
    fn add_months_clamps_short_months() {
        assert_eq!(add_months(date(2015, 1, 31), 1), date(2015, 2, 28));
        assert_eq!(add_months(date(2015, 11, 15), 3), date(2016, 2, 15));
    }
}
