//! Page/x/y positioned text source for PDF-derived matrix sheets.
//!
//! The framework does not extract text from PDFs itself; a collaborator
//! hands over positioned spans (JSON-serialized [`TextSpan`]s) and this
//! module answers "get text near this (page, y, x)" within a tolerance,
//! or normalizes a whole page into the row/column [`Document`] form so
//! grid adapters can reuse the ordinary typed-cell access.

use serde::{Deserialize, Serialize};

use crate::error::RatesheetError;
use crate::reader::{CellValue, Document, Sheet};

/// One piece of text at a position on a page. Coordinates are in
/// whatever unit the extraction backend reports (points, usually);
/// only relative distances matter here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextSpan {
    pub page: usize,
    pub x: f64,
    pub y: f64,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct PositionedDocument {
    spans: Vec<TextSpan>,
}

impl PositionedDocument {
    pub fn from_spans(spans: Vec<TextSpan>) -> Self {
        PositionedDocument { spans }
    }

    /// Load spans serialized as JSON (the hand-off format used when the
    /// extraction collaborator runs out of process).
    pub fn from_json(bytes: &[u8]) -> Result<Self, RatesheetError> {
        let spans: Vec<TextSpan> = serde_json::from_slice(bytes)
            .map_err(|e| RatesheetError::Load(format!("failed to parse positioned spans: {e}")))?;
        Ok(PositionedDocument { spans })
    }

    /// Text of the span closest to (page, y, x), if one lies within
    /// `tolerance` on both axes.
    pub fn text_near(&self, page: usize, y: f64, x: f64, tolerance: f64) -> Option<&str> {
        self.spans
            .iter()
            .filter(|s| s.page == page)
            .filter(|s| (s.y - y).abs() <= tolerance && (s.x - x).abs() <= tolerance)
            .min_by(|a, b| {
                let da = (a.y - y).abs() + (a.x - x).abs();
                let db = (b.y - y).abs() + (b.x - x).abs();
                da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|s| s.text.as_str())
    }

    /// Normalize into row/column form: spans sharing a y band (within
    /// `row_tolerance`) become one row, ordered left to right; columns
    /// are assigned by x cluster across the whole page. One sheet per
    /// page, titled "Page N". The first clustered row acts as the
    /// header row, matching the spreadsheet readers.
    pub fn into_document(&self, row_tolerance: f64) -> Result<Document, RatesheetError> {
        if self.spans.is_empty() {
            return Err(RatesheetError::Load("no positioned text spans".into()));
        }
        let max_page = self.spans.iter().map(|s| s.page).max().unwrap_or(0);
        let mut sheets = Vec::new();
        for page in 1..=max_page {
            let mut page_spans: Vec<&TextSpan> =
                self.spans.iter().filter(|s| s.page == page).collect();
            if page_spans.is_empty() {
                continue;
            }
            page_spans.sort_by(|a, b| {
                (a.y, a.x)
                    .partial_cmp(&(b.y, b.x))
                    .unwrap_or(std::cmp::Ordering::Equal)
            });

            let columns = column_centers(&page_spans, row_tolerance);

            let mut rows: Vec<Vec<CellValue>> = Vec::new();
            let mut current: Vec<&TextSpan> = Vec::new();
            let mut current_y = page_spans[0].y;
            for span in page_spans {
                if (span.y - current_y).abs() > row_tolerance {
                    rows.push(row_cells(&current, &columns));
                    current = Vec::new();
                    current_y = span.y;
                }
                current.push(span);
            }
            rows.push(row_cells(&current, &columns));
            sheets.push(Sheet::new(format!("Page {page}"), rows));
        }
        Ok(Document::from_sheets(sheets))
    }
}

/// Cluster x positions into column centers.
fn column_centers(spans: &[&TextSpan], tolerance: f64) -> Vec<f64> {
    let mut xs: Vec<f64> = spans.iter().map(|s| s.x).collect();
    xs.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mut centers: Vec<f64> = Vec::new();
    for x in xs {
        match centers.last() {
            Some(&last) if (x - last).abs() <= tolerance => {}
            _ => centers.push(x),
        }
    }
    centers
}

fn row_cells(spans: &[&TextSpan], columns: &[f64]) -> Vec<CellValue> {
    let mut cells = vec![CellValue::Empty; columns.len()];
    for span in spans {
        let col = columns
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                (span.x - **a)
                    .abs()
                    .partial_cmp(&(span.x - **b).abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|(i, _)| i)
            .unwrap_or(0);
        cells[col] = crate::reader::infer_text_cell(&span.text);
    }
    cells
}
