//! Clearview Power daily electric matrix.
//!
//! One sheet, one row per (state, utility, usage tier), one price
//! column per contract term. The price date sits in the header row as
//! "as of M/D/YYYY"; contracts start the month after the price date.

use crate::addressing::column_range;
use crate::dates::{add_months, month_window, DatePattern, DateStrategy};
use crate::error::RatesheetError;
use crate::parser::{
    stream_rows, AdapterConfig, CellExpectation, ParseContext, QuoteStream, SupplierAdapter,
};
use crate::quote::Quote;
use crate::reader::{compile_regex, CellKind, Coord, SourceFormat};
use crate::suppliers::{is_blank_row, text_at};
use crate::units::EnergyUnit;
use crate::volume::{check_contiguous, VolumeRange};

const SHEET: &str = "Daily Matrix Price";
const USAGE_PATTERN: &str = r"^(?P<low>[\d,]+)\s*(?:-\s*(?P<high>[\d,]+)|\+)$";
const TERM_PATTERN: &str = r"(\d+)\s*Months?";

pub struct ClearviewPower {
    config: AdapterConfig,
}

impl ClearviewPower {
    pub fn new() -> Self {
        let mut config =
            AdapterConfig::new(SourceFormat::Xlsx, EnergyUnit::Kwh, EnergyUnit::Kwh);
        config.expected_sheets = vec![SHEET.to_string()];
        config.expectations = vec![
            CellExpectation::text(SHEET, -1, 'A', r"^State$"),
            CellExpectation::text(SHEET, -1, 'B', r"^Utility$"),
            CellExpectation::text(SHEET, -1, 'C', r"^Annual Usage"),
        ];
        config.date_strategy = Some(DateStrategy::SingleCell {
            coord: Coord::new(SHEET, -1, 'H'),
            pattern: Some(DatePattern::new(r"as of (\d+/\d+/\d+)", "%m/%d/%Y")),
        });
        ClearviewPower { config }
    }
}

impl Default for ClearviewPower {
    fn default() -> Self {
        Self::new()
    }
}

impl SupplierAdapter for ClearviewPower {
    fn config(&self) -> &AdapterConfig {
        &self.config
    }

    fn extract<'p>(&'p self, ctx: ParseContext<'p>) -> Result<QuoteStream<'p>, RatesheetError> {
        let height = ctx.doc.get_height(&SHEET.into())?;
        let window = ctx.window()?;
        let (start_from, start_until) = month_window(add_months(window.valid_from, 1));
        let usage_re = compile_regex(USAGE_PATTERN)?;
        let term_re = compile_regex(TERM_PATTERN)?;
        let opts = ctx.volume_options();

        // Term lengths come from the header cells above each price column.
        let term_cols = column_range('D'.into(), 'G'.into(), 1, true)?;
        let mut terms = Vec::with_capacity(term_cols.len());
        for col in &term_cols {
            let months = ctx
                .doc
                .get_matches(SHEET, -1, *col, &term_re, &[CellKind::Int])?;
            let months = months[0].as_i64().ok_or_else(|| {
                RatesheetError::validation(format!("term header in column {col} is not numeric"))
            })?;
            terms.push(months as u32);
        }

        let mut prev: Option<(String, VolumeRange)> = None;
        Ok(stream_rows(height, move |row| {
            if is_blank_row(&ctx, SHEET, row)? {
                prev = None;
                return Ok(vec![]);
            }
            let state = text_at(&ctx, SHEET, row, 'A')?;
            let utility = text_at(&ctx, SHEET, row, 'B')?;
            let alias = format!("{state}-{utility}");

            let range = ctx.extract_volume(&Coord::new(SHEET, row, 'C'), &usage_re, &opts)?;
            if let Some((prev_alias, prev_range)) = &prev {
                if *prev_alias == alias {
                    check_contiguous(&[*prev_range, range], false)?;
                }
            }
            prev = Some((alias.clone(), range));

            let ids = ctx.resolver.ids_for_alias(&alias);
            let mut quotes = Vec::new();
            for (i, col) in term_cols.iter().enumerate() {
                let cell = ctx.doc.get(
                    SHEET,
                    row,
                    *col,
                    &[CellKind::Float, CellKind::Int, CellKind::Empty],
                )?;
                // A blank price cell means the term is not offered for
                // this tier; that is not an error.
                let price = match cell.as_decimal() {
                    Some(p) => p,
                    None => continue,
                };
                quotes.push(Quote {
                    start_from,
                    start_until,
                    term_months: terms[i],
                    valid_from: window.valid_from,
                    valid_until: window.valid_until,
                    volume_min: range.low_or_zero(),
                    volume_limit: range.high,
                    rate_class_alias: alias.clone(),
                    rate_class_ids: ids.clone(),
                    purchase_of_receivables: false,
                    price,
                    source_ref: Some(format!(
                        "{}!{SHEET} row {row}",
                        ctx.file_name.unwrap_or("<memory>")
                    )),
                });
            }
            Ok(quotes)
        }))
    }
}
