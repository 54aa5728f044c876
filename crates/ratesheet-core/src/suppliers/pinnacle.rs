//! Pinnacle Energy wide-grid electric matrix.
//!
//! Terms run across eight columns, D through K, with the month count
//! in each header cell. Pinnacle is sloppy with tier boundaries in
//! both directions ("1 to 149", "150 to 301"), so both fudges are on.

use crate::dates::{add_months, month_window, DatePattern, DateStrategy};
use crate::error::RatesheetError;
use crate::parser::{
    stream_rows, AdapterConfig, CellExpectation, ParseContext, QuoteStream, SupplierAdapter,
};
use crate::quote::Quote;
use crate::addressing::column_range;
use crate::reader::{compile_regex, CellKind, Coord, SourceFormat};
use crate::suppliers::{is_blank_row, text_at};
use crate::units::EnergyUnit;
use crate::volume::{check_contiguous, VolumeRange};

const SHEET: &str = "Commercial Matrix";
const TIER_PATTERN: &str = r"^(?P<low>[\d,]+)\s+to\s+(?P<high>[\d,]+)$";
const TERM_PATTERN: &str = r"^(\d+)\s*Months?$";

pub struct PinnacleEnergy {
    config: AdapterConfig,
}

impl PinnacleEnergy {
    pub fn new() -> Self {
        let mut config =
            AdapterConfig::new(SourceFormat::Xlsx, EnergyUnit::Kwh, EnergyUnit::Kwh);
        config.expected_sheets = vec![SHEET.to_string()];
        config.expectations = vec![
            CellExpectation::text(SHEET, -1, 'A', r"^State$"),
            CellExpectation::text(SHEET, -1, 'B', r"^Utility$"),
            CellExpectation::text(SHEET, -1, 'C', r"(?i)annual usage"),
            CellExpectation::text(SHEET, -1, 'D', TERM_PATTERN),
            CellExpectation::text(SHEET, -1, 'K', TERM_PATTERN),
        ];
        config.date_strategy = Some(DateStrategy::SingleCell {
            coord: Coord::new(SHEET, -1, 'L'),
            pattern: Some(DatePattern::new(r"Effective (\d+/\d+/\d+)", "%m/%d/%Y")),
        });
        PinnacleEnergy { config }
    }
}

impl Default for PinnacleEnergy {
    fn default() -> Self {
        Self::new()
    }
}

impl SupplierAdapter for PinnacleEnergy {
    fn config(&self) -> &AdapterConfig {
        &self.config
    }

    fn extract<'p>(&'p self, ctx: ParseContext<'p>) -> Result<QuoteStream<'p>, RatesheetError> {
        let height = ctx.doc.get_height(&SHEET.into())?;
        let window = ctx.window()?;
        let (start_from, start_until) = month_window(add_months(window.valid_from, 1));
        let tier_re = compile_regex(TIER_PATTERN)?;
        let mut opts = ctx.volume_options();
        opts.fudge_low = true;
        opts.fudge_high = true;

        // Read the term for each price column out of the header row.
        let term_re = compile_regex(TERM_PATTERN)?;
        let term_cols = column_range('D'.into(), 'K'.into(), 1, true)?;
        let mut terms = Vec::with_capacity(term_cols.len());
        for col in &term_cols {
            let matches = ctx
                .doc
                .get_matches(SHEET, -1, *col, &term_re, &[CellKind::Int])?;
            let months = matches[0].as_i64().ok_or_else(|| {
                RatesheetError::validation(format!("term header in column {col} is not numeric"))
            })?;
            terms.push((*col, months as u32));
        }

        let mut prev: Option<(String, VolumeRange)> = None;
        Ok(stream_rows(height, move |row| {
            if is_blank_row(&ctx, SHEET, row)? {
                return Ok(vec![]);
            }
            let state = text_at(&ctx, SHEET, row, 'A')?;
            let utility = text_at(&ctx, SHEET, row, 'B')?;
            let alias = format!("{state}-{utility}");

            let range = ctx.extract_volume(&Coord::new(SHEET, row, 'C'), &tier_re, &opts)?;
            if let Some((prev_alias, prev_range)) = &prev {
                if *prev_alias == alias {
                    check_contiguous(&[*prev_range, range], false)?;
                }
            }
            prev = Some((alias.clone(), range));

            let ids = ctx.resolver.ids_for_alias(&alias);
            let mut quotes = Vec::new();
            for (col, term_months) in &terms {
                let cell = ctx.doc.get(
                    SHEET,
                    row,
                    *col,
                    &[CellKind::Float, CellKind::Int, CellKind::Empty],
                )?;
                let price = match cell.as_decimal() {
                    Some(p) => p,
                    None => continue,
                };
                quotes.push(Quote {
                    start_from,
                    start_until,
                    term_months: *term_months,
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::MatrixParser;
    use crate::quote::InMemoryResolver;
    use crate::reader::{CellValue, Document, Sheet};
    use crate::suppliers::{adapter_for, SupplierId};
    use rust_decimal_macros::dec;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.into())
    }

    fn header() -> Vec<CellValue> {
        let mut row = vec![text("State"), text("Utility"), text("Annual Usage (kWh)")];
        for months in [6, 9, 12, 18, 24, 30, 36, 48] {
            row.push(text(&format!("{months} Months")));
        }
        row.push(text("Effective 5/4/2015"));
        row
    }

    fn tier_row(tier: &str, base: &str) -> Vec<CellValue> {
        let mut row = vec![text("OH"), text("AEP"), text(tier)];
        let base: rust_decimal::Decimal = base.parse().unwrap();
        for i in 0..8u32 {
            row.push(CellValue::Float(
                base - rust_decimal::Decimal::new(i as i64, 4),
            ));
        }
        row
    }

    fn parser() -> MatrixParser {
        MatrixParser::new(
            adapter_for(SupplierId::Pinnacle),
            Box::new(InMemoryResolver::default()),
        )
    }

    #[test]
    fn eight_term_columns_fan_out() {
        let doc = Document::from_sheets(vec![Sheet::new(
            SHEET,
            vec![header(), tier_row("0 to 149", "0.0850")],
        )]);
        let mut p = parser();
        p.load_document(doc, None);
        let quotes: Vec<Quote> = p.extract_quotes().unwrap().map(|q| q.unwrap()).collect();
        assert_eq!(quotes.len(), 8);
        assert_eq!(quotes[0].term_months, 6);
        assert_eq!(quotes[7].term_months, 48);
        assert_eq!(quotes[0].price, dec!(0.0850));
    }

    #[test]
    fn sloppy_boundaries_fudge_both_ways() {
        let doc = Document::from_sheets(vec![Sheet::new(
            SHEET,
            vec![
                header(),
                // 149 snaps up to 150, 1 snaps down to 0
                tier_row("1 to 149", "0.0850"),
                tier_row("150 to 301", "0.0820"),
            ],
        )]);
        let mut p = parser();
        p.load_document(doc, None);
        let quotes: Vec<Quote> = p.extract_quotes().unwrap().map(|q| q.unwrap()).collect();
        assert_eq!(quotes[0].volume_min, dec!(0));
        assert_eq!(quotes[0].volume_limit, Some(dec!(150)));
        assert_eq!(quotes[8].volume_min, dec!(150));
        assert_eq!(quotes[8].volume_limit, Some(dec!(300)));
    }

    #[test]
    fn non_chaining_tiers_error() {
        let doc = Document::from_sheets(vec![Sheet::new(
            SHEET,
            vec![
                header(),
                tier_row("0 to 149", "0.0850"),
                tier_row("200 to 301", "0.0820"),
            ],
        )]);
        let mut p = parser();
        p.load_document(doc, None);
        let results: Vec<_> = p.extract_quotes().unwrap().collect();
        assert!(results.iter().any(|r| r.is_err()));
    }
}
