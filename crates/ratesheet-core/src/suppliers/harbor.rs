//! Harbor Gas comma-separated matrix.
//!
//! Flat CSV export of a multi-page report: every page break repeats
//! the header line, so data rows that restate the header are skipped.
//! Usage tiers are in Ccf and convert to therms. The validity window
//! is spelled out in two trailing header cells ("Valid 5/4/2015",
//! "through 5/8/2015").

use crate::dates::{add_months, month_window, DatePattern, DateStrategy};
use crate::error::RatesheetError;
use crate::parser::{
    stream_rows, AdapterConfig, CellExpectation, ParseContext, QuoteStream, SupplierAdapter,
};
use crate::quote::Quote;
use crate::reader::{compile_regex, Coord, SourceFormat};
use crate::suppliers::{decimal_at, int_at, is_blank_row, text_at};
use crate::units::EnergyUnit;
use crate::volume::{check_contiguous, VolumeRange};

const SHEET: usize = 0;
const TIER_PATTERN: &str = r"^(?P<low>[\d,]+)\s*(?:-\s*(?P<high>[\d,]+)|\+)$";
const DATE_PATTERN: &str = r"(\d+/\d+/\d+)";

pub struct HarborGas {
    config: AdapterConfig,
}

impl HarborGas {
    pub fn new() -> Self {
        let mut config = AdapterConfig::new(SourceFormat::Csv, EnergyUnit::Ccf, EnergyUnit::Therm);
        config.expectations = vec![
            CellExpectation::text(SHEET, -1, 'A', r"^Utility$"),
            CellExpectation::text(SHEET, -1, 'B', r"^Rate Class$"),
            CellExpectation::text(SHEET, -1, 'C', r"(?i)usage.*Ccf"),
            CellExpectation::text(SHEET, -1, 'D', r"^Term"),
            CellExpectation::text(SHEET, -1, 'E', r"^Price$"),
        ];
        config.date_strategy = Some(DateStrategy::StartEndCells {
            start: Coord::new(SHEET, -1, 'F'),
            end: Coord::new(SHEET, -1, 'G'),
            pattern: Some(DatePattern::new(DATE_PATTERN, "%m/%d/%Y")),
        });
        HarborGas { config }
    }
}

impl Default for HarborGas {
    fn default() -> Self {
        Self::new()
    }
}

impl SupplierAdapter for HarborGas {
    fn config(&self) -> &AdapterConfig {
        &self.config
    }

    fn extract<'p>(&'p self, ctx: ParseContext<'p>) -> Result<QuoteStream<'p>, RatesheetError> {
        let height = ctx.doc.get_height(&SHEET.into())?;
        let window = ctx.window()?;
        let (start_from, start_until) = month_window(add_months(window.valid_from, 1));
        let tier_re = compile_regex(TIER_PATTERN)?;
        let opts = ctx.volume_options();

        let mut prev: Option<(String, VolumeRange)> = None;
        Ok(stream_rows(height, move |row| {
            if is_blank_row(&ctx, SHEET, row)? {
                return Ok(vec![]);
            }
            let utility = text_at(&ctx, SHEET, row, 'A')?;
            // Page breaks in the source report restate the header line.
            if utility == "Utility" {
                return Ok(vec![]);
            }
            let rate_class = text_at(&ctx, SHEET, row, 'B')?;
            let alias = format!("{utility}-{rate_class}");

            let range = ctx.extract_volume(&Coord::new(SHEET, row, 'C'), &tier_re, &opts)?;
            if let Some((prev_alias, prev_range)) = &prev {
                if *prev_alias == alias {
                    check_contiguous(&[*prev_range, range], false)?;
                }
            }
            prev = Some((alias.clone(), range));

            let term_months = int_at(&ctx, SHEET, row, 'D')? as u32;
            let price = decimal_at(&ctx, SHEET, row, 'E')?;
            let ids = ctx.resolver.ids_for_alias(&alias);
            Ok(vec![Quote {
                start_from,
                start_until,
                term_months,
                valid_from: window.valid_from,
                valid_until: window.valid_until,
                volume_min: range.low_or_zero(),
                volume_limit: range.high,
                rate_class_alias: alias,
                rate_class_ids: ids,
                purchase_of_receivables: false,
                price,
                source_ref: Some(format!(
                    "{} row {row}",
                    ctx.file_name.unwrap_or("<memory>")
                )),
            }])
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::MatrixParser;
    use crate::quote::InMemoryResolver;
    use crate::suppliers::{adapter_for, SupplierId};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    const CSV: &[u8] = b"\
Utility,Rate Class,Monthly Usage (Ccf),Term (Months),Price,Valid 5/4/2015,through 5/8/2015
BGE,RS,0-1000,12,0.58
BGE,RS,1000-5000,12,0.55
Utility,Rate Class,Monthly Usage (Ccf),Term (Months),Price
BGE,RS,5000+,12,0.53
";

    fn parser() -> MatrixParser {
        MatrixParser::new(
            adapter_for(SupplierId::Harbor),
            Box::new(InMemoryResolver::default()),
        )
    }

    #[test]
    fn repeated_page_headers_are_skipped() {
        let mut p = parser();
        p.load(CSV, Some("harbor.csv")).unwrap();
        let quotes: Vec<Quote> = p.extract_quotes().unwrap().map(|q| q.unwrap()).collect();
        assert_eq!(quotes.len(), 3);
        assert_eq!(quotes[2].volume_limit, None);
    }

    #[test]
    fn tiers_convert_from_ccf_to_therms() {
        let mut p = parser();
        p.load(CSV, None).unwrap();
        let quotes: Vec<Quote> = p.extract_quotes().unwrap().map(|q| q.unwrap()).collect();
        // 1000 Ccf is 1037 therms
        assert_eq!(quotes[0].volume_limit, Some(dec!(1037.000)));
        assert_eq!(quotes[1].volume_min, dec!(1037.000));
    }

    #[test]
    fn header_cells_carry_the_validity_window() {
        let mut p = parser();
        p.load(CSV, None).unwrap();
        let quotes: Vec<Quote> = p.extract_quotes().unwrap().map(|q| q.unwrap()).collect();
        assert_eq!(
            quotes[0].valid_from,
            NaiveDate::from_ymd_opt(2015, 5, 4).unwrap()
        );
        // 5/8 is included, exclusive bound is 5/9
        assert_eq!(
            quotes[0].valid_until,
            NaiveDate::from_ymd_opt(2015, 5, 9).unwrap()
        );
    }
}
