//! Liberty Rate comma-separated electric matrix.
//!
//! Flat CSV, one row per (state, utility, rate class, tier, term). The
//! price date is only in the file name. Liberty prints exclusive tier
//! floors ("101-500" meaning above 100), so the low boundary is fudged.

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
const USAGE_PATTERN: &str = r"^(?P<low>[\d,]+)\s*(?:-\s*(?P<high>[\d,]+)|\+)$";
const FILE_PATTERN: &str = r"matrix_(\d{4}-\d{2}-\d{2})\.csv$";

pub struct LibertyRate {
    config: AdapterConfig,
}

impl LibertyRate {
    pub fn new() -> Self {
        let mut config = AdapterConfig::new(SourceFormat::Csv, EnergyUnit::Kwh, EnergyUnit::Kwh);
        config.expectations = vec![
            CellExpectation::text(SHEET, -1, 'A', r"^State$"),
            CellExpectation::text(SHEET, -1, 'B', r"^Utility$"),
            CellExpectation::text(SHEET, -1, 'C', r"^Rate Class$"),
            CellExpectation::text(SHEET, -1, 'D', r"^Annual Usage"),
            CellExpectation::text(SHEET, -1, 'E', r"^Term"),
            CellExpectation::text(SHEET, -1, 'F', r"^Price$"),
        ];
        config.date_strategy = Some(DateStrategy::FromFileName {
            pattern: DatePattern::new(FILE_PATTERN, "%Y-%m-%d"),
        });
        LibertyRate { config }
    }
}

impl Default for LibertyRate {
    fn default() -> Self {
        Self::new()
    }
}

impl SupplierAdapter for LibertyRate {
    fn config(&self) -> &AdapterConfig {
        &self.config
    }

    fn extract<'p>(&'p self, ctx: ParseContext<'p>) -> Result<QuoteStream<'p>, RatesheetError> {
        let height = ctx.doc.get_height(&SHEET.into())?;
        let window = ctx.window()?;
        let (start_from, start_until) = month_window(add_months(window.valid_from, 1));
        let usage_re = compile_regex(USAGE_PATTERN)?;
        let mut opts = ctx.volume_options();
        opts.fudge_low = true;

        let mut prev: Option<(String, VolumeRange)> = None;
        Ok(stream_rows(height, move |row| {
            if is_blank_row(&ctx, SHEET, row)? {
                return Ok(vec![]);
            }
            let state = text_at(&ctx, SHEET, row, 'A')?;
            let utility = text_at(&ctx, SHEET, row, 'B')?;
            let rate_class = text_at(&ctx, SHEET, row, 'C')?;
            let alias = format!("{state}-{utility}-{rate_class}");

            let range = ctx.extract_volume(&Coord::new(SHEET, row, 'D'), &usage_re, &opts)?;
            if let Some((prev_alias, prev_range)) = &prev {
                if *prev_alias == alias {
                    check_contiguous(&[*prev_range, range], false)?;
                }
            }
            prev = Some((alias.clone(), range));

            let term_months = int_at(&ctx, SHEET, row, 'E')? as u32;
            let price = decimal_at(&ctx, SHEET, row, 'F')?;
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
State,Utility,Rate Class,Annual Usage,Term (Months),Price
CT,CLP,R1,0-100,12,0.0715
CT,CLP,R1,101-500,12,0.0699
CT,CLP,R1,501+,12,0.0689
NY,ConEd,SC1,0-250,24,0.0812
";

    fn parser() -> MatrixParser {
        MatrixParser::new(
            adapter_for(SupplierId::Liberty),
            Box::new(InMemoryResolver::default()),
        )
    }

    #[test]
    fn parses_csv_with_file_name_date() {
        let mut p = parser();
        p.load(CSV, Some("matrix_2015-05-04.csv")).unwrap();
        let quotes: Vec<Quote> = p.extract_quotes().unwrap().map(|q| q.unwrap()).collect();
        assert_eq!(quotes.len(), 4);
        assert_eq!(
            quotes[0].valid_from,
            NaiveDate::from_ymd_opt(2015, 5, 4).unwrap()
        );
        assert_eq!(
            quotes[0].valid_until,
            NaiveDate::from_ymd_opt(2015, 5, 5).unwrap()
        );
        // fudged floors keep the run contiguous
        assert_eq!(quotes[1].volume_min, dec!(100));
        assert_eq!(quotes[2].volume_min, dec!(500));
        assert_eq!(quotes[2].volume_limit, None);
        assert_eq!(quotes[3].rate_class_alias, "NY-ConEd-SC1");
    }

    #[test]
    fn unmatched_file_name_fails_extraction() {
        let mut p = parser();
        p.load(CSV, Some("prices-today.csv")).unwrap();
        assert!(p.validate().is_ok());
        let err = p
            .extract_quotes()
            .err()
            .expect("extraction needs the file-name date");
        assert!(err.to_string().contains("prices-today.csv"));
    }

    #[test]
    fn wrong_csv_header_fails_validation() {
        let bad = b"Region,Utility,Rate Class,Annual Usage,Term,Price\nCT,CLP,R1,0-100,12,0.0715\n";
        let mut p = parser();
        p.load(bad, Some("matrix_2015-05-04.csv")).unwrap();
        assert!(p.validate().is_err());
    }
}
