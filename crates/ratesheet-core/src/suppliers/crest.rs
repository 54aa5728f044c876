//! Crest Gas legacy-format natural gas matrix.
//!
//! Still distributed as a 97-2003 workbook. Tiers and prices are both
//! quoted per dekatherm; the tier bounds go through the usual unit
//! conversion, and the price is rescaled to $/therm by hand since unit
//! conversion applies to volumes, not rates.

use rust_decimal::Decimal;

use crate::dates::{add_months, month_window, DateStrategy};
use crate::error::RatesheetError;
use crate::parser::{
    stream_rows, AdapterConfig, CellExpectation, ParseContext, QuoteStream, SupplierAdapter,
};
use crate::quote::Quote;
use crate::reader::{compile_regex, Coord, SourceFormat};
use crate::suppliers::{decimal_at, int_at, is_blank_row, text_at};
use crate::units::EnergyUnit;
use crate::volume::{check_contiguous, VolumeRange};

const SHEET: &str = "Gas Matrix";
const TIER_PATTERN: &str = r"^(?P<low>[\d,]+)\s*(?:-\s*(?P<high>[\d,]+)|\+)$";

/// Therms per dekatherm, for rescaling the $/Dth price column.
fn therms_per_dth() -> Decimal {
    Decimal::from(10)
}

pub struct CrestGas {
    config: AdapterConfig,
}

impl CrestGas {
    pub fn new() -> Self {
        let mut config =
            AdapterConfig::new(SourceFormat::Xls, EnergyUnit::Dekatherm, EnergyUnit::Therm);
        config.expected_sheets = vec![SHEET.to_string()];
        config.expectations = vec![
            CellExpectation::text(SHEET, -1, 'A', r"^State$"),
            CellExpectation::text(SHEET, -1, 'C', r"(?i)usage.*Dth"),
            CellExpectation::text(SHEET, -1, 'E', r"(?i)\$/Dth"),
        ];
        config.date_strategy = Some(DateStrategy::SingleCell {
            coord: Coord::new(SHEET, -1, 'F'),
            pattern: None,
        });
        CrestGas { config }
    }
}

impl Default for CrestGas {
    fn default() -> Self {
        Self::new()
    }
}

impl SupplierAdapter for CrestGas {
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

            let term_months = int_at(&ctx, SHEET, row, 'D')? as u32;
            let price = decimal_at(&ctx, SHEET, row, 'E')? / therms_per_dth();
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
                    "{}!{SHEET} row {row}",
                    ctx.file_name.unwrap_or("<memory>")
                )),
            }])
        }))
    }
}
