//! Summit Energy stacked-block electric matrix.
//!
//! One sheet, organized as vertical blocks: a marker row names the
//! utility, then its usage tiers follow, restarting at 0 for each new
//! block. Summit prints exclusive tier floors ("76-150" meaning
//! everything above 75), so the low boundary is fudged.

use crate::dates::{month_window, DateStrategy};
use crate::error::RatesheetError;
use crate::parser::{
    stream_rows, AdapterConfig, CellExpectation, ParseContext, QuoteStream, SupplierAdapter,
};
use crate::quote::Quote;
use crate::reader::{compile_regex, CellKind, Coord, SourceFormat};
use crate::suppliers::{is_blank_row, text_at};
use crate::units::EnergyUnit;
use crate::volume::{check_contiguous, VolumeRange};

const SHEET: &str = "Matrix";
const BLOCK_PATTERN: &str = r"^Utility: (\S+) \((\w+)\)$";
const TIER_PATTERN: &str = r"^(?P<low>[\d,]+)\s*(?:-\s*(?P<high>[\d,]+)|\+)$";
const TERMS: [u32; 3] = [12, 24, 36];

pub struct SummitEnergy {
    config: AdapterConfig,
}

impl SummitEnergy {
    pub fn new() -> Self {
        let mut config =
            AdapterConfig::new(SourceFormat::Xlsx, EnergyUnit::Kwh, EnergyUnit::Kwh);
        config.expected_sheets = vec![SHEET.to_string()];
        config.expectations = vec![CellExpectation::text(SHEET, -1, 'A', r"^Summit Energy")];
        config.date_strategy = Some(DateStrategy::SingleCell {
            coord: Coord::new(SHEET, -1, 'B'),
            pattern: None,
        });
        SummitEnergy { config }
    }
}

impl Default for SummitEnergy {
    fn default() -> Self {
        Self::new()
    }
}

impl SupplierAdapter for SummitEnergy {
    fn config(&self) -> &AdapterConfig {
        &self.config
    }

    fn extract<'p>(&'p self, ctx: ParseContext<'p>) -> Result<QuoteStream<'p>, RatesheetError> {
        let height = ctx.doc.get_height(&SHEET.into())?;
        let window = ctx.window()?;
        let (start_from, start_until) = month_window(window.valid_from);
        let block_re = compile_regex(BLOCK_PATTERN)?;
        let tier_re = compile_regex(TIER_PATTERN)?;
        let mut opts = ctx.volume_options();
        opts.fudge_low = true;
        // Summit's tiers run on a 75 kWh grid, so the off-by-one floors
        // snap against that block size, not the default.
        opts.block = 75;

        let mut alias: Option<String> = None;
        let mut prev_range: Option<VolumeRange> = None;
        Ok(stream_rows(height, move |row| {
            if is_blank_row(&ctx, SHEET, row)? {
                return Ok(vec![]);
            }
            let leading = text_at(&ctx, SHEET, row, 'A')?;
            if let Some(captures) = block_re.captures(&leading) {
                let utility = &captures[1];
                let state = &captures[2];
                alias = Some(format!("{state}-{utility}"));
                return Ok(vec![]);
            }
            let alias = alias.clone().ok_or_else(|| {
                RatesheetError::validation(format!(
                    "row {row}: tier '{leading}' appears before any utility block marker"
                ))
            })?;

            let range = ctx.extract_volume(&Coord::new(SHEET, row, 'A'), &tier_re, &opts)?;
            // Tiers must chain within a block; a new block restarts at 0.
            if let Some(prev) = prev_range {
                check_contiguous(&[prev, range], true)?;
            }
            prev_range = Some(range);

            let por = match text_at(&ctx, SHEET, row, 'E')?.as_str() {
                "Y" => true,
                "N" => false,
                other => {
                    return Err(RatesheetError::validation(format!(
                        "row {row}: POR code '{other}' is not one of Y, N"
                    )));
                }
            };

            let ids = ctx.resolver.ids_for_alias(&alias);
            let mut quotes = Vec::new();
            for (i, term) in TERMS.iter().enumerate() {
                let cell = ctx.doc.get(
                    SHEET,
                    row,
                    i + 1,
                    &[CellKind::Float, CellKind::Int, CellKind::Empty],
                )?;
                let price = match cell.as_decimal() {
                    Some(p) => p,
                    None => continue,
                };
                quotes.push(Quote {
                    start_from,
                    start_until,
                    term_months: *term,
                    valid_from: window.valid_from,
                    valid_until: window.valid_until,
                    volume_min: range.low_or_zero(),
                    volume_limit: range.high,
                    rate_class_alias: alias.clone(),
                    rate_class_ids: ids.clone(),
                    purchase_of_receivables: por,
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
