//! Meridian Solutions electric matrix, split by customer class.
//!
//! Exactly two sheets, Residential and Commercial; a stray extra sheet
//! means the layout changed and the file must be rejected. Usage tiers
//! are printed in MWh and convert to the kWh the pipeline stores.

use crate::dates::{month_window, DateStrategy};
use crate::error::RatesheetError;
use crate::parser::{
    stream_rows, AdapterConfig, CellExpectation, ParseContext, QuoteStream, SupplierAdapter,
    TitleMatch,
};
use crate::quote::Quote;
use crate::reader::{compile_regex, CellKind, Coord, SourceFormat};
use crate::suppliers::{is_blank_row, text_at};
use crate::units::EnergyUnit;
use crate::volume::{check_contiguous, VolumeRange};

const SHEETS: [(&str, &str); 2] = [("Residential", "RES"), ("Commercial", "COM")];
const TIER_PATTERN: &str = r"^(?P<low>[\d.]+)\s*-\s*(?P<high>[\d.]+)$";
const TERMS: [u32; 3] = [12, 24, 36];

pub struct MeridianSolutions {
    config: AdapterConfig,
}

impl MeridianSolutions {
    pub fn new() -> Self {
        let mut config = AdapterConfig::new(SourceFormat::Xlsx, EnergyUnit::Mwh, EnergyUnit::Kwh);
        config.expected_sheets = SHEETS.iter().map(|(title, _)| title.to_string()).collect();
        config.sheet_match = TitleMatch::Exact;
        config.expectations = SHEETS
            .iter()
            .map(|(title, _)| CellExpectation::text(*title, -1, 'B', r"(?i)usage.*MWh"))
            .collect();
        config.date_strategy = Some(DateStrategy::SingleCell {
            coord: Coord::new("Residential", -1, 'F'),
            pattern: None,
        });
        MeridianSolutions { config }
    }
}

impl Default for MeridianSolutions {
    fn default() -> Self {
        Self::new()
    }
}

impl SupplierAdapter for MeridianSolutions {
    fn config(&self) -> &AdapterConfig {
        &self.config
    }

    fn extract<'p>(&'p self, ctx: ParseContext<'p>) -> Result<QuoteStream<'p>, RatesheetError> {
        let window = ctx.window()?;
        let (start_from, start_until) = month_window(window.valid_from);
        let tier_re = compile_regex(TIER_PATTERN)?;
        let opts = ctx.volume_options();

        let mut stream: QuoteStream<'p> = Box::new(std::iter::empty());
        for (sheet, class) in SHEETS {
            let height = ctx.doc.get_height(&sheet.into())?;
            let tier_re = tier_re.clone();
            let mut prev: Option<(String, VolumeRange)> = None;
            let per_sheet = stream_rows(height, move |row| {
                if is_blank_row(&ctx, sheet, row)? {
                    return Ok(vec![]);
                }
                let utility = text_at(&ctx, sheet, row, 'A')?;
                let alias = format!("{class}-{utility}");
                let range = ctx.extract_volume(&Coord::new(sheet, row, 'B'), &tier_re, &opts)?;
                if let Some((prev_alias, prev_range)) = &prev {
                    if *prev_alias == alias {
                        check_contiguous(&[*prev_range, range], false)?;
                    }
                }
                prev = Some((alias.clone(), range));

                let ids = ctx.resolver.ids_for_alias(&alias);
                let mut quotes = Vec::new();
                for (i, term) in TERMS.iter().enumerate() {
                    let cell = ctx.doc.get(
                        sheet,
                        row,
                        i + 2,
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
                        purchase_of_receivables: false,
                        price,
                        source_ref: Some(format!(
                            "{}!{sheet} row {row}",
                            ctx.file_name.unwrap_or("<memory>")
                        )),
                    });
                }
                Ok(quotes)
            });
            stream = Box::new(stream.chain(per_sheet));
        }
        Ok(stream)
    }
}
