//! Hudson Gas state-by-state matrix.
//!
//! One sheet per state, one row per (utility, rate code, start month,
//! term). Validity start/end dates live in two header cells on the CT
//! sheet. The POR column is a closed Y/N code; anything else on a data
//! row is a malformed file.

use crate::dates::{month_window, DateStrategy};
use crate::error::RatesheetError;
use crate::parser::{
    stream_rows, AdapterConfig, CellExpectation, ParseContext, QuoteStream, SupplierAdapter,
};
use crate::quote::Quote;
use crate::reader::{CellKind, CellValue, Coord, SourceFormat};
use crate::suppliers::{decimal_at, int_at, is_blank_row, text_at};
use crate::units::EnergyUnit;

const STATES: [&str; 3] = ["CT", "NY", "NJ"];

pub struct HudsonGas {
    config: AdapterConfig,
}

impl HudsonGas {
    pub fn new() -> Self {
        let mut config =
            AdapterConfig::new(SourceFormat::Xls, EnergyUnit::Therm, EnergyUnit::Therm);
        config.expected_sheets = STATES.iter().map(|s| s.to_string()).collect();
        config.expectations = STATES
            .iter()
            .flat_map(|state| {
                vec![
                    CellExpectation::text(*state, -1, 'A', r"^Utility$"),
                    CellExpectation::text(*state, -1, 'E', r"\$/therm"),
                    CellExpectation::text(*state, -1, 'F', r"^POR$"),
                ]
            })
            .collect();
        config.date_strategy = Some(DateStrategy::StartEndCells {
            start: Coord::new("CT", -1, 'G'),
            end: Coord::new("CT", -1, 'H'),
            pattern: None,
        });
        HudsonGas { config }
    }
}

impl Default for HudsonGas {
    fn default() -> Self {
        Self::new()
    }
}

impl SupplierAdapter for HudsonGas {
    fn config(&self) -> &AdapterConfig {
        &self.config
    }

    fn extract<'p>(&'p self, ctx: ParseContext<'p>) -> Result<QuoteStream<'p>, RatesheetError> {
        let window = ctx.window()?;
        let mut stream: QuoteStream<'p> = Box::new(std::iter::empty());
        for state in STATES {
            let height = ctx.doc.get_height(&state.into())?;
            let per_sheet = stream_rows(height, move |row| {
                if is_blank_row(&ctx, state, row)? {
                    return Ok(vec![]);
                }
                let utility = text_at(&ctx, state, row, 'A')?;
                // Sections within a sheet repeat the header line; skip it.
                if utility == "Utility" {
                    return Ok(vec![]);
                }
                let rate_code = text_at(&ctx, state, row, 'B')?;
                let start_month = match ctx.doc.get(state, row, 'C', &[CellKind::DateTime])? {
                    CellValue::DateTime(dt) => dt.date(),
                    other => {
                        return Err(RatesheetError::validation(format!(
                            "sheet '{state}' row {row}: start month has type {}",
                            other.kind()
                        )));
                    }
                };
                let (start_from, start_until) = month_window(start_month);
                let term_months = int_at(&ctx, state, row, 'D')? as u32;
                let price = decimal_at(&ctx, state, row, 'E')?;
                let por = match text_at(&ctx, state, row, 'F')?.as_str() {
                    "Y" => true,
                    "N" => false,
                    other => {
                        return Err(RatesheetError::validation(format!(
                            "sheet '{state}' row {row}: POR code '{other}' is not one of Y, N"
                        )));
                    }
                };

                let alias = format!("{state}-{utility}-{rate_code}");
                let ids = ctx.resolver.ids_for_alias(&alias);
                Ok(vec![Quote {
                    start_from,
                    start_until,
                    term_months,
                    valid_from: window.valid_from,
                    valid_until: window.valid_until,
                    volume_min: rust_decimal::Decimal::ZERO,
                    volume_limit: None,
                    rate_class_alias: alias,
                    rate_class_ids: ids,
                    purchase_of_receivables: por,
                    price,
                    source_ref: Some(format!(
                        "{}!{state} row {row}",
                        ctx.file_name.unwrap_or("<memory>")
                    )),
                }])
            });
            stream = Box::new(stream.chain(per_sheet));
        }
        Ok(stream)
    }
}
