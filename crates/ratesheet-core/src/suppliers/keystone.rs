//! Keystone Power fixed-price electric matrix.
//!
//! Keystone displays prices with its broker fee baked in; the fee is
//! subtracted on extraction. The product column is a closed one-letter
//! code: F (fixed, priced here) or V (variable, never priced on the
//! matrix). Any other code is a malformed file.

use rust_decimal::Decimal;

use crate::dates::{add_months, month_window, DateStrategy};
use crate::error::RatesheetError;
use crate::parser::{
    stream_rows, AdapterConfig, CellExpectation, ParseContext, QuoteStream, SupplierAdapter,
};
use crate::quote::Quote;
use crate::reader::{Coord, SourceFormat};
use crate::suppliers::{decimal_at, int_at, is_blank_row, text_at};
use crate::units::EnergyUnit;

const SHEET: &str = "Fixed Price Matrix";

/// $/kWh fee Keystone adds to every displayed price.
fn broker_fee() -> Decimal {
    Decimal::new(5, 3) // 0.005
}

pub struct KeystonePower {
    config: AdapterConfig,
}

impl KeystonePower {
    pub fn new() -> Self {
        let mut config =
            AdapterConfig::new(SourceFormat::Xlsx, EnergyUnit::Kwh, EnergyUnit::Kwh);
        config.expected_sheets = vec![SHEET.to_string()];
        config.expectations = vec![
            CellExpectation::text(SHEET, -1, 'A', r"^State$"),
            CellExpectation::text(SHEET, -1, 'C', r"^Product$"),
            CellExpectation::text(SHEET, -1, 'E', r"(?i)price"),
        ];
        config.date_strategy = Some(DateStrategy::SingleCell {
            coord: Coord::new(SHEET, -1, 'G'),
            pattern: None,
        });
        KeystonePower { config }
    }
}

impl Default for KeystonePower {
    fn default() -> Self {
        Self::new()
    }
}

impl SupplierAdapter for KeystonePower {
    fn config(&self) -> &AdapterConfig {
        &self.config
    }

    fn extract<'p>(&'p self, ctx: ParseContext<'p>) -> Result<QuoteStream<'p>, RatesheetError> {
        let height = ctx.doc.get_height(&SHEET.into())?;
        let window = ctx.window()?;
        let (start_from, start_until) = month_window(add_months(window.valid_from, 1));
        Ok(stream_rows(height, move |row| {
            if is_blank_row(&ctx, SHEET, row)? {
                return Ok(vec![]);
            }
            let product = text_at(&ctx, SHEET, row, 'C')?;
            match product.as_str() {
                "F" => {}
                // Variable products appear on the sheet but are never
                // matrix-priced.
                "V" => return Ok(vec![]),
                other => {
                    return Err(RatesheetError::validation(format!(
                        "row {row}: product code '{other}' is not one of F, V"
                    )));
                }
            }
            let state = text_at(&ctx, SHEET, row, 'A')?;
            let utility = text_at(&ctx, SHEET, row, 'B')?;
            let term_months = int_at(&ctx, SHEET, row, 'D')? as u32;
            let displayed = decimal_at(&ctx, SHEET, row, 'E')?;
            let price = displayed - broker_fee();
            if price <= Decimal::ZERO {
                return Err(RatesheetError::validation(format!(
                    "row {row}: displayed price {displayed} does not cover the broker fee"
                )));
            }
            let alias = format!("{state}-{utility}");
            let ids = ctx.resolver.ids_for_alias(&alias);
            Ok(vec![Quote {
                start_from,
                start_until,
                term_months,
                valid_from: window.valid_from,
                valid_until: window.valid_until,
                volume_min: Decimal::ZERO,
                volume_limit: None,
                rate_class_alias: alias,
                rate_class_ids: ids,
                purchase_of_receivables: true,
                price,
                source_ref: Some(format!(
                    "{}!{SHEET} row {row}",
                    ctx.file_name.unwrap_or("<memory>")
                )),
            }])
        }))
    }
}
