//! Titan Supply rolling electric matrix.
//!
//! Titan re-prices rows on different days and stamps each row with its
//! own price date, so there is no file-level validity window; each row
//! carries a one-day window of its own.

use crate::dates::{add_months, month_window, ValidityWindow};
use crate::error::RatesheetError;
use crate::parser::{
    stream_rows, AdapterConfig, CellExpectation, ParseContext, QuoteStream, SupplierAdapter,
};
use crate::quote::Quote;
use crate::reader::{CellKind, CellValue, SourceFormat};
use crate::suppliers::{decimal_at, int_at, is_blank_row, text_at};
use crate::units::EnergyUnit;

const SHEET: &str = "Matrix Pricing";

pub struct TitanSupply {
    config: AdapterConfig,
}

impl TitanSupply {
    pub fn new() -> Self {
        let mut config =
            AdapterConfig::new(SourceFormat::Xlsx, EnergyUnit::Kwh, EnergyUnit::Kwh);
        config.expected_sheets = vec![SHEET.to_string()];
        config.expectations = vec![
            CellExpectation::text(SHEET, -1, 'A', r"^State$"),
            CellExpectation::text(SHEET, -1, 'B', r"^Utility$"),
            CellExpectation::text(SHEET, -1, 'C', r"(?i)price date"),
        ];
        TitanSupply { config }
    }
}

impl Default for TitanSupply {
    fn default() -> Self {
        Self::new()
    }
}

impl SupplierAdapter for TitanSupply {
    fn config(&self) -> &AdapterConfig {
        &self.config
    }

    fn extract<'p>(&'p self, ctx: ParseContext<'p>) -> Result<QuoteStream<'p>, RatesheetError> {
        let height = ctx.doc.get_height(&SHEET.into())?;
        Ok(stream_rows(height, move |row| {
            if is_blank_row(&ctx, SHEET, row)? {
                return Ok(vec![]);
            }
            let state = text_at(&ctx, SHEET, row, 'A')?;
            let utility = text_at(&ctx, SHEET, row, 'B')?;
            let priced_on = match ctx.doc.get(SHEET, row, 'C', &[CellKind::DateTime])? {
                CellValue::DateTime(dt) => dt.date(),
                other => {
                    return Err(RatesheetError::validation(format!(
                        "row {row}: price date has type {}",
                        other.kind()
                    )));
                }
            };
            let window = ValidityWindow::single_day(priced_on);
            let (start_from, start_until) = month_window(add_months(priced_on, 1));
            let term_months = int_at(&ctx, SHEET, row, 'D')? as u32;
            let price = decimal_at(&ctx, SHEET, row, 'E')?;
            let alias = format!("{state}-{utility}");
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
