//! Atlantic Power PDF-derived matrix.
//!
//! Atlantic publishes its sheet as a PDF; a collaborator extracts
//! positioned text spans (serialized as JSON) and the preprocessing
//! hook normalizes them into row/column form before the ordinary grid
//! walk. Atlantic quotes New York utilities only.

use crate::dates::{add_months, month_window, DatePattern, DateStrategy};
use crate::error::RatesheetError;
use crate::parser::{
    stream_rows, AdapterConfig, CellExpectation, ParseContext, Prepared, QuoteStream,
    SupplierAdapter,
};
use crate::quote::Quote;
use crate::reader::positioned::PositionedDocument;
use crate::reader::{Coord, SourceFormat};
use crate::suppliers::{decimal_at, int_at, is_blank_row, text_at};
use crate::units::EnergyUnit;

const SHEET: &str = "Page 1";
/// Spans within this many points of each other vertically belong to
/// one printed line.
const ROW_TOLERANCE: f64 = 3.0;

pub struct AtlanticPower {
    config: AdapterConfig,
}

impl AtlanticPower {
    pub fn new() -> Self {
        let mut config =
            AdapterConfig::new(SourceFormat::Positioned, EnergyUnit::Kwh, EnergyUnit::Kwh);
        config.expected_sheets = vec![SHEET.to_string()];
        config.expectations = vec![
            CellExpectation::text(SHEET, -1, 'A', r"^Utility$"),
            CellExpectation::text(SHEET, -1, 'B', r"^Term$"),
            CellExpectation::text(SHEET, -1, 'C', r"^Price$"),
        ];
        config.date_strategy = Some(DateStrategy::SingleCell {
            coord: Coord::new(SHEET, -1, 'D'),
            pattern: Some(DatePattern::new(r"as of (\d+/\d+/\d+)", "%m/%d/%Y")),
        });
        AtlanticPower { config }
    }
}

impl Default for AtlanticPower {
    fn default() -> Self {
        Self::new()
    }
}

impl SupplierAdapter for AtlanticPower {
    fn config(&self) -> &AdapterConfig {
        &self.config
    }

    fn preprocess(
        &self,
        bytes: Vec<u8>,
        _file_name: Option<&str>,
    ) -> Result<Prepared, RatesheetError> {
        let positioned = PositionedDocument::from_json(&bytes)?;
        Ok(Prepared::Document(positioned.into_document(ROW_TOLERANCE)?))
    }

    fn extract<'p>(&'p self, ctx: ParseContext<'p>) -> Result<QuoteStream<'p>, RatesheetError> {
        let height = ctx.doc.get_height(&SHEET.into())?;
        let window = ctx.window()?;
        let (start_from, start_until) = month_window(add_months(window.valid_from, 1));
        Ok(stream_rows(height, move |row| {
            if is_blank_row(&ctx, SHEET, row)? {
                return Ok(vec![]);
            }
            let utility = text_at(&ctx, SHEET, row, 'A')?;
            let term_months = int_at(&ctx, SHEET, row, 'B')? as u32;
            let price = decimal_at(&ctx, SHEET, row, 'C')?;
            let alias = format!("NY-{utility}");
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
