//! Verdant Power forward-start electric matrix.
//!
//! Unlike the daily matrices, each row names its own service start
//! month, so the sheet quotes several months ahead at once. Every
//! Verdant quote settles through purchase of receivables.

use crate::dates::{month_window, DateStrategy};
use crate::error::RatesheetError;
use crate::parser::{
    stream_rows, AdapterConfig, CellExpectation, ParseContext, QuoteStream, SupplierAdapter,
};
use crate::quote::Quote;
use crate::reader::{CellKind, CellValue, Coord, SourceFormat};
use crate::suppliers::{decimal_at, int_at, is_blank_row, text_at};
use crate::units::EnergyUnit;

const SHEET: &str = "Forward Prices";

pub struct VerdantPower {
    config: AdapterConfig,
}

impl VerdantPower {
    pub fn new() -> Self {
        let mut config =
            AdapterConfig::new(SourceFormat::Xlsx, EnergyUnit::Kwh, EnergyUnit::Kwh);
        config.expected_sheets = vec![SHEET.to_string()];
        config.expectations = vec![
            CellExpectation::text(SHEET, -1, 'A', r"^State$"),
            CellExpectation::text(SHEET, -1, 'B', r"^Utility$"),
            CellExpectation::text(SHEET, -1, 'C', r"(?i)start month"),
        ];
        config.date_strategy = Some(DateStrategy::SingleCell {
            coord: Coord::new(SHEET, -1, 'F'),
            pattern: None,
        });
        VerdantPower { config }
    }
}

impl Default for VerdantPower {
    fn default() -> Self {
        Self::new()
    }
}

impl SupplierAdapter for VerdantPower {
    fn config(&self) -> &AdapterConfig {
        &self.config
    }

    fn extract<'p>(&'p self, ctx: ParseContext<'p>) -> Result<QuoteStream<'p>, RatesheetError> {
        let height = ctx.doc.get_height(&SHEET.into())?;
        let window = ctx.window()?;
        Ok(stream_rows(height, move |row| {
            if is_blank_row(&ctx, SHEET, row)? {
                return Ok(vec![]);
            }
            let state = text_at(&ctx, SHEET, row, 'A')?;
            let utility = text_at(&ctx, SHEET, row, 'B')?;
            let start_month = match ctx.doc.get(SHEET, row, 'C', &[CellKind::DateTime])? {
                CellValue::DateTime(dt) => dt.date(),
                other => {
                    return Err(RatesheetError::validation(format!(
                        "row {row}: start month has type {}",
                        other.kind()
                    )));
                }
            };
            let (start_from, start_until) = month_window(start_month);
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::MatrixParser;
    use crate::quote::InMemoryResolver;
    use crate::reader::{Document, Sheet};
    use crate::suppliers::{adapter_for, SupplierId};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.into())
    }

    fn dt(y: i32, m: u32, d: u32) -> CellValue {
        CellValue::DateTime(
            NaiveDate::from_ymd_opt(y, m, d)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
        )
    }

    fn sample_doc() -> Document {
        Document::from_sheets(vec![Sheet::new(
            SHEET,
            vec![
                vec![
                    text("State"),
                    text("Utility"),
                    text("Start Month"),
                    text("Term"),
                    text("Price"),
                    dt(2015, 5, 4),
                ],
                vec![
                    text("NY"),
                    text("ConEd"),
                    dt(2015, 7, 1),
                    CellValue::Int(12),
                    CellValue::Float(dec!(0.0812)),
                ],
                vec![
                    text("NY"),
                    text("ConEd"),
                    dt(2015, 10, 1),
                    CellValue::Int(12),
                    CellValue::Float(dec!(0.0834)),
                ],
            ],
        )])
    }

    fn parser() -> MatrixParser {
        MatrixParser::new(
            adapter_for(SupplierId::Verdant),
            Box::new(InMemoryResolver::default()),
        )
    }

    #[test]
    fn each_row_names_its_own_start_month() {
        let mut p = parser();
        p.load_document(sample_doc(), None);
        let quotes: Vec<Quote> = p.extract_quotes().unwrap().map(|q| q.unwrap()).collect();
        assert_eq!(quotes.len(), 2);
        assert_eq!(
            quotes[0].start_from,
            NaiveDate::from_ymd_opt(2015, 7, 1).unwrap()
        );
        assert_eq!(
            quotes[1].start_from,
            NaiveDate::from_ymd_opt(2015, 10, 1).unwrap()
        );
        assert_eq!(
            quotes[1].start_until,
            NaiveDate::from_ymd_opt(2015, 11, 1).unwrap()
        );
        assert!(quotes.iter().all(|q| q.purchase_of_receivables));
    }

    #[test]
    fn validity_still_comes_from_the_header_date() {
        let mut p = parser();
        p.load_document(sample_doc(), None);
        let quotes: Vec<Quote> = p.extract_quotes().unwrap().map(|q| q.unwrap()).collect();
        assert_eq!(
            quotes[0].valid_from,
            NaiveDate::from_ymd_opt(2015, 5, 4).unwrap()
        );
    }
}
