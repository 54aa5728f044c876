pub mod addressing;
pub mod dates;
pub mod error;
pub mod parser;
pub mod quote;
pub mod reader;
pub mod suppliers;
pub mod units;
pub mod volume;

use error::RatesheetError;
use parser::MatrixParser;
use quote::{Quote, RateClassResolver};
use suppliers::{adapter_for, SupplierId};

/// Main API entry point: run one supplier file through the full
/// load -> validate -> extract pipeline and collect every quote.
///
/// The first bad row aborts the whole file; callers that want to keep
/// going past row errors drive [`MatrixParser`] themselves and handle
/// each `Result` item from the quote stream.
pub fn parse_matrix(
    bytes: &[u8],
    file_name: Option<&str>,
    supplier: SupplierId,
    resolver: Box<dyn RateClassResolver>,
) -> Result<Vec<Quote>, RatesheetError> {
    let mut parser = MatrixParser::new(adapter_for(supplier), resolver);
    parser.load(bytes, file_name)?;
    parser.validate()?;
    // Drain the stream before the parser goes out of scope; the quote
    // iterator borrows it.
    let mut quotes = Vec::new();
    for quote in parser.extract_quotes()? {
        quotes.push(quote?);
    }
    Ok(quotes)
}
