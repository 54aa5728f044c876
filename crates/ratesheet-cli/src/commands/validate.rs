use std::path::PathBuf;

use ratesheet_core::error::RatesheetError;
use ratesheet_core::parser::MatrixParser;
use ratesheet_core::quote::InMemoryResolver;
use ratesheet_core::suppliers::{adapter_for, SupplierId};

pub fn run(input_file: PathBuf, supplier: &str) -> Result<(), RatesheetError> {
    let supplier: SupplierId = supplier.parse()?;
    let bytes = std::fs::read(&input_file)?;
    let file_name = input_file.file_name().and_then(|n| n.to_str());

    let mut parser = MatrixParser::new(adapter_for(supplier), Box::new(InMemoryResolver::default()));
    parser.load(&bytes, file_name)?;
    parser.validate()?;

    println!("{} is a valid {supplier} sheet.", input_file.display());
    Ok(())
}
