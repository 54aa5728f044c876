use std::path::PathBuf;

use ratesheet_core::error::RatesheetError;
use ratesheet_core::quote::InMemoryResolver;
use ratesheet_core::suppliers::SupplierId;

use crate::output;

pub fn run(
    input_file: PathBuf,
    supplier: &str,
    aliases: Option<PathBuf>,
    output_format: &str,
    output_file: Option<PathBuf>,
) -> Result<(), RatesheetError> {
    let supplier: SupplierId = supplier.parse()?;
    let bytes = std::fs::read(&input_file)?;
    let resolver = match aliases {
        Some(path) => InMemoryResolver::from_json(&std::fs::read(&path)?)?,
        None => InMemoryResolver::default(),
    };
    let file_name = input_file.file_name().and_then(|n| n.to_str());
    let quotes = ratesheet_core::parse_matrix(&bytes, file_name, supplier, Box::new(resolver))?;

    match output_file {
        Some(path) => {
            // Always write JSON when saving to file
            let json = serde_json::to_string_pretty(&quotes)?;
            std::fs::write(&path, json)?;
            eprintln!("Parsed {} quote(s), written to {}", quotes.len(), path.display());
        }
        None => match output_format {
            "json" => output::json::print(&quotes)?,
            _ => println!("{}", output::table::format_quotes(&quotes)),
        },
    }

    Ok(())
}
