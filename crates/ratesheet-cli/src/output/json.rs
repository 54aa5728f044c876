use ratesheet_core::error::RatesheetError;
use ratesheet_core::quote::Quote;

pub fn print(quotes: &[Quote]) -> Result<(), RatesheetError> {
    let json = serde_json::to_string_pretty(quotes)?;
    println!("{json}");
    Ok(())
}
