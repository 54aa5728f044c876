use ratesheet_core::error::RatesheetError;
use ratesheet_core::suppliers::SupplierId;

pub fn list() -> Result<(), RatesheetError> {
    println!("Supported suppliers:\n");
    for id in SupplierId::all() {
        println!("  {:<12} {}", id.name(), id.format());
    }
    Ok(())
}
