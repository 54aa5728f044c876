use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::RatesheetError;

/// Energy units seen on supplier matrix sheets.
///
/// Electricity volumes are quoted in kWh/MWh/GWh, gas volumes in therms
/// and their multiples. Conversions never cross the two families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnergyUnit {
    Kwh,
    Mwh,
    Gwh,
    Therm,
    Dekatherm,
    Ccf,
    Mcf,
}

impl fmt::Display for EnergyUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EnergyUnit::Kwh => "kWh",
            EnergyUnit::Mwh => "MWh",
            EnergyUnit::Gwh => "GWh",
            EnergyUnit::Therm => "therm",
            EnergyUnit::Dekatherm => "Dth",
            EnergyUnit::Ccf => "Ccf",
            EnergyUnit::Mcf => "Mcf",
        };
        write!(f, "{s}")
    }
}

impl EnergyUnit {
    pub fn is_electric(&self) -> bool {
        matches!(self, EnergyUnit::Kwh | EnergyUnit::Mwh | EnergyUnit::Gwh)
    }

    pub fn is_gas(&self) -> bool {
        !self.is_electric()
    }

    /// Factor to the family base unit (kWh for electricity, therm for gas).
    fn base_factor(&self) -> Decimal {
        match self {
            EnergyUnit::Kwh => Decimal::ONE,
            EnergyUnit::Mwh => Decimal::from(1_000),
            EnergyUnit::Gwh => Decimal::from(1_000_000),
            EnergyUnit::Therm => Decimal::ONE,
            EnergyUnit::Dekatherm => Decimal::from(10),
            // Standard heating-value equivalents used on gas sheets.
            EnergyUnit::Ccf => Decimal::new(1037, 3),
            EnergyUnit::Mcf => Decimal::new(10370, 3),
        }
    }
}

/// Convert a volume between units of the same energy family.
pub fn convert(value: Decimal, from: EnergyUnit, to: EnergyUnit) -> Result<Decimal, RatesheetError> {
    if from == to {
        return Ok(value);
    }
    if from.is_electric() != to.is_electric() {
        return Err(RatesheetError::validation(format!(
            "cannot convert {from} to {to}: units belong to different energy families"
        )));
    }
    Ok(value * from.base_factor() / to.base_factor())
}
