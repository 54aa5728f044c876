//! Volume tier extraction and reconciliation.
//!
//! A matrix row prices a band of annual usage ("0-100", "101-500",
//! "500+" and so on). Suppliers print inclusive and exclusive
//! boundaries inconsistently, so an opt-in "fudge" snaps a boundary
//! that is off by exactly one from a multiple of a block size back to
//! that multiple. A run of tiers belonging to one quote row must be
//! contiguous: each tier's ceiling is the next tier's floor.

use std::fmt;

use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::RatesheetError;
use crate::reader::{CellKind, Coord, Document};
use crate::units::{convert, EnergyUnit};

/// A usage band in the adapter's target unit. `low: None` means "no
/// floor" (treated as 0 on extraction); `high: None` means "no
/// ceiling".
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeRange {
    pub low: Option<Decimal>,
    pub high: Option<Decimal>,
}

impl VolumeRange {
    pub fn new(low: Option<Decimal>, high: Option<Decimal>) -> Self {
        VolumeRange { low, high }
    }

    pub fn low_or_zero(&self) -> Decimal {
        self.low.unwrap_or(Decimal::ZERO)
    }
}

impl fmt::Display for VolumeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.low, self.high) {
            (Some(low), Some(high)) => write!(f, "[{low}, {high})"),
            (Some(low), None) => write!(f, "[{low}, no ceiling)"),
            (None, Some(high)) => write!(f, "[no floor, {high})"),
            (None, None) => write!(f, "[no floor, no ceiling)"),
        }
    }
}

/// Per-call knobs for [`extract_range`].
#[derive(Debug, Clone, Copy)]
pub struct VolumeOptions {
    pub source_unit: EnergyUnit,
    pub target_unit: EnergyUnit,
    /// Snap an off-by-one low boundary to the nearest block multiple.
    pub fudge_low: bool,
    /// Snap an off-by-one high boundary to the nearest block multiple.
    pub fudge_high: bool,
    /// Block size the fudge snaps to, in the target unit.
    pub block: u32,
}

impl VolumeOptions {
    pub fn new(source_unit: EnergyUnit, target_unit: EnergyUnit) -> Self {
        VolumeOptions {
            source_unit,
            target_unit,
            fudge_low: false,
            fudge_high: false,
            block: 10,
        }
    }

    pub fn fudged(mut self) -> Self {
        self.fudge_low = true;
        self.fudge_high = true;
        self
    }
}

/// Extract a volume range from a cell using a regex with named groups
/// `low` and/or `high`. Only `high` named means "below X" (no floor);
/// only `low` named means "above X" (no ceiling). Values convert from
/// the source unit to the target unit before fudging.
pub fn extract_range(
    doc: &Document,
    coord: &Coord,
    pattern: &Regex,
    opts: &VolumeOptions,
) -> Result<VolumeRange, RatesheetError> {
    let names: Vec<&str> = pattern.capture_names().flatten().collect();
    if !names.contains(&"low") && !names.contains(&"high") {
        return Err(RatesheetError::validation(format!(
            "volume pattern /{pattern}/ names neither 'low' nor 'high' group"
        )));
    }
    let value = doc.get(coord.sheet.clone(), coord.row, coord.col, &[CellKind::Text])?;
    let text = value.as_text().unwrap_or_default();
    let captures = pattern.captures(text).ok_or_else(|| {
        RatesheetError::validation(format!(
            "cell at {coord}: '{text}' does not match volume pattern /{pattern}/"
        ))
    })?;

    let low = captures
        .name("low")
        .map(|m| parse_boundary(m.as_str(), coord))
        .transpose()?;
    let high = captures
        .name("high")
        .map(|m| parse_boundary(m.as_str(), coord))
        .transpose()?;

    let low = low
        .map(|v| convert(v, opts.source_unit, opts.target_unit))
        .transpose()?
        .map(|v| if opts.fudge_low { fudge(v, opts.block) } else { v });
    let high = high
        .map(|v| convert(v, opts.source_unit, opts.target_unit))
        .transpose()?
        .map(|v| if opts.fudge_high { fudge(v, opts.block) } else { v });

    Ok(VolumeRange { low, high })
}

fn parse_boundary(s: &str, coord: &Coord) -> Result<Decimal, RatesheetError> {
    s.replace(',', "").trim().parse::<Decimal>().map_err(|e| {
        RatesheetError::validation(format!(
            "cell at {coord}: volume boundary '{s}' is not a number: {e}"
        ))
    })
}

/// Snap a boundary that is exactly one off a multiple of `block` to
/// that multiple; any other value passes through unchanged. Suppliers
/// print "151" meaning "everything above 150" often enough that
/// adapters opt into this per boundary.
pub fn fudge(value: Decimal, block: u32) -> Decimal {
    let block = Decimal::from(block);
    let rem = value % block;
    if rem == Decimal::ONE {
        value - Decimal::ONE
    } else if rem == block - Decimal::ONE {
        value + Decimal::ONE
    } else {
        value
    }
}

/// Assert a run of ranges belonging to one quote row is contiguous:
/// each ceiling equals the next floor. A tier block may restart at 0
/// when the caller allows it.
pub fn check_contiguous(
    ranges: &[VolumeRange],
    allow_restart_at_zero: bool,
) -> Result<(), RatesheetError> {
    for pair in ranges.windows(2) {
        let (current, next) = (&pair[0], &pair[1]);
        let next_low = next.low_or_zero();
        if allow_restart_at_zero && next_low.is_zero() {
            continue;
        }
        match current.high {
            Some(high) if high == next_low => {}
            _ => {
                return Err(RatesheetError::validation(format!(
                    "volume ranges not contiguous: {current} is followed by {next}"
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::{CellValue, Sheet};
    use rust_decimal_macros::dec;

    fn doc(cell: &str) -> Document {
        Document::from_sheets(vec![Sheet::new(
            "S",
            vec![vec![CellValue::Text(cell.into())]],
        )])
    }

    fn coord() -> Coord {
        Coord::new(0, -1, 'A')
    }

    fn kwh_opts() -> VolumeOptions {
        VolumeOptions::new(EnergyUnit::Kwh, EnergyUnit::Kwh)
    }

    fn range(low: Decimal, high: Decimal) -> VolumeRange {
        VolumeRange::new(Some(low), Some(high))
    }

    #[test]
    fn both_groups() {
        let re = Regex::new(r"(?P<low>\d+)\s*-\s*(?P<high>\d+)").unwrap();
        let r = extract_range(&doc("75-149"), &coord(), &re, &kwh_opts()).unwrap();
        assert_eq!(r, range(dec!(75), dec!(149)));
    }

    #[test]
    fn low_only_means_no_ceiling() {
        let re = Regex::new(r"(?P<low>\d+)\+").unwrap();
        let r = extract_range(&doc("500+"), &coord(), &re, &kwh_opts()).unwrap();
        assert_eq!(r, VolumeRange::new(Some(dec!(500)), None));
    }

    #[test]
    fn high_only_means_no_floor() {
        let re = Regex::new(r"under (?P<high>\d+)").unwrap();
        let r = extract_range(&doc("under 100"), &coord(), &re, &kwh_opts()).unwrap();
        assert_eq!(r, VolumeRange::new(None, Some(dec!(100))));
        assert_eq!(r.low_or_zero(), Decimal::ZERO);
    }

    #[test]
    fn unnamed_groups_rejected() {
        let re = Regex::new(r"(\d+)-(\d+)").unwrap();
        assert!(extract_range(&doc("75-149"), &coord(), &re, &kwh_opts()).is_err());
    }

    #[test]
    fn unit_conversion_applies() {
        let re = Regex::new(r"(?P<low>[\d.]+)\s*-\s*(?P<high>[\d.]+)").unwrap();
        let mut opts = VolumeOptions::new(EnergyUnit::Mwh, EnergyUnit::Kwh);
        opts.block = 10;
        let r = extract_range(&doc("0.1-0.5"), &coord(), &re, &opts).unwrap();
        assert_eq!(r, range(dec!(100), dec!(500)));
    }

    #[test]
    fn fudge_snaps_off_by_one_only() {
        assert_eq!(fudge(dec!(151), 10), dec!(150));
        assert_eq!(fudge(dec!(149), 10), dec!(150));
        assert_eq!(fudge(dec!(150), 10), dec!(150));
        assert_eq!(fudge(dec!(155), 10), dec!(155));
        assert_eq!(fudge(dec!(152), 10), dec!(152));
    }

    #[test]
    fn fudge_respects_block_size() {
        assert_eq!(fudge(dec!(1001), 1000), dec!(1000));
        assert_eq!(fudge(dec!(999), 1000), dec!(1000));
        assert_eq!(fudge(dec!(990), 1000), dec!(990));
    }

    #[test]
    fn fudge_toggles_are_independent() {
        let re = Regex::new(r"(?P<low>\d+)\s*-\s*(?P<high>\d+)").unwrap();
        let mut opts = kwh_opts();
        opts.fudge_low = true;
        let r = extract_range(&doc("151-299"), &coord(), &re, &opts).unwrap();
        // low snapped, high untouched
        assert_eq!(r, range(dec!(150), dec!(299)));
    }

    #[test]
    fn contiguous_run_passes() {
        let ranges = [range(dec!(0), dec!(75)), range(dec!(75), dec!(149)), range(dec!(149), dec!(500))];
        assert!(check_contiguous(&ranges, false).is_ok());
    }

    #[test]
    fn gap_fails_naming_both_ranges() {
        let ranges = [range(dec!(75), dec!(149)), range(dec!(151), dec!(500))];
        let err = check_contiguous(&ranges, false).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("149"));
        assert!(msg.contains("151"));
    }

    #[test]
    fn restart_at_zero_needs_permission() {
        let ranges = [range(dec!(150), dec!(500)), range(dec!(0), dec!(150))];
        assert!(check_contiguous(&ranges, true).is_ok());
        assert!(check_contiguous(&ranges, false).is_err());
    }

    #[test]
    fn open_ceiling_must_be_last() {
        let ranges = [
            VolumeRange::new(Some(dec!(500)), None),
            range(dec!(600), dec!(700)),
        ];
        assert!(check_contiguous(&ranges, false).is_err());
    }
}
