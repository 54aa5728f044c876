//! Supplier adapters: one module per supplier layout.
//!
//! Each adapter is a closed variant behind [`SupplierAdapter`],
//! selected by [`SupplierId`] at dispatch time. The adapter owns that
//! supplier's coordinates, expected header text, units, and tier/term
//! layout; everything else comes from the framework.

pub mod atlantic;
pub mod clearview;
pub mod crest;
pub mod harbor;
pub mod hudson;
pub mod keystone;
pub mod liberty;
pub mod meridian;
pub mod pinnacle;
pub mod summit;
pub mod titan;
pub mod verdant;

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;

use crate::error::RatesheetError;
use crate::parser::{ParseContext, SupplierAdapter};
use crate::reader::{CellKind, CellValue, SheetRef, SourceFormat};

/// The closed set of supplier layouts this build understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SupplierId {
    Clearview,
    Hudson,
    Summit,
    Liberty,
    Atlantic,
    Keystone,
    Meridian,
    Crest,
    Pinnacle,
    Harbor,
    Verdant,
    Titan,
}

impl SupplierId {
    pub fn all() -> &'static [SupplierId] {
        &[
            SupplierId::Clearview,
            SupplierId::Hudson,
            SupplierId::Summit,
            SupplierId::Liberty,
            SupplierId::Atlantic,
            SupplierId::Keystone,
            SupplierId::Meridian,
            SupplierId::Crest,
            SupplierId::Pinnacle,
            SupplierId::Harbor,
            SupplierId::Verdant,
            SupplierId::Titan,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            SupplierId::Clearview => "clearview",
            SupplierId::Hudson => "hudson",
            SupplierId::Summit => "summit",
            SupplierId::Liberty => "liberty",
            SupplierId::Atlantic => "atlantic",
            SupplierId::Keystone => "keystone",
            SupplierId::Meridian => "meridian",
            SupplierId::Crest => "crest",
            SupplierId::Pinnacle => "pinnacle",
            SupplierId::Harbor => "harbor",
            SupplierId::Verdant => "verdant",
            SupplierId::Titan => "titan",
        }
    }

    pub fn format(&self) -> SourceFormat {
        adapter_for(*self).config().format
    }
}

impl fmt::Display for SupplierId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for SupplierId {
    type Err = RatesheetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SupplierId::all()
            .iter()
            .find(|id| id.name() == s.to_lowercase())
            .copied()
            .ok_or_else(|| RatesheetError::UnknownSupplier(s.to_string()))
    }
}

/// Build the adapter for a supplier.
pub fn adapter_for(id: SupplierId) -> Box<dyn SupplierAdapter> {
    match id {
        SupplierId::Clearview => Box::new(clearview::ClearviewPower::new()),
        SupplierId::Hudson => Box::new(hudson::HudsonGas::new()),
        SupplierId::Summit => Box::new(summit::SummitEnergy::new()),
        SupplierId::Liberty => Box::new(liberty::LibertyRate::new()),
        SupplierId::Atlantic => Box::new(atlantic::AtlanticPower::new()),
        SupplierId::Keystone => Box::new(keystone::KeystonePower::new()),
        SupplierId::Meridian => Box::new(meridian::MeridianSolutions::new()),
        SupplierId::Crest => Box::new(crest::CrestGas::new()),
        SupplierId::Pinnacle => Box::new(pinnacle::PinnacleEnergy::new()),
        SupplierId::Harbor => Box::new(harbor::HarborGas::new()),
        SupplierId::Verdant => Box::new(verdant::VerdantPower::new()),
        SupplierId::Titan => Box::new(titan::TitanSupply::new()),
    }
}

// Shared per-cell helpers so adapters stay declarative. Each returns a
// validation error naming the coordinate on any mismatch.

pub(crate) fn text_at(
    ctx: &ParseContext<'_>,
    sheet: impl Into<SheetRef>,
    row: i64,
    col: impl Into<crate::addressing::ColumnRef>,
) -> Result<String, RatesheetError> {
    let value = ctx.doc.get(sheet, row, col, &[CellKind::Text])?;
    Ok(value.as_text().unwrap_or_default().to_string())
}

pub(crate) fn decimal_at(
    ctx: &ParseContext<'_>,
    sheet: impl Into<SheetRef>,
    row: i64,
    col: impl Into<crate::addressing::ColumnRef>,
) -> Result<Decimal, RatesheetError> {
    let value = ctx.doc.get(sheet, row, col, &[CellKind::Float, CellKind::Int])?;
    Ok(value.as_decimal().unwrap_or_default())
}

pub(crate) fn int_at(
    ctx: &ParseContext<'_>,
    sheet: impl Into<SheetRef>,
    row: i64,
    col: impl Into<crate::addressing::ColumnRef>,
) -> Result<i64, RatesheetError> {
    let value = ctx.doc.get(sheet, row, col, &[CellKind::Int])?;
    Ok(value.as_i64().unwrap_or_default())
}

/// A row whose leading cell is empty is padding between blocks or
/// trailing whitespace; adapters skip it explicitly.
pub(crate) fn is_blank_row(
    ctx: &ParseContext<'_>,
    sheet: impl Into<SheetRef>,
    row: i64,
) -> Result<bool, RatesheetError> {
    let value = ctx.doc.get(sheet, row, 0usize, &[
        CellKind::Text,
        CellKind::Int,
        CellKind::Float,
        CellKind::DateTime,
        CellKind::Empty,
    ])?;
    Ok(matches!(value, CellValue::Empty))
}
