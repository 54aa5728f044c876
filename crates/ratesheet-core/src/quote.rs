use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One normalized priced quote: the unit of output every adapter
/// produces, ready for bulk insertion by the intake collaborator. The
/// framework never persists these itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    /// Service period: when the priced contract term would begin
    /// (inclusive / exclusive).
    pub start_from: NaiveDate,
    pub start_until: NaiveDate,
    pub term_months: u32,
    /// Validity window: when this price is considered current
    /// (inclusive / exclusive).
    pub valid_from: NaiveDate,
    pub valid_until: NaiveDate,
    /// Usage band floor (a missing floor extracts as 0).
    pub volume_min: Decimal,
    /// Usage band ceiling; `None` means no ceiling.
    pub volume_limit: Option<Decimal>,
    /// Supplier-specific composite key identifying the customer class.
    pub rate_class_alias: String,
    /// Resolved internal ids; `[None]` when the alias is unrecognized,
    /// so the quote is still emitted rather than dropped.
    pub rate_class_ids: Vec<Option<i64>>,
    pub purchase_of_receivables: bool,
    pub price: Decimal,
    /// Free-text pointer back to the source cell, for tracing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_ref: Option<String>,
}

/// External lookup from a supplier's rate-class alias to internal
/// rate-class ids. The mapping is owned elsewhere; the framework only
/// consumes it, pre-loaded once per parser construction.
pub trait RateClassResolver {
    /// Zero, one, or many ids for an alias. An unrecognized alias must
    /// return `[None]`, never an empty list, so no quote is dropped.
    fn ids_for_alias(&self, alias: &str) -> Vec<Option<i64>>;
}

/// Map-backed resolver for the CLI and tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryResolver {
    aliases: HashMap<String, Vec<i64>>,
}

impl InMemoryResolver {
    pub fn new(aliases: HashMap<String, Vec<i64>>) -> Self {
        InMemoryResolver { aliases }
    }

    /// Load from a JSON object of `{"alias": [id, ...]}`.
    pub fn from_json(bytes: &[u8]) -> Result<Self, crate::error::RatesheetError> {
        let aliases: HashMap<String, Vec<i64>> = serde_json::from_slice(bytes)?;
        Ok(InMemoryResolver { aliases })
    }
}

impl RateClassResolver for InMemoryResolver {
    fn ids_for_alias(&self, alias: &str) -> Vec<Option<i64>> {
        match self.aliases.get(alias) {
            Some(ids) if !ids.is_empty() => ids.iter().copied().map(Some).collect(),
            _ => vec![None],
        }
    }
}
