//! Common domain types for the market board.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Canonical item identifier, as resolved by an external item lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub u32);

impl ItemId {
    /// The raw numeric identifier.
    pub fn get(self) -> u32 {
        self.0
    }
}

impl From<u32> for ItemId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Inclusive price band used to count listings at query time.
///
/// A `0..=0` band marks a server the caller has not selected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PriceRange {
    /// Lowest accepted price per unit
    pub min_price: u64,
    /// Highest accepted price per unit
    pub max_price: u64,
}

impl PriceRange {
    /// Create a new price band.
    pub fn new(min_price: u64, max_price: u64) -> Self {
        Self {
            min_price,
            max_price,
        }
    }

    /// Check if a price falls inside the band, bounds included.
    ///
    /// An inverted band (`min > max`) contains nothing.
    pub fn contains(&self, price: u64) -> bool {
        self.min_price <= price && price <= self.max_price
    }

    /// Check if the band is inverted.
    pub fn is_inverted(&self) -> bool {
        self.min_price > self.max_price
    }

    /// Check if the caller selected this server at all.
    pub fn is_selected(&self) -> bool {
        !(self.min_price == 0 && self.max_price == 0)
    }
}

/// Default servers offered for price checks.
pub const DEFAULT_SERVERS: &[&str] = &["Aether", "Crystal", "Dynamis", "Primal"];

/// Per-server price bands supplied by the caller for one price check.
///
/// These are plain input; the cache never stores or persists them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceFilters {
    ranges: BTreeMap<String, PriceRange>,
}

impl PriceFilters {
    /// Create an empty filter set.
    pub fn new() -> Self {
        Self {
            ranges: BTreeMap::new(),
        }
    }

    /// Set the band for a server, replacing any previous band.
    pub fn with_range(mut self, server: impl Into<String>, range: PriceRange) -> Self {
        self.set_range(server, range);
        self
    }

    /// Set the band for a server in place. Surrounding whitespace in the
    /// server name is ignored.
    pub fn set_range(&mut self, server: impl Into<String>, range: PriceRange) {
        let server = server.into();
        let server = match server.trim() {
            trimmed if trimmed.len() == server.len() => server,
            trimmed => trimmed.to_string(),
        };
        self.ranges.insert(server, range);
    }

    /// The band configured for a server.
    pub fn range(&self, server: &str) -> Option<PriceRange> {
        self.ranges.get(server).copied()
    }

    /// Servers whose band is not `0..=0`, in name order.
    pub fn selected_servers(&self) -> Vec<String> {
        self.selected().map(|(server, _)| server.to_string()).collect()
    }

    /// Selected servers paired with their bands.
    pub fn selected(&self) -> impl Iterator<Item = (&str, PriceRange)> {
        self.ranges
            .iter()
            .filter(|(_, range)| range.is_selected())
            .map(|(server, range)| (server.as_str(), *range))
    }

    /// All configured servers, selected or not.
    pub fn iter(&self) -> impl Iterator<Item = (&str, PriceRange)> {
        self.ranges.iter().map(|(server, range)| (server.as_str(), *range))
    }
}

impl Default for PriceFilters {
    /// Every default server, none of them selected.
    fn default() -> Self {
        DEFAULT_SERVERS
            .iter()
            .fold(Self::new(), |filters, server| {
                filters.with_range(*server, PriceRange::default())
            })
    }
}
