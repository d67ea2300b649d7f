//! Listing records and their per-server aggregation.
//!
//! A fetch returns a flat list of [`Listing`]s. [`normalize`] groups them by
//! server, then by retainer, into an [`ItemAggregation`], which is the unit the
//! cache stores.
//!
//! Servers with no listings are absent from the aggregation rather than mapped
//! to an empty [`ServerAggregate`]. Whether an absent server was asked about is
//! answered by [`ItemAggregation::covers`].

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::types::{ItemId, PriceRange};

/// One market offer for an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Listing {
    /// Server (world or data centre) the listing is on.
    pub server: String,
    /// Retainer selling the item, unique per server within one snapshot.
    pub retainer: String,
    /// Price per unit in gil.
    pub price_per_unit: u64,
}

impl Listing {
    /// Create a new listing.
    pub fn new(server: impl Into<String>, retainer: impl Into<String>, price_per_unit: u64) -> Self {
        Self {
            server: server.into(),
            retainer: retainer.into(),
            price_per_unit,
        }
    }
}

/// Retainer to price mapping for one item on one server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ServerAggregate {
    prices: BTreeMap<String, u64>,
}

impl ServerAggregate {
    /// Create an empty aggregate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a retainer's price, replacing an earlier one.
    pub fn insert(&mut self, retainer: impl Into<String>, price_per_unit: u64) {
        self.prices.insert(retainer.into(), price_per_unit);
    }

    /// Price listed by a retainer.
    pub fn price_of(&self, retainer: &str) -> Option<u64> {
        self.prices.get(retainer).copied()
    }

    /// Number of retainers listing the item.
    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    /// Retainers and prices in retainer-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.prices.iter().map(|(retainer, price)| (retainer.as_str(), *price))
    }

    /// Cheapest price per unit on this server.
    pub fn min_price(&self) -> Option<u64> {
        self.prices.values().copied().min()
    }

    /// Most expensive price per unit on this server.
    pub fn max_price(&self) -> Option<u64> {
        self.prices.values().copied().max()
    }

    /// Count listings whose price is inside `range`, bounds included.
    pub fn count_in_range(&self, range: PriceRange) -> usize {
        self.prices.values().filter(|price| range.contains(**price)).count()
    }
}

impl<R: Into<String>> FromIterator<(R, u64)> for ServerAggregate {
    fn from_iter<I: IntoIterator<Item = (R, u64)>>(iter: I) -> Self {
        let mut aggregate = Self::new();
        for (retainer, price) in iter {
            aggregate.insert(retainer, price);
        }
        aggregate
    }
}

/// Per-server listings for a single item, as cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemAggregation {
    item_id: ItemId,
    servers: BTreeMap<String, ServerAggregate>,
    /// Servers the fetch asked for. Empty means no server filter was sent.
    requested: BTreeSet<String>,
}

impl ItemAggregation {
    /// Create an aggregation with no listings for the given requested servers.
    pub fn new<S: AsRef<str>>(item_id: ItemId, requested: &[S]) -> Self {
        Self {
            item_id,
            servers: BTreeMap::new(),
            requested: requested.iter().map(|s| s.as_ref().to_string()).collect(),
        }
    }

    /// Attach a server aggregate.
    ///
    /// Empty aggregates are kept as given, which lets callers build a
    /// "present but empty" server explicitly. [`normalize`] never does.
    pub fn with_server(mut self, server: impl Into<String>, aggregate: ServerAggregate) -> Self {
        self.servers.insert(server.into(), aggregate);
        self
    }

    pub fn item_id(&self) -> ItemId {
        self.item_id
    }

    /// Listings for one server, `None` if the server had none or was not fetched.
    pub fn server(&self, server: &str) -> Option<&ServerAggregate> {
        self.servers.get(server)
    }

    /// Servers with at least one entry, in name order.
    pub fn servers(&self) -> impl Iterator<Item = (&str, &ServerAggregate)> {
        self.servers.iter().map(|(name, aggregate)| (name.as_str(), aggregate))
    }

    /// Servers the fetch was restricted to. Empty when unrestricted.
    pub fn requested_servers(&self) -> impl Iterator<Item = &str> {
        self.requested.iter().map(String::as_str)
    }

    /// Check if the fetch behind this aggregation asked about `server`.
    ///
    /// A covered server missing from [`servers`](Self::servers) had zero
    /// listings; an uncovered one is simply unknown.
    pub fn covers(&self, server: &str) -> bool {
        self.requested.is_empty() || self.requested.contains(server)
    }

    /// Check if every server in `servers` is covered.
    pub fn covers_all<S: AsRef<str>>(&self, servers: &[S]) -> bool {
        if self.requested.is_empty() {
            return true;
        }
        // An unrestricted request is only satisfied by an unrestricted fetch.
        !servers.is_empty() && servers.iter().all(|s| self.requested.contains(s.as_ref()))
    }

    /// Total listings across all servers.
    pub fn listing_count(&self) -> usize {
        self.servers.values().map(ServerAggregate::len).sum()
    }

    /// See [`range_count`].
    pub fn range_count(&self, server: &str, min_price: u64, max_price: u64) -> usize {
        range_count(self, server, min_price, max_price)
    }
}

/// Count retainers on `server` whose price is within `[min_price, max_price]`.
///
/// Returns 0 for a server absent from the aggregation and for an inverted
/// range. Pure: never touches the network or the cache.
pub fn range_count(aggregation: &ItemAggregation, server: &str, min_price: u64, max_price: u64) -> usize {
    aggregation
        .server(server)
        .map_or(0, |aggregate| aggregate.count_in_range(PriceRange::new(min_price, max_price)))
}

/// Price check result for one selected server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RangeSummary {
    pub server: String,
    /// Band the caller asked about.
    pub range: PriceRange,
    /// All listings on the server.
    pub listings: usize,
    /// Listings inside `range`.
    pub in_range: usize,
    pub min_price: Option<u64>,
    pub max_price: Option<u64>,
}

impl RangeSummary {
    /// Summarize one server of an aggregation against a band.
    pub fn new(aggregation: &ItemAggregation, server: &str, range: PriceRange) -> Self {
        let aggregate = aggregation.server(server);
        Self {
            server: server.to_string(),
            range,
            listings: aggregate.map_or(0, ServerAggregate::len),
            in_range: range_count(aggregation, server, range.min_price, range.max_price),
            min_price: aggregate.and_then(ServerAggregate::min_price),
            max_price: aggregate.and_then(ServerAggregate::max_price),
        }
    }
}

impl std::fmt::Display for RangeSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}] {} listings within {} to {}",
            self.server, self.in_range, self.range.min_price, self.range.max_price
        )
    }
}

/// Group listings by server, then by retainer.
///
/// A retainer listed twice on the same server keeps the later price.
pub fn normalize<S: AsRef<str>>(
    item_id: ItemId,
    requested: &[S],
    listings: impl IntoIterator<Item = Listing>,
) -> ItemAggregation {
    let mut aggregation = ItemAggregation::new(item_id, requested);
    for listing in listings {
        aggregation
            .servers
            .entry(listing.server)
            .or_default()
            .insert(listing.retainer, listing.price_per_unit);
    }
    aggregation
}
