//! Trait definition for listing sources.
//!
//! [`ListingSource`] is the seam between the cache and the network. The cache
//! only needs "give me the aggregation for this item and these servers", which
//! enables:
//! - Counting or failing stubs in tests
//! - Alternative backends (a mirror, a recorded fixture)
//!
//! # Example
//!
//! ```rust,ignore
//! use universalis_price_cache::rest::{ListingSource, UniversalisClient};
//! use universalis_price_cache::types::ItemId;
//!
//! async fn cheapest<S: ListingSource>(source: &S) -> universalis_price_cache::Result<Option<u64>> {
//!     let servers = vec!["Aether".to_string()];
//!     let aggregation = source.fetch_listings(ItemId(5), &servers).await?;
//!     Ok(aggregation.server("Aether").and_then(|s| s.min_price()))
//! }
//! ```

use std::future::Future;
use std::sync::Arc;

use crate::error::MarketError;
use crate::types::{ItemAggregation, ItemId};

/// Fetches and normalizes current listings for one item.
///
/// Implementations perform the network call (or its stand-in) and nothing
/// else: no caching, no rate limiting.
pub trait ListingSource: Send + Sync {
    /// Fetch listings for `item_id` on `servers` (all servers if empty).
    fn fetch_listings(
        &self,
        item_id: ItemId,
        servers: &[String],
    ) -> impl Future<Output = Result<ItemAggregation, MarketError>> + Send;
}

impl<T: ListingSource> ListingSource for Arc<T> {
    fn fetch_listings(
        &self,
        item_id: ItemId,
        servers: &[String],
    ) -> impl Future<Output = Result<ItemAggregation, MarketError>> + Send {
        (**self).fetch_listings(item_id, servers)
    }
}
