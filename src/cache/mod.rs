//! Throttled, TTL-bounded market data cache.
//!
//! [`MarketDataCache`] sits between callers and a [`ListingSource`]:
//!
//! ```text
//! query(item, servers)
//!     ↓
//! fresh entry covering servers? ──yes──→ return it
//!     ↓ no
//! single-flight gate for item (re-check after waiting)
//!     ↓
//! RateLimiter::try_acquire(now) ──denied──→ Err(RateLimited)
//!     ↓
//! ListingSource::fetch_listings (no lock held)
//!     ↓
//! store with fetched_at = now unless a newer entry landed meanwhile,
//! evict oldest if full
//! ```
//!
//! A failed refresh never touches the stored entry. Stale data is not served
//! as fresh; it stays stored only so [`MarketDataCache::cached`] can still
//! show it.
//!
//! # Example
//!
//! ```rust,no_run
//! use universalis_price_cache::cache::MarketDataCache;
//! use universalis_price_cache::rest::UniversalisClient;
//! use universalis_price_cache::types::ItemId;
//!
//! # async fn example() -> universalis_price_cache::Result<()> {
//! let cache = MarketDataCache::new(UniversalisClient::new());
//! let aggregation = cache.query(ItemId(5), &["Aether", "Primal"]).await?;
//! println!("Aether listings between 100 and 500: {}", aggregation.range_count("Aether", 100, 500));
//! # Ok(())
//! # }
//! ```

mod single_flight;

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::clock::{Clock, SystemClock};
use crate::error::MarketError;
use crate::rate_limit::limits::{CACHE_CAPACITY, CACHE_TTL_SECS, MIN_CALL_INTERVAL_SECS};
use crate::rate_limit::{RateLimiter, TtlCache};
use crate::rest::ListingSource;
use crate::types::{ItemAggregation, ItemId, PriceFilters, RangeSummary};

use single_flight::SingleFlight;

/// Cache configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Age after which an entry is refetched.
    pub ttl: Duration,
    /// Minimum spacing between outbound fetches, across all items.
    pub min_interval: Duration,
    /// Maximum number of items kept.
    pub max_entries: usize,
    /// Whether concurrent misses for one item share a single fetch.
    pub single_flight: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(CACHE_TTL_SECS),
            min_interval: Duration::from_secs(MIN_CALL_INTERVAL_SECS),
            max_entries: CACHE_CAPACITY,
            single_flight: true,
        }
    }
}

/// Item-keyed cache of listing aggregations, refreshed through a rate limiter.
///
/// Shared by reference (or `Arc`) between concurrent callers. The store and
/// the limiter each sit behind their own lock; neither is held while a fetch
/// is in progress.
pub struct MarketDataCache<S, C = SystemClock> {
    source: S,
    clock: C,
    config: CacheConfig,
    store: Mutex<TtlCache<ItemId, Arc<ItemAggregation>>>,
    limiter: Arc<RateLimiter>,
    flights: SingleFlight<ItemId>,
}

impl<S: ListingSource> MarketDataCache<S> {
    /// Create a cache with default settings over `source`.
    pub fn new(source: S) -> Self {
        Self::builder(source).build()
    }

    /// Create a cache builder.
    pub fn builder(source: S) -> MarketDataCacheBuilder<S> {
        MarketDataCacheBuilder::new(source)
    }
}

impl<S, C> MarketDataCache<S, C>
where
    S: ListingSource,
    C: Clock,
{
    /// Get listings for an item, fetching them if needed.
    ///
    /// `servers` restricts the fetch; an empty slice asks for every server.
    /// A fresh entry is reused only if it covers all requested servers.
    ///
    /// # Errors
    ///
    /// - [`MarketError::RateLimited`] if a fetch is needed but another one
    ///   happened less than `min_interval` ago
    /// - [`MarketError::FetchFailed`] / [`MarketError::MalformedResponse`]
    ///   straight from the source
    pub async fn query<T: AsRef<str>>(
        &self,
        item_id: ItemId,
        servers: &[T],
    ) -> Result<Arc<ItemAggregation>, MarketError> {
        let servers = canonical_servers(servers);

        if let Some(hit) = self.lookup(item_id, &servers, self.clock.now()) {
            tracing::debug!(item = %item_id, "listing cache hit");
            return Ok(hit);
        }

        let _flight = if self.config.single_flight {
            let guard = self.flights.acquire(item_id).await;
            // Another caller may have refreshed the entry while we waited.
            if let Some(hit) = self.lookup(item_id, &servers, self.clock.now()) {
                tracing::debug!(item = %item_id, "listing cache filled by concurrent fetch");
                return Ok(hit);
            }
            Some(guard)
        } else {
            None
        };

        let now = self.clock.now();
        if let Err(retry_after) = self.limiter.try_acquire(now) {
            tracing::warn!(
                item = %item_id,
                retry_after_ms = retry_after.as_millis() as u64,
                "listing fetch rate limited"
            );
            return Err(MarketError::rate_limited(retry_after));
        }

        tracing::info!(item = %item_id, servers = ?servers, "fetching listings");
        let aggregation = match self.source.fetch_listings(item_id, &servers).await {
            Ok(aggregation) => Arc::new(aggregation),
            Err(err) => {
                log_fetch_error(item_id, &err);
                return Err(err);
            }
        };

        let mut store = self.store();
        if store
            .peek_entry(&item_id)
            .is_some_and(|entry| entry.inserted_at > now)
        {
            tracing::debug!(item = %item_id, "newer listings already stored, keeping them");
            return Ok(aggregation);
        }
        let evicted = store.insert(item_id, Arc::clone(&aggregation), now);
        drop(store);
        tracing::info!(
            item = %item_id,
            listings = aggregation.listing_count(),
            "stored listings"
        );
        if let Some((evicted_id, _)) = evicted {
            tracing::debug!(item = %evicted_id, "evicted oldest listing entry");
        }

        Ok(aggregation)
    }

    /// Query only the servers selected in `filters` and count listings in
    /// each server's band.
    ///
    /// Returns an empty report without fetching when no server is selected.
    pub async fn check_prices(
        &self,
        item_id: ItemId,
        filters: &PriceFilters,
    ) -> Result<Vec<RangeSummary>, MarketError> {
        let servers = filters.selected_servers();
        if servers.is_empty() {
            return Ok(Vec::new());
        }

        let aggregation = self.query(item_id, servers.as_slice()).await?;
        Ok(filters
            .selected()
            .map(|(server, range)| {
                if range.is_inverted() {
                    tracing::warn!(
                        server,
                        min_price = range.min_price,
                        max_price = range.max_price,
                        "minimum price is greater than maximum price"
                    );
                }
                RangeSummary::new(&aggregation, server, range)
            })
            .collect())
    }

    /// Age of the stored entry for an item, stale or not.
    pub fn entry_age(&self, item_id: ItemId) -> Option<Duration> {
        self.store().get_age(&item_id, self.clock.now())
    }

    /// Check if a fresh entry exists for an item.
    pub fn is_fresh(&self, item_id: ItemId) -> bool {
        self.store().contains(&item_id, self.clock.now())
    }

    /// Time until the limiter admits another fetch, `None` if it would now.
    pub fn retry_after(&self) -> Option<Duration> {
        self.limiter.time_until_available(self.clock.now())
    }

    /// Number of items with a fetch in progress or callers waiting on one.
    pub fn in_flight(&self) -> usize {
        self.flights.in_flight()
    }

    /// Drop stale entries. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        self.store().cleanup(now)
    }

    fn lookup(&self, item_id: ItemId, servers: &[String], now: Instant) -> Option<Arc<ItemAggregation>> {
        self.store()
            .get(&item_id, now)
            .filter(|aggregation| aggregation.covers_all(servers))
            .cloned()
    }
}

impl<S, C> MarketDataCache<S, C> {
    /// Stored aggregation for an item regardless of its age.
    pub fn cached(&self, item_id: ItemId) -> Option<Arc<ItemAggregation>> {
        self.store().peek(&item_id).cloned()
    }

    /// Instant the stored entry for an item was fetched at.
    pub fn fetched_at(&self, item_id: ItemId) -> Option<Instant> {
        self.store().peek_entry(&item_id).map(|entry| entry.inserted_at)
    }

    /// Remove an item's entry. Returns whether one existed.
    pub fn invalidate(&self, item_id: ItemId) -> bool {
        self.store().remove(&item_id).is_some()
    }

    /// Remove every entry.
    pub fn clear(&self) {
        self.store().clear();
    }

    /// Number of stored entries, stale ones included.
    pub fn len(&self) -> usize {
        self.store().len()
    }

    pub fn is_empty(&self) -> bool {
        self.store().is_empty()
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// The limiter gating this cache's fetches.
    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    fn store(&self) -> MutexGuard<'_, TtlCache<ItemId, Arc<ItemAggregation>>> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<S, C> std::fmt::Debug for MarketDataCache<S, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarketDataCache")
            .field("config", &self.config)
            .field("entries", &self.len())
            .field("limiter", &self.limiter)
            .finish()
    }
}

/// Builder for [`MarketDataCache`].
pub struct MarketDataCacheBuilder<S, C = SystemClock> {
    source: S,
    clock: C,
    config: CacheConfig,
    limiter: Option<Arc<RateLimiter>>,
}

impl<S> MarketDataCacheBuilder<S> {
    /// Create a new builder with default settings.
    pub fn new(source: S) -> Self {
        Self {
            source,
            clock: SystemClock,
            config: CacheConfig::default(),
            limiter: None,
        }
    }
}

impl<S, C> MarketDataCacheBuilder<S, C> {
    /// Replace the whole configuration.
    pub fn config(mut self, config: CacheConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the entry time-to-live.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.config.ttl = ttl;
        self
    }

    /// Set the minimum spacing between fetches.
    ///
    /// Ignored when a shared limiter is supplied.
    pub fn min_interval(mut self, min_interval: Duration) -> Self {
        self.config.min_interval = min_interval;
        self
    }

    /// Set the maximum number of stored items.
    pub fn max_entries(mut self, max_entries: usize) -> Self {
        self.config.max_entries = max_entries;
        self
    }

    /// Enable or disable single-flight fetching.
    pub fn single_flight(mut self, enabled: bool) -> Self {
        self.config.single_flight = enabled;
        self
    }

    /// Share a limiter with other caches hitting the same API.
    pub fn limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    /// Use a different time source.
    pub fn clock<C2: Clock>(self, clock: C2) -> MarketDataCacheBuilder<S, C2> {
        MarketDataCacheBuilder {
            source: self.source,
            clock,
            config: self.config,
            limiter: self.limiter,
        }
    }

    /// Build the cache.
    pub fn build(self) -> MarketDataCache<S, C> {
        let mut config = self.config;
        let limiter = match self.limiter {
            Some(limiter) => {
                config.min_interval = limiter.min_interval();
                limiter
            }
            None => Arc::new(RateLimiter::new(config.min_interval)),
        };

        MarketDataCache {
            source: self.source,
            clock: self.clock,
            store: Mutex::new(TtlCache::new(config.ttl, config.max_entries)),
            config,
            limiter,
            flights: SingleFlight::new(),
        }
    }
}

/// Sorted, de-duplicated, non-blank server names.
fn canonical_servers<T: AsRef<str>>(servers: &[T]) -> Vec<String> {
    servers
        .iter()
        .map(|s| s.as_ref().trim())
        .filter(|s| !s.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

fn log_fetch_error(item_id: ItemId, err: &MarketError) {
    match err {
        MarketError::MalformedResponse(reason) => {
            tracing::error!(item = %item_id, %reason, "listings response did not match the expected schema");
        }
        other => {
            tracing::warn!(item = %item_id, error = %other, "listing fetch failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::types::{Listing, PriceRange, normalize};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Returns a fixed listing set and counts calls.
    struct FixedSource {
        listings: Vec<Listing>,
        calls: AtomicUsize,
    }

    impl FixedSource {
        fn new(listings: Vec<Listing>) -> Self {
            Self {
                listings,
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl ListingSource for FixedSource {
        async fn fetch_listings(
            &self,
            item_id: ItemId,
            servers: &[String],
        ) -> Result<ItemAggregation, MarketError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let listings = self
                .listings
                .iter()
                .filter(|l| servers.is_empty() || servers.contains(&l.server))
                .cloned();
            Ok(normalize(item_id, servers, listings))
        }
    }

    fn cache_with(
        listings: Vec<Listing>,
    ) -> (MarketDataCache<Arc<FixedSource>, Arc<ManualClock>>, Arc<FixedSource>, Arc<ManualClock>) {
        let source = Arc::new(FixedSource::new(listings));
        let clock = Arc::new(ManualClock::new());
        let cache = MarketDataCache::builder(Arc::clone(&source))
            .clock(Arc::clone(&clock))
            .build();
        (cache, source, clock)
    }

    #[test]
    fn test_canonical_servers() {
        assert_eq!(
            canonical_servers(&["Primal", " Aether ", "", "Primal"]),
            vec!["Aether".to_string(), "Primal".to_string()]
        );
    }

    #[test]
    fn test_default_config() {
        let config = CacheConfig::default();
        assert_eq!(config.ttl, Duration::from_secs(300));
        assert_eq!(config.min_interval, Duration::from_secs(5));
        assert_eq!(config.max_entries, 100);
        assert!(config.single_flight);
    }

    #[test]
    fn test_shared_limiter_overrides_interval() {
        let limiter = Arc::new(RateLimiter::new(Duration::from_secs(9)));
        let cache = MarketDataCache::builder(FixedSource::new(vec![]))
            .min_interval(Duration::from_secs(1))
            .limiter(Arc::clone(&limiter))
            .build();
        assert_eq!(cache.config().min_interval, Duration::from_secs(9));
        assert!(Arc::ptr_eq(cache.limiter(), &limiter));
    }

    #[tokio::test]
    async fn test_hit_skips_source() {
        let (cache, source, clock) = cache_with(vec![Listing::new("Aether", "v1", 1200)]);

        let first = cache.query(ItemId(1), &["Aether"]).await.unwrap();
        clock.advance(Duration::from_secs(1));
        let second = cache.query(ItemId(1), &["Aether"]).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(source.calls(), 1);
        assert_eq!(cache.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_uncovered_server_is_a_miss() {
        let (cache, source, clock) = cache_with(vec![
            Listing::new("Aether", "v1", 1200),
            Listing::new("Primal", "p1", 800),
        ]);

        cache.query(ItemId(1), &["Aether"]).await.unwrap();
        clock.advance(Duration::from_secs(6));
        let wider = cache.query(ItemId(1), &["Aether", "Primal"]).await.unwrap();

        assert_eq!(source.calls(), 2);
        assert_eq!(wider.range_count("Primal", 0, 1000), 1);

        // The wider entry now serves the narrower query.
        let narrow = cache.query(ItemId(1), &["Primal"]).await.unwrap();
        assert!(Arc::ptr_eq(&wider, &narrow));
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_check_prices_counts_selected_servers() {
        let (cache, source, _clock) = cache_with(vec![
            Listing::new("Aether", "v1", 100),
            Listing::new("Aether", "v2", 500),
            Listing::new("Aether", "v3", 1000),
            Listing::new("Crystal", "c1", 50),
        ]);
        let filters = PriceFilters::default()
            .with_range("Aether", PriceRange::new(100, 500))
            .with_range("Primal", PriceRange::new(900, 100));

        let report = cache.check_prices(ItemId(1234), &filters).await.unwrap();

        assert_eq!(report.len(), 2);
        assert_eq!(report[0].server, "Aether");
        assert_eq!(report[0].in_range, 2);
        assert_eq!(report[1].server, "Primal");
        assert_eq!(report[1].in_range, 0);

        // Crystal was not selected, so it was never fetched.
        let cached = cache.cached(ItemId(1234)).unwrap();
        assert!(!cached.covers("Crystal"));
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_check_prices_with_padded_server_name() {
        let (cache, _source, _clock) = cache_with(vec![
            Listing::new("Aether", "v1", 100),
            Listing::new("Aether", "v2", 500),
        ]);
        let filters = PriceFilters::new().with_range(" Aether ", PriceRange::new(100, 500));

        let report = cache.check_prices(ItemId(1234), &filters).await.unwrap();

        assert_eq!(report.len(), 1);
        assert_eq!(report[0].server, "Aether");
        assert_eq!(report[0].in_range, 2);
    }

    #[tokio::test]
    async fn test_check_prices_without_selection_skips_fetch() {
        let (cache, source, _clock) = cache_with(vec![]);
        let report = cache.check_prices(ItemId(1), &PriceFilters::default()).await.unwrap();
        assert!(report.is_empty());
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn test_invalidate_and_purge() {
        let (cache, _source, clock) = cache_with(vec![Listing::new("Aether", "v1", 1)]);

        cache.query(ItemId(1), &["Aether"]).await.unwrap();
        clock.advance(Duration::from_secs(5));
        cache.query(ItemId(2), &["Aether"]).await.unwrap();
        assert_eq!(cache.len(), 2);

        assert!(cache.invalidate(ItemId(2)));
        assert!(!cache.invalidate(ItemId(2)));

        clock.advance(Duration::from_secs(300));
        assert!(!cache.is_fresh(ItemId(1)));
        assert_eq!(cache.entry_age(ItemId(1)), Some(Duration::from_secs(305)));
        assert_eq!(cache.purge_expired(), 1);
        assert!(cache.is_empty());
    }
}
