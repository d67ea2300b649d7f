//! Rate limiting and bounded caching for the Universalis API.
//!
//! Universalis is a community-run service; callers are expected to keep their
//! request rate low. This module provides the two building blocks the
//! [`MarketDataCache`](crate::cache::MarketDataCache) is made of.
//!
//! - [`RateLimiter`]: a global minimum-interval gate on outbound calls
//! - [`TtlCache`]: a capacity-bounded store with lazy TTL expiry
//!
//! ## Example
//!
//! ```rust
//! use std::time::{Duration, Instant};
//! use universalis_price_cache::rate_limit::{RateLimiter, TtlCache};
//!
//! let limiter = RateLimiter::new(Duration::from_secs(5));
//! let mut cache: TtlCache<u32, String> = TtlCache::new(Duration::from_secs(300), 100);
//!
//! let now = Instant::now();
//! if limiter.try_acquire(now).is_ok() {
//!     cache.insert(1234, "fetched".to_string(), now);
//! }
//! assert!(cache.contains(&1234, now));
//! ```

mod interval;
mod ttl_cache;

pub use interval::RateLimiter;
pub use ttl_cache::{CacheEntry, TtlCache};

/// Reference limits for talking to Universalis.
pub mod limits {
    /// Minimum spacing between outbound API calls, in seconds.
    pub const MIN_CALL_INTERVAL_SECS: u64 = 5;
    /// Age after which cached listings are refetched, in seconds.
    pub const CACHE_TTL_SECS: u64 = 300;
    /// Maximum number of items kept in the cache.
    pub const CACHE_CAPACITY: usize = 100;
    /// Request timeout for a single fetch, in seconds.
    pub const REQUEST_TIMEOUT_SECS: u64 = 10;
}
