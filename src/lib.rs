//! # Universalis Price Cache
//!
//! A throttled, TTL-bounded cache over the Universalis market board API.
//!
//! ## Features
//!
//! - Per-server, per-retainer listing aggregation for a single item
//! - Global minimum-interval rate limiting of outbound calls
//! - Freshness bounded by a TTL, memory bounded by an entry cap
//! - Single-flight fetching for concurrent misses on the same item
//! - Injectable clock for deterministic tests
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use universalis_price_cache::cache::MarketDataCache;
//! use universalis_price_cache::rest::UniversalisClient;
//! use universalis_price_cache::types::{ItemId, PriceFilters, PriceRange};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cache = MarketDataCache::new(UniversalisClient::new());
//!     let filters = PriceFilters::default().with_range("Aether", PriceRange::new(1_000, 20_000));
//!
//!     for summary in cache.check_prices(ItemId(5), &filters).await? {
//!         println!("{}", summary);
//!     }
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod clock;
pub mod error;
pub mod rate_limit;
pub mod rest;
pub mod types;

// Re-export commonly used types at crate root
pub use cache::{CacheConfig, MarketDataCache};
pub use error::{FetchError, MarketError};
pub use types::{ItemAggregation, ItemId, Listing, PriceRange, ServerAggregate, range_count};

/// Result type alias using MarketError
pub type Result<T> = std::result::Result<T, MarketError>;
