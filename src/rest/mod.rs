//! Universalis REST API client.
//!
//! # Trait-based API
//!
//! The [`ListingSource`] trait abstracts the fetch step, enabling:
//! - Stub implementations for testing the cache without a network
//! - Alternative implementations
//!
//! ```rust,ignore
//! use universalis_price_cache::rest::{ListingSource, UniversalisClient};
//! use universalis_price_cache::types::ItemId;
//!
//! async fn count<S: ListingSource>(source: &S) -> universalis_price_cache::Result<usize> {
//!     let aggregation = source.fetch_listings(ItemId(5), &[]).await?;
//!     Ok(aggregation.listing_count())
//! }
//! ```

mod client;
mod endpoints;
mod traits;
pub mod types;

pub use client::{UniversalisClient, UniversalisClientBuilder};
pub use endpoints::*;
pub use traits::ListingSource;
pub use types::{ListingsRequest, ListingsResponse, WireListing, parse_listings};
