//! Domain types shared by the client and the cache.

pub mod aggregation;
pub mod common;

pub use aggregation::{ItemAggregation, Listing, RangeSummary, ServerAggregate, normalize, range_count};
pub use common::*;
