//! Wire types for the Universalis listings endpoint.

use serde::{Deserialize, Serialize};

use crate::error::MarketError;
use crate::types::{ItemId, Listing};

/// Query parameters for a listings request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListingsRequest {
    /// Item to fetch listings for.
    pub ids: ItemId,
    /// Comma-separated server names. Omitted to ask for every server.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub servers: Option<String>,
}

impl ListingsRequest {
    /// Create a request for one item restricted to `servers`.
    pub fn new<S: AsRef<str>>(item_id: ItemId, servers: &[S]) -> Self {
        let servers = (!servers.is_empty()).then(|| {
            servers
                .iter()
                .map(AsRef::as_ref)
                .collect::<Vec<_>>()
                .join(",")
        });
        Self {
            ids: item_id,
            servers,
        }
    }
}

/// Listings response body.
#[derive(Debug, Clone, Deserialize)]
pub struct ListingsResponse {
    /// Current offers, in the order the API returned them.
    pub listings: Vec<WireListing>,
}

/// A single listing as sent by the API.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireListing {
    pub server: String,
    pub retainer: String,
    /// Unsigned on purpose: a negative price fails deserialization.
    pub price_per_unit: u64,
}

impl TryFrom<WireListing> for Listing {
    type Error = MarketError;

    fn try_from(wire: WireListing) -> Result<Self, Self::Error> {
        if wire.server.trim().is_empty() {
            return Err(MarketError::malformed(format!(
                "listing by retainer {:?} has an empty server name",
                wire.retainer
            )));
        }
        Ok(Listing::new(wire.server, wire.retainer, wire.price_per_unit))
    }
}

/// Parse a listings response body into validated listings.
pub fn parse_listings(body: &str) -> Result<Vec<Listing>, MarketError> {
    let response: ListingsResponse = serde_json::from_str(body)?;
    response.listings.into_iter().map(Listing::try_from).collect()
}
