//! Universalis REST API client implementation.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use reqwest_tracing::TracingMiddleware;
use url::Url;

use crate::error::{FetchError, MarketError};
use crate::rate_limit::limits::REQUEST_TIMEOUT_SECS;
use crate::rest::endpoints::{LISTINGS, UNIVERSALIS_BASE_URL};
use crate::rest::traits::ListingSource;
use crate::rest::types::{ListingsRequest, parse_listings};
use crate::types::{ItemAggregation, ItemId, normalize};

/// The Universalis REST API client.
///
/// Performs one listings request per call and normalizes the response. It
/// does not cache and does not rate limit; wrap it in a
/// [`MarketDataCache`](crate::cache::MarketDataCache) for that.
///
/// # Example
///
/// ```rust,no_run
/// use universalis_price_cache::rest::UniversalisClient;
/// use universalis_price_cache::types::ItemId;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = UniversalisClient::new();
///     let servers = vec!["Aether".to_string()];
///     let aggregation = client.fetch_and_normalize(ItemId(5), &servers).await?;
///     println!("{} listings", aggregation.listing_count());
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct UniversalisClient {
    http_client: ClientWithMiddleware,
    base_url: String,
}

impl UniversalisClient {
    /// Create a new client with default settings.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Create a new client builder.
    pub fn builder() -> UniversalisClientBuilder {
        UniversalisClientBuilder::new()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch current listings for an item and group them per server.
    ///
    /// `servers` restricts the request; an empty slice asks for every server.
    /// Servers without listings are absent from the result.
    pub async fn fetch_and_normalize<S: AsRef<str>>(
        &self,
        item_id: ItemId,
        servers: &[S],
    ) -> Result<ItemAggregation, MarketError> {
        let request = ListingsRequest::new(item_id, servers);
        let body = self.get_with_params(LISTINGS, &request).await?;
        let listings = parse_listings(&body)?;
        Ok(normalize(item_id, servers, listings))
    }

    /// Make a GET request with query parameters and return the raw body.
    async fn get_with_params<Q>(&self, endpoint: &str, params: &Q) -> Result<String, MarketError>
    where
        Q: serde::Serialize + ?Sized,
    {
        let mut url = Url::parse(&format!("{}{}", self.base_url, endpoint))?;
        let query_string = serde_urlencoded::to_string(params)?;
        if !query_string.is_empty() {
            url.set_query(Some(&query_string));
        }

        tracing::debug!(%url, "requesting listings");
        let response = self.http_client.get(url).send().await?;
        self.read_body(response).await
    }

    /// Read a response body, mapping non-success statuses to [`FetchError::Status`].
    async fn read_body(&self, response: reqwest::Response) -> Result<String, MarketError> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(FetchError::Status { status, body }.into());
        }
        Ok(body)
    }
}

impl Default for UniversalisClient {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for UniversalisClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UniversalisClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl ListingSource for UniversalisClient {
    async fn fetch_listings(
        &self,
        item_id: ItemId,
        servers: &[String],
    ) -> Result<ItemAggregation, MarketError> {
        self.fetch_and_normalize(item_id, servers).await
    }
}

/// Builder for [`UniversalisClient`].
pub struct UniversalisClientBuilder {
    base_url: String,
    user_agent: Option<String>,
    timeout: Duration,
    max_retries: u32,
}

impl UniversalisClientBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            base_url: UNIVERSALIS_BASE_URL.to_string(),
            user_agent: None,
            timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
            max_retries: 0,
        }
    }

    /// Set the base URL (useful for testing with a mock server).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set a custom user agent.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Set the per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the maximum number of retries for transient failures.
    ///
    /// Retries happen inside one admitted call and are not seen by the rate
    /// limiter, so this defaults to zero.
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Build the client.
    ///
    /// If the HTTP client cannot be created with the configured timeout and
    /// user agent, falls back to reqwest defaults and logs a warning. Use
    /// [`try_build`](Self::try_build) to treat that as an error instead.
    pub fn build(self) -> UniversalisClient {
        let base_url = self.base_url.clone();
        let max_retries = self.max_retries;
        self.try_build().unwrap_or_else(|err| {
            tracing::warn!(error = %err, "falling back to default HTTP client settings");
            with_middleware(reqwest::Client::new(), base_url, max_retries)
        })
    }

    /// Build the client, failing if the HTTP client cannot be created.
    pub fn try_build(self) -> Result<UniversalisClient, MarketError> {
        let mut headers = HeaderMap::new();
        let user_agent = self
            .user_agent
            .unwrap_or_else(|| format!("universalis-price-cache/{}", env!("CARGO_PKG_VERSION")));
        let header_value = HeaderValue::from_str(&user_agent)
            .unwrap_or_else(|_| HeaderValue::from_static("universalis-price-cache"));
        headers.insert(USER_AGENT, header_value);

        let reqwest_client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(self.timeout)
            .build()
            .map_err(|e| MarketError::InvalidRequest(format!("could not build HTTP client: {e}")))?;

        Ok(with_middleware(reqwest_client, self.base_url, self.max_retries))
    }
}

fn with_middleware(
    reqwest_client: reqwest::Client,
    base_url: String,
    max_retries: u32,
) -> UniversalisClient {
    let retry_policy = ExponentialBackoff::builder().build_with_max_retries(max_retries);

    let http_client = ClientBuilder::new(reqwest_client)
        .with(TracingMiddleware::default())
        .with(RetryTransientMiddleware::new_with_policy(retry_policy))
        .build();

    UniversalisClient {
        http_client,
        base_url,
    }
}

impl Default for UniversalisClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
