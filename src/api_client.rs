use crate::search::error::SearchError;
use crate::search::types::SearchResponse;
use async_trait::async_trait;
use reqwest::Url;
use std::time::Duration;
use tracing::debug;

/// Path of the search endpoint, relative to the base URL
pub const SEARCH_PATH: &str = "api/search";

/// Transport used by the query controller to reach the search service.
///
/// Implementations run on the UI thread, so the returned futures need not
/// be `Send`. Dropping the future must abandon the request.
#[async_trait(?Send)]
pub trait SearchTransport {
    async fn search(&self, query: &str) -> Result<SearchResponse, SearchError>;
}

/// Build `<base>/api/search?q=<query>` with the query form-encoded
pub fn search_url(base_url: &Url, query: &str) -> Result<Url, SearchError> {
    let mut url = endpoint_url(base_url)?;
    url.query_pairs_mut().clear().append_pair("q", query);
    Ok(url)
}

fn endpoint_url(base_url: &Url) -> Result<Url, SearchError> {
    // Url::join drops the last segment unless the base ends with '/'
    let mut base = base_url.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join(SEARCH_PATH)
        .map_err(|e| SearchError::InvalidEndpoint {
            url: base_url.to_string(),
            reason: e.to_string(),
        })
}

/// Parse a configured base URL
pub fn parse_base_url(raw: &str) -> Result<Url, SearchError> {
    let url = Url::parse(raw).map_err(|e| SearchError::InvalidEndpoint {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    if url.cannot_be_a_base() {
        return Err(SearchError::InvalidEndpoint {
            url: raw.to_string(),
            reason: "URL cannot be used as a base".to_string(),
        });
    }
    Ok(url)
}

/// HTTP client for the remote search service
#[derive(Clone)]
pub struct HttpSearchClient {
    base_url: Url,
    client: reqwest::Client,
}

impl HttpSearchClient {
    pub fn new(base_url: &str) -> Result<Self, SearchError> {
        Ok(Self {
            base_url: parse_base_url(base_url)?,
            client: reqwest::Client::new(),
        })
    }

    /// Client whose connections give up after `connect_timeout`
    pub fn with_connect_timeout(
        base_url: &str,
        connect_timeout: Duration,
    ) -> Result<Self, SearchError> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()?;
        Ok(Self {
            base_url: parse_base_url(base_url)?,
            client,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Underlying reqwest client, shared with thumbnail fetches
    pub fn http(&self) -> &reqwest::Client {
        &self.client
    }

    /// Resolve a possibly relative URL (e.g. `/static/fallback-cover.svg`)
    /// against the endpoint base
    pub fn resolve(&self, url: &str) -> Result<Url, SearchError> {
        self.base_url
            .join(url)
            .map_err(|e| SearchError::InvalidEndpoint {
                url: url.to_string(),
                reason: e.to_string(),
            })
    }
}

#[async_trait(?Send)]
impl SearchTransport for HttpSearchClient {
    async fn search(&self, query: &str) -> Result<SearchResponse, SearchError> {
        let url = search_url(&self.base_url, query)?;
        debug!(target: "api", "GET {}", url);

        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::Status {
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        let result: SearchResponse = serde_json::from_slice(&body)?;
        debug!(
            target: "api",
            "Received {} of {} results ({} bytes)",
            result.items.len(),
            result.total,
            body.len()
        );
        Ok(result)
    }
}
