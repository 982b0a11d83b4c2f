use std::time::Duration;

use nyc_rw_core::map::Connectivity;
use reqwest::{header::CONTENT_TYPE, Client, Method};
use thiserror::Error;
use tracing::debug;

use crate::db::CachedResponse;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {reason}")]
    Network { url: String, reason: String },

    #[error("unsupported request method `{0}`")]
    Method(String),

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Whether the request is a page navigation, which may fall back to the cached root document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Document,
    Resource,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheRequest {
    pub method: String,
    pub url: String,
    pub destination: Destination,
}

impl CacheRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: "GET".to_string(),
            url: url.into(),
            destination: Destination::Resource,
        }
    }

    pub fn navigate(url: impl Into<String>) -> Self {
        Self {
            destination: Destination::Document,
            ..Self::get(url)
        }
    }

    pub fn with_method(mut self, method: &str) -> Self {
        self.method = method.to_ascii_uppercase();
        self
    }

    pub fn is_get(&self) -> bool {
        self.method.eq_ignore_ascii_case("GET")
    }
}

/// Network seam under the offline cache.
#[allow(async_fn_in_trait)]
pub trait Fetch {
    async fn fetch(&self, request: &CacheRequest) -> Result<CachedResponse, FetchError>;
}

/// reqwest-backed fetcher
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(5))
            .user_agent(concat!("nyc-rw-explorer/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

impl Fetch for HttpFetcher {
    async fn fetch(&self, request: &CacheRequest) -> Result<CachedResponse, FetchError> {
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|_| FetchError::Method(request.method.clone()))?;
        let network = |e: reqwest::Error| FetchError::Network {
            url: request.url.clone(),
            reason: e.to_string(),
        };

        let response = self
            .client
            .request(method, &request.url)
            .send()
            .await
            .map_err(network)?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await.map_err(network)?.to_vec();

        debug!(url = %request.url, status = status.as_u16(), bytes = body.len(), "fetched");

        Ok(CachedResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            content_type,
            body,
        })
    }
}

/// Any answer from the map provider's status endpoint counts as online.
pub async fn check_connectivity<F: Fetch>(fetcher: &F, status_url: &str) -> Connectivity {
    match fetcher.fetch(&CacheRequest::get(status_url)).await {
        Ok(_) => Connectivity::Online,
        Err(e) => {
            debug!(error = %e, "map provider unreachable");
            Connectivity::Offline
        }
    }
}
