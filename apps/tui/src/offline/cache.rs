use reqwest::Url;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::fetch::{CacheRequest, Destination, Fetch};
use crate::db::queries::{cache_names, delete_cache, match_any, match_entry, put_entry};
use crate::db::CachedResponse;

/// Bump to retire every cache written by an earlier release.
macro_rules! cache_version {
    () => {
        "1"
    };
}

pub const CACHE_VERSION: &str = cache_version!();
pub const SHELL_CACHE: &str = concat!("nyc-restaurant-week-v", cache_version!());
pub const DATA_CACHE: &str = concat!("nyc-restaurant-data-v", cache_version!());

/// App shell assets fetched on install.
pub const PRECACHE_PATHS: &[&str] = &[
    "/",
    "/manifest.json",
    "/nyc.png",
    "/header.png",
    "/MichelinStar.svg.png",
    "/bibgourmand.png",
    "/nytimes.png",
];

const DATA_MARKERS: [&str; 3] = ["FinalData.json", "/api/restaurants", "/data/restaurants"];
const TILE_MARKERS: [&str; 2] = ["mapbox", "tile.openstreetmap.org"];
const DATA_OFFLINE_BODY: &str = "Restaurant data not available offline";
const OFFLINE_BODY: &str = "Offline";

#[derive(Debug, Error)]
pub enum CacheError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error("invalid app origin `{0}`")]
    Origin(String),
}

/// A response plus where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OfflineResponse {
    Cached(CachedResponse),
    Network(CachedResponse),
    Synthetic(CachedResponse),
}

impl OfflineResponse {
    pub const fn response(&self) -> &CachedResponse {
        match self {
            Self::Cached(response) | Self::Network(response) | Self::Synthetic(response) => {
                response
            }
        }
    }

    pub fn into_response(self) -> CachedResponse {
        match self {
            Self::Cached(response) | Self::Network(response) | Self::Synthetic(response) => {
                response
            }
        }
    }

    pub const fn source(&self) -> &'static str {
        match self {
            Self::Cached(_) => "cache",
            Self::Network(_) => "network",
            Self::Synthetic(_) => "offline",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallReport {
    pub cached: usize,
    pub failed: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    Bypass,
    Data,
    Tiles,
    Shell,
}

/// Install / activate / fetch lifecycle over named SQLite-backed caches.
pub struct OfflineCache<F> {
    pool: SqlitePool,
    fetcher: F,
    origin: Url,
}

impl<F: Fetch> OfflineCache<F> {
    /// `app_url` is any URL on the app's origin, usually the dataset URL.
    pub fn new(pool: SqlitePool, fetcher: F, app_url: &str) -> Result<Self, CacheError> {
        let url = Url::parse(app_url).map_err(|_| CacheError::Origin(app_url.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(CacheError::Origin(app_url.to_string()));
        }
        let origin = Url::parse(&url.origin().ascii_serialization())
            .map_err(|_| CacheError::Origin(app_url.to_string()))?;
        Ok(Self {
            pool,
            fetcher,
            origin,
        })
    }

    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub const fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Absolute URL for an app path like `/manifest.json`.
    pub fn resolve(&self, path: &str) -> String {
        self.origin
            .join(path)
            .map_or_else(|_| path.to_string(), |url| url.to_string())
    }

    /// Pre-caches the shell. A failed entry is logged and counted; the rest still install.
    pub async fn install(&self, paths: &[&str]) -> Result<InstallReport, CacheError> {
        info!(cache = SHELL_CACHE, "installing offline cache");
        crate::db::queries::open_cache(&self.pool, SHELL_CACHE).await?;
        crate::db::queries::open_cache(&self.pool, DATA_CACHE).await?;

        let mut report = InstallReport::default();
        for path in paths
            .iter()
            .filter(|path| path.starts_with('/') || path.starts_with("http"))
        {
            let url = self.resolve(path);
            match self.fetcher.fetch(&CacheRequest::get(&url)).await {
                Ok(response) if response.is_ok() => {
                    put_entry(&self.pool, SHELL_CACHE, &url, &response).await?;
                    report.cached += 1;
                }
                Ok(response) => {
                    warn!(%url, status = response.status, "pre-cache skipped");
                    report.failed.push(url);
                }
                Err(e) => {
                    warn!(%url, error = %e, "pre-cache failed");
                    report.failed.push(url);
                }
            }
        }
        Ok(report)
    }

    /// Deletes every cache generation other than the current two.
    pub async fn activate(&self) -> Result<Vec<String>, CacheError> {
        let mut purged = Vec::new();
        for name in cache_names(&self.pool).await? {
            if name != SHELL_CACHE && name != DATA_CACHE {
                info!(cache = %name, "removing old cache");
                delete_cache(&self.pool, &name).await?;
                purged.push(name);
            }
        }
        Ok(purged)
    }

    /// Stores a dataset body the app already holds under `url`, so it survives going offline.
    pub async fn cache_dataset(&self, url: &str, body: &[u8]) -> Result<(), CacheError> {
        let response = CachedResponse {
            status: 200,
            status_text: "OK".to_string(),
            content_type: Some("application/json".to_string()),
            body: body.to_vec(),
        };
        put_entry(&self.pool, DATA_CACHE, url, &response).await?;
        Ok(())
    }

    pub async fn fetch(&self, request: &CacheRequest) -> OfflineResponse {
        let route = self.route(request);
        debug!(url = %request.url, ?route, "offline fetch");
        match route {
            Route::Bypass => self.network_only(request).await,
            Route::Data => {
                self.cache_first(request, DATA_CACHE, DATA_OFFLINE_BODY)
                    .await
            }
            Route::Tiles => self.cache_first(request, SHELL_CACHE, OFFLINE_BODY).await,
            Route::Shell => self.shell(request).await,
        }
    }

    fn route(&self, request: &CacheRequest) -> Route {
        let url = &request.url;
        if !url.starts_with("http") || url.contains("extension://") || !request.is_get() {
            return Route::Bypass;
        }
        if DATA_MARKERS.iter().any(|marker| url.contains(marker)) {
            return Route::Data;
        }
        if TILE_MARKERS.iter().any(|marker| url.contains(marker)) {
            return Route::Tiles;
        }
        match Url::parse(url) {
            Ok(parsed) if parsed.origin() == self.origin.origin() => Route::Shell,
            _ => Route::Bypass,
        }
    }

    async fn network_only(&self, request: &CacheRequest) -> OfflineResponse {
        match self.fetcher.fetch(request).await {
            Ok(response) => OfflineResponse::Network(response),
            Err(e) => {
                debug!(error = %e, "network-only request failed");
                OfflineResponse::Synthetic(CachedResponse::service_unavailable(OFFLINE_BODY))
            }
        }
    }

    async fn cache_first(
        &self,
        request: &CacheRequest,
        cache_name: &str,
        offline_body: &str,
    ) -> OfflineResponse {
        if let Some(cached) = self.lookup(Some(cache_name), &request.url).await {
            return OfflineResponse::Cached(cached);
        }

        match self.fetcher.fetch(request).await {
            Ok(response) => {
                self.store(cache_name, &request.url, &response).await;
                OfflineResponse::Network(response)
            }
            Err(e) => {
                warn!(url = %request.url, error = %e, "offline with nothing cached");
                OfflineResponse::Synthetic(CachedResponse::service_unavailable(offline_body))
            }
        }
    }

    async fn shell(&self, request: &CacheRequest) -> OfflineResponse {
        if let Some(cached) = self.lookup(None, &request.url).await {
            return OfflineResponse::Cached(cached);
        }

        match self.fetcher.fetch(request).await {
            Ok(response) => {
                self.store(SHELL_CACHE, &request.url, &response).await;
                OfflineResponse::Network(response)
            }
            Err(_) if request.destination == Destination::Document => {
                match self.lookup(None, &self.resolve("/")).await {
                    Some(root) => OfflineResponse::Cached(root),
                    None => {
                        OfflineResponse::Synthetic(CachedResponse::service_unavailable(OFFLINE_BODY))
                    }
                }
            }
            Err(_) => OfflineResponse::Synthetic(CachedResponse::service_unavailable(OFFLINE_BODY)),
        }
    }

    /// Cache read failures count as misses.
    async fn lookup(&self, cache_name: Option<&str>, url: &str) -> Option<CachedResponse> {
        let result = match cache_name {
            Some(name) => match_entry(&self.pool, name, url).await,
            None => match_any(&self.pool, url).await,
        };
        match result {
            Ok(record) => record.map(CachedResponse::from),
            Err(e) => {
                warn!(%url, error = %e, "cache read failed");
                None
            }
        }
    }

    /// Only 200 responses are cached; write failures are logged, never surfaced.
    async fn store(&self, cache_name: &str, url: &str, response: &CachedResponse) {
        if !response.is_ok() {
            return;
        }
        if let Err(e) = put_entry(&self.pool, cache_name, url, response).await {
            warn!(%url, error = %e, "cache write failed");
        }
    }
}
