// Offline cache layer: the service-worker lifecycle over a SQLite store

mod cache;
mod fetch;
mod monitor;

pub use cache::{
    CacheError, InstallReport, OfflineCache, OfflineResponse, CACHE_VERSION, DATA_CACHE,
    PRECACHE_PATHS, SHELL_CACHE,
};
pub use fetch::{check_connectivity, CacheRequest, Destination, Fetch, FetchError, HttpFetcher};
pub use monitor::{watch_connectivity, ConnectivityMonitor, CONNECTIVITY_CHECK_INTERVAL};

use color_eyre::eyre::{eyre, Result, WrapErr};
use nyc_rw_core::map::TileBackend;
use nyc_rw_core::Dataset;
use tracing::{info, warn};

use crate::config::AppConfig;

/// Loads the dataset from `DATASET_PATH` when set, otherwise through the cache.
pub async fn load_dataset<F: Fetch>(cache: &OfflineCache<F>, config: &AppConfig) -> Result<Dataset> {
    if let Some(path) = &config.dataset_path {
        let json = tokio::fs::read_to_string(path)
            .await
            .wrap_err_with(|| format!("Failed to read dataset file {}", path.display()))?;
        let dataset = Dataset::from_json(&json)?;
        info!(path = %path.display(), restaurants = dataset.len(), "dataset loaded from file");
        // Seed the data cache so a later run without DATASET_PATH still works offline
        if let Err(e) = cache.cache_dataset(&config.dataset_url, json.as_bytes()).await {
            warn!(error = %e, "could not cache local dataset");
        }
        return Ok(dataset);
    }

    let response = cache.fetch(&CacheRequest::get(&config.dataset_url)).await;
    let source = response.source();
    let response = response.into_response();
    if !response.is_ok() {
        return Err(eyre!(
            "Dataset unavailable ({} {}): {}",
            response.status,
            response.status_text,
            response.text()
        ));
    }

    let dataset = Dataset::from_json(&response.text())?;
    info!(url = %config.dataset_url, source, restaurants = dataset.len(), "dataset loaded");
    Ok(dataset)
}

/// Like [`load_dataset`], but a missing dataset starts the explorer empty
/// and returns the message to show instead of failing startup.
pub async fn load_dataset_or_empty<F: Fetch>(
    cache: &OfflineCache<F>,
    config: &AppConfig,
) -> (Dataset, Option<String>) {
    match load_dataset(cache, config).await {
        Ok(dataset) => (dataset, None),
        Err(e) => {
            warn!(error = %e, "dataset unavailable, starting with no restaurants");
            (
                Dataset::default(),
                Some("Restaurant data not available offline. Reconnect and restart to load it.".to_string()),
            )
        }
    }
}

/// Warms the cache with every tile covering the city. Returns how many are now cached.
pub async fn prefetch_tiles<F: Fetch>(cache: &OfflineCache<F>, tiles: &TileBackend) -> usize {
    let mut cached = 0;
    for tile in tiles.tiles_for_bounds() {
        let url = tiles.tile_url(tile);
        match cache.fetch(&CacheRequest::get(&url)).await {
            OfflineResponse::Cached(_) | OfflineResponse::Network(_) => cached += 1,
            OfflineResponse::Synthetic(_) => warn!(%url, "tile not cached"),
        }
    }
    cached
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::in_memory_pool;
    use crate::db::CachedResponse;
    use std::path::PathBuf;

    struct Offline;

    impl Fetch for Offline {
        async fn fetch(&self, request: &CacheRequest) -> Result<CachedResponse, FetchError> {
            Err(FetchError::Network {
                url: request.url.clone(),
                reason: "offline".to_string(),
            })
        }
    }

    struct Online;

    impl Fetch for Online {
        async fn fetch(&self, _request: &CacheRequest) -> Result<CachedResponse, FetchError> {
            Ok(CachedResponse {
                status: 200,
                status_text: "OK".to_string(),
                content_type: None,
                body: br#"[{"name": "Via Carota", "slug": "via-carota"}]"#.to_vec(),
            })
        }
    }

    fn config(dataset_path: Option<PathBuf>) -> AppConfig {
        AppConfig {
            dataset_path,
            ..AppConfig::from_lookup(|_| None)
        }
    }

    #[tokio::test]
    async fn test_dataset_load_reports_offline_without_cache() -> Result<()> {
        let cache = OfflineCache::new(in_memory_pool().await?, Offline, "http://localhost:5173/")?;
        let error = load_dataset(&cache, &config(None)).await.err().ok_or_else(|| eyre!("loaded"))?;
        assert!(error.to_string().contains("503"));
        Ok(())
    }

    #[tokio::test]
    async fn test_offline_start_with_empty_cache_degrades_to_no_restaurants() -> Result<()> {
        let cache = OfflineCache::new(in_memory_pool().await?, Offline, "http://localhost:5173/")?;
        let (dataset, message) = load_dataset_or_empty(&cache, &config(None)).await;
        assert!(dataset.is_empty());
        assert!(message.is_some_and(|m| m.contains("not available offline")));

        let online = OfflineCache::new(in_memory_pool().await?, Online, "http://localhost:5173/")?;
        let (dataset, message) = load_dataset_or_empty(&online, &config(None)).await;
        assert_eq!(dataset.len(), 1);
        assert!(message.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_dataset_load_uses_the_network_then_the_cache() -> Result<()> {
        let pool = in_memory_pool().await?;
        let online = OfflineCache::new(pool.clone(), Online, "http://localhost:5173/")?;
        let dataset = load_dataset(&online, &config(None)).await?;
        assert_eq!(dataset.len(), 1);

        let offline = OfflineCache::new(pool, Offline, "http://localhost:5173/")?;
        let dataset = load_dataset(&offline, &config(None)).await?;
        assert!(dataset.get("via-carota").is_some());
        Ok(())
    }

    #[tokio::test]
    async fn test_local_dataset_file_seeds_the_cache() -> Result<()> {
        let dir = std::env::temp_dir().join(format!("nyc-rw-dataset-{}", std::process::id()));
        std::fs::create_dir_all(&dir)?;
        let path = dir.join("FinalData.json");
        std::fs::write(&path, r#"[{"name": "Lilia"}, {"name": ""}]"#)?;

        let cache = OfflineCache::new(in_memory_pool().await?, Offline, "http://localhost:5173/")?;
        let dataset = load_dataset(&cache, &config(Some(path))).await?;
        assert_eq!(dataset.len(), 1);
        assert!(dataset.get("lilia").is_some());

        let reloaded = load_dataset(&cache, &config(None)).await?;
        assert_eq!(reloaded.len(), 1);

        std::fs::remove_dir_all(&dir)?;
        Ok(())
    }

    #[tokio::test]
    async fn test_prefetch_counts_cached_tiles() -> Result<()> {
        let tiles = TileBackend::new("https://tile.openstreetmap.org/{z}/{x}/{y}.png", 9);
        let expected = tiles.tiles_for_bounds().len();

        let online = OfflineCache::new(in_memory_pool().await?, Online, "http://localhost:5173/")?;
        assert_eq!(prefetch_tiles(&online, &tiles).await, expected);

        let offline = OfflineCache::new(in_memory_pool().await?, Offline, "http://localhost:5173/")?;
        assert_eq!(prefetch_tiles(&offline, &tiles).await, 0);
        Ok(())
    }
}
