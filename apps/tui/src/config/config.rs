use color_eyre::eyre::eyre;
use dotenv::dotenv;
use std::env;
use std::path::{Path, PathBuf};

pub const DEFAULT_DATASET_URL: &str = "http://localhost:5173/FinalData.json";
pub const DEFAULT_DATA_DIR: &str = "./.nyc-rw";
pub const DEFAULT_TILE_TEMPLATE: &str = nyc_rw_core::map::DEFAULT_TILE_TEMPLATE;
pub const DEFAULT_MAP_STATUS_URL: &str = "https://api.mapbox.com/v1/status";

/// Runtime configuration resolved from the environment (and `.env`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub dataset_url: String,
    /// Local file that replaces the remote dataset when set.
    pub dataset_path: Option<PathBuf>,
    pub data_dir: PathBuf,
    pub cache_db: PathBuf,
    pub tile_template: String,
    pub map_status_url: String,
    pub debug: bool,
}

impl AppConfig {
    /// Loads `.env`, reads the environment and makes sure the data directory exists.
    pub fn from_env() -> color_eyre::eyre::Result<Self> {
        dotenv().ok();

        let config = Self::from_lookup(|key| env::var(key).ok());

        if !config.data_dir.exists() {
            std::fs::create_dir_all(&config.data_dir).map_err(|e| {
                eyre!(
                    "Failed to create data directory {}: {e}",
                    config.data_dir.display()
                )
            })?;
        }

        Ok(config)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let value = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let data_dir = value("DATA_DIR").map_or_else(|| PathBuf::from(DEFAULT_DATA_DIR), PathBuf::from);
        let cache_db = value("CACHE_DB")
            .map_or_else(|| data_dir.join("offline-cache.db"), PathBuf::from);

        Self {
            dataset_url: value("DATASET_URL").unwrap_or_else(|| DEFAULT_DATASET_URL.to_string()),
            dataset_path: value("DATASET_PATH").map(PathBuf::from),
            cache_db,
            tile_template: value("MAP_TILE_TEMPLATE")
                .unwrap_or_else(|| DEFAULT_TILE_TEMPLATE.to_string()),
            map_status_url: value("MAP_STATUS_URL")
                .unwrap_or_else(|| DEFAULT_MAP_STATUS_URL.to_string()),
            debug: value("DEBUG").is_some_and(|v| v != "0" && !v.eq_ignore_ascii_case("false")),
            data_dir,
        }
    }

    /// Durable key/value file holding the favorites list.
    pub fn storage_path(&self) -> PathBuf {
        self.data_dir.join("storage.json")
    }

    pub fn log_path(&self) -> PathBuf {
        self.data_dir.join("explorer.log")
    }

    /// SQLx URL for the offline cache database.
    pub fn database_url(&self) -> color_eyre::eyre::Result<String> {
        sqlite_url(&self.cache_db)
    }
}

/// SQLx wants `sqlite:///abs/path` for absolute paths and `sqlite://rel/path` otherwise.
pub fn sqlite_url(path: &Path) -> color_eyre::eyre::Result<String> {
    let path_str = path
        .to_str()
        .ok_or_else(|| eyre!("Invalid database path"))?;

    let clean_path = path_str.trim_start_matches('/');

    if path.is_absolute() {
        Ok(format!("sqlite:///{clean_path}"))
    } else {
        Ok(format!("sqlite://{clean_path}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = AppConfig::from_lookup(lookup(&[]));
        assert_eq!(config.dataset_url, DEFAULT_DATASET_URL);
        assert_eq!(config.data_dir, PathBuf::from(DEFAULT_DATA_DIR));
        assert_eq!(config.cache_db, PathBuf::from(DEFAULT_DATA_DIR).join("offline-cache.db"));
        assert_eq!(config.tile_template, DEFAULT_TILE_TEMPLATE);
        assert!(config.dataset_path.is_none());
        assert!(!config.debug);
    }

    #[test]
    fn cache_db_follows_data_dir_unless_overridden() {
        let config = AppConfig::from_lookup(lookup(&[("DATA_DIR", "/tmp/rw"), ("DEBUG", "1")]));
        assert_eq!(config.cache_db, PathBuf::from("/tmp/rw/offline-cache.db"));
        assert_eq!(config.storage_path(), PathBuf::from("/tmp/rw/storage.json"));
        assert!(config.debug);

        let config = AppConfig::from_lookup(lookup(&[
            ("DATA_DIR", "/tmp/rw"),
            ("CACHE_DB", "/var/cache/rw.db"),
            ("DEBUG", "false"),
        ]));
        assert_eq!(config.cache_db, PathBuf::from("/var/cache/rw.db"));
        assert!(!config.debug);
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let config = AppConfig::from_lookup(lookup(&[("DATASET_URL", "  "), ("DATASET_PATH", "")]));
        assert_eq!(config.dataset_url, DEFAULT_DATASET_URL);
        assert!(config.dataset_path.is_none());
    }

    #[test]
    fn sqlite_urls_match_sqlx_slash_rules() -> Result<(), Box<dyn std::error::Error>> {
        assert_eq!(sqlite_url(Path::new("/data/cache.db"))?, "sqlite:///data/cache.db");
        assert_eq!(sqlite_url(Path::new("rw/cache.db"))?, "sqlite://rw/cache.db");
        Ok(())
    }
}
