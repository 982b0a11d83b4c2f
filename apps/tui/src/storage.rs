use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use nyc_rw_core::{KeyValueStore, StorageError};
use tracing::warn;

/// Key/value store persisted as one JSON object on disk.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl FileStore {
    /// Opens `path`; a missing file starts empty, an unreadable one is reported.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let values = match std::fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text).map_err(|source| StorageError::Malformed {
                key: path.display().to_string(),
                source,
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(StorageError::Unavailable(e.to_string())),
        };
        Ok(Self { path, values })
    }

    /// Like [`FileStore::open`], but a broken file is set aside and replaced with an empty store.
    pub fn open_or_reset(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match Self::open(&path) {
            Ok(store) => store,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "starting with empty storage");
                Self {
                    path,
                    values: BTreeMap::new(),
                }
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, key: &str) -> Result<(), StorageError> {
        let write_error = |reason: String| StorageError::Write {
            key: key.to_string(),
            reason,
        };
        let json = serde_json::to_string_pretty(&self.values).map_err(|e| write_error(e.to_string()))?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| write_error(e.to_string()))?;
            }
        }
        // Write-then-rename so a crash never leaves half a file behind
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(|e| write_error(e.to_string()))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| write_error(e.to_string()))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.values.insert(key.to_string(), value.to_string());
        self.flush(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nyc_rw_core::favorites::{MemoryFragment, FAVORITES_KEY};
    use nyc_rw_core::{Dataset, FavoritesStore};

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("nyc-rw-{name}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    fn dataset() -> Dataset {
        Dataset::from_json(r#"[{"name": "Lilia"}, {"name": "Le Bernardin"}]"#).unwrap()
    }

    #[test]
    fn missing_file_starts_empty_and_set_creates_it() {
        let dir = temp_dir("create");
        let path = dir.join("nested").join("storage.json");

        let mut store = FileStore::open(&path).unwrap();
        assert_eq!(store.get("anything").unwrap(), None);

        store.set("k", "v").unwrap();
        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.get("k").unwrap().as_deref(), Some("v"));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn malformed_file_is_reported_then_reset() {
        let dir = temp_dir("malformed");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("storage.json");
        std::fs::write(&path, "{not json").unwrap();

        assert!(matches!(
            FileStore::open(&path),
            Err(StorageError::Malformed { .. })
        ));
        let store = FileStore::open_or_reset(&path);
        assert_eq!(store.get(FAVORITES_KEY).unwrap(), None);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn favorites_survive_a_restart() {
        let dir = temp_dir("restart");
        let path = dir.join("storage.json");
        let dataset = dataset();

        let mut first = FavoritesStore::new(FileStore::open_or_reset(&path), MemoryFragment::default());
        first.load_initial(&dataset);
        first.toggle("le-bernardin", &dataset);
        first.toggle("lilia", &dataset);

        let mut second =
            FavoritesStore::new(FileStore::open_or_reset(&path), MemoryFragment::default());
        let favorites: Vec<_> = second.load_initial(&dataset).iter().map(str::to_string).collect();
        assert_eq!(favorites, vec!["le-bernardin", "lilia"]);

        let raw = FileStore::open(&path).unwrap().get(FAVORITES_KEY).unwrap().unwrap();
        assert_eq!(raw, r#"["le-bernardin","lilia"]"#);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
