use nyc_rw_core::{FragmentHost, KeyValueStore, StorageError};

/// `window.localStorage`; every call fails cleanly when storage is disabled.
pub struct LocalStorageStore {
    storage: Option<web_sys::Storage>,
}

impl LocalStorageStore {
    pub fn new() -> Self {
        let storage = web_sys::window().and_then(|window| window.local_storage().ok().flatten());
        Self { storage }
    }

    fn storage(&self) -> Result<&web_sys::Storage, StorageError> {
        self.storage
            .as_ref()
            .ok_or_else(|| StorageError::Unavailable("localStorage is disabled".to_string()))
    }
}

impl Default for LocalStorageStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStore for LocalStorageStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.storage()?
            .get_item(key)
            .map_err(|e| StorageError::Unavailable(format!("{e:?}")))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.storage()?
            .set_item(key, value)
            .map_err(|e| StorageError::Write {
                key: key.to_string(),
                reason: format!("{e:?}"),
            })
    }
}

/// `window.location.hash`.
pub struct LocationHashHost;

impl FragmentHost for LocationHashHost {
    fn fragment(&self) -> String {
        web_sys::window()
            .and_then(|window| window.location().hash().ok())
            .unwrap_or_default()
    }

    fn set_fragment(&mut self, fragment: &str) {
        let Some(window) = web_sys::window() else {
            return;
        };
        // An empty hash still leaves "#" behind
        let hash = if fragment.is_empty() {
            "#".to_string()
        } else {
            format!("#{fragment}")
        };
        if let Err(e) = window.location().set_hash(&hash) {
            web_sys::console::warn_1(&format!("Failed to update the URL hash: {e:?}").into());
        }
    }
}

/// Current page URL, the base for share links.
pub fn page_url() -> String {
    web_sys::window()
        .and_then(|window| window.location().href().ok())
        .unwrap_or_default()
}
