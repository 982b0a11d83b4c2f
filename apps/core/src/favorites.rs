use crate::dataset::Dataset;
use crate::error::StorageError;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Durable storage key holding the JSON array of favorite slugs.
pub const FAVORITES_KEY: &str = "restaurantFavorites";

const FRAGMENT_PREFIX: &str = "favorites=";

/// Same unreserved set as JavaScript's `encodeURIComponent`.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Favorited restaurant slugs, unique, in the order they were added.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Favorites(Vec<String>);

impl Favorites {
    pub fn contains(&self, slug: &str) -> bool {
        self.0.iter().any(|favorite| favorite == slug)
    }

    /// Adds or removes `slug`; returns whether it is a favorite afterwards.
    pub fn toggle(&mut self, slug: &str) -> bool {
        if let Some(position) = self.0.iter().position(|favorite| favorite == slug) {
            self.0.remove(position);
            false
        } else {
            self.0.push(slug.to_string());
            true
        }
    }

    pub fn insert(&mut self, slug: impl Into<String>) {
        let slug = slug.into();
        if !self.contains(&slug) {
            self.0.push(slug);
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl FromIterator<String> for Favorites {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        let mut favorites = Self::default();
        for slug in iter {
            favorites.insert(slug);
        }
        favorites
    }
}

/// Durable string storage, `localStorage`-shaped.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// Where the shareable `#favorites=` fragment lives.
pub trait FragmentHost {
    /// Current fragment, with or without the leading `#`.
    fn fragment(&self) -> String;
    fn set_fragment(&mut self, fragment: &str);
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Box<T> {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set(key, value)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryFragment {
    fragment: String,
}

impl MemoryFragment {
    pub fn new(fragment: impl Into<String>) -> Self {
        Self {
            fragment: fragment.into(),
        }
    }
}

impl FragmentHost for MemoryFragment {
    fn fragment(&self) -> String {
        self.fragment.clone()
    }

    fn set_fragment(&mut self, fragment: &str) {
        self.fragment = fragment.trim_start_matches('#').to_string();
    }
}

fn fragment_segments(fragment: &str) -> impl Iterator<Item = &str> {
    fragment
        .trim_start_matches('#')
        .split('&')
        .filter(|segment| !segment.is_empty())
}

/// Rewrites the `favorites=` segment of `current` for `favorites`.
///
/// Identifiers that do not resolve to a dataset record are left out. Other
/// `&`-separated segments are kept; an empty set removes the segment.
pub fn encode_fragment(favorites: &Favorites, dataset: &Dataset, current: &str) -> String {
    let slugs: Vec<&str> = favorites
        .iter()
        .filter_map(|identifier| dataset.resolve(identifier))
        .map(|restaurant| restaurant.slug.as_str())
        .collect();

    let mut segments: Vec<String> = fragment_segments(current)
        .filter(|segment| !segment.starts_with(FRAGMENT_PREFIX))
        .map(str::to_string)
        .collect();

    if !slugs.is_empty() {
        let joined = slugs.join(",");
        let encoded = utf8_percent_encode(&joined, URI_COMPONENT);
        segments.insert(0, format!("{FRAGMENT_PREFIX}{encoded}"));
    }

    segments.join("&")
}

/// Reads the `favorites=` segment; `None` when the fragment carries none.
pub fn decode_fragment(fragment: &str, dataset: &Dataset) -> Option<Favorites> {
    let encoded =
        fragment_segments(fragment).find_map(|segment| segment.strip_prefix(FRAGMENT_PREFIX))?;
    let decoded = percent_decode_str(encoded).decode_utf8_lossy();

    Some(
        decoded
            .split(',')
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .filter_map(|token| match dataset.get(token) {
                Some(restaurant) => Some(restaurant.slug.clone()),
                None => {
                    debug!(slug = token, "dropping unknown favorite from link");
                    None
                }
            })
            .collect(),
    )
}

/// Favorites with write-through persistence to storage and the URL fragment.
#[derive(Debug)]
pub struct FavoritesStore<S, H> {
    storage: S,
    host: H,
    favorites: Favorites,
}

impl<S: KeyValueStore, H: FragmentHost> FavoritesStore<S, H> {
    pub fn new(storage: S, host: H) -> Self {
        Self {
            storage,
            host,
            favorites: Favorites::default(),
        }
    }

    /// Startup load: a `favorites=` fragment wins and overwrites storage.
    pub fn load_initial(&mut self, dataset: &Dataset) -> &Favorites {
        if let Some(from_link) = decode_fragment(&self.host.fragment(), dataset) {
            self.favorites = from_link;
            self.persist();
        } else {
            self.favorites = self.read_stored(dataset);
        }
        &self.favorites
    }

    /// Returns whether `slug` is a favorite afterwards. Unknown slugs are ignored.
    pub fn toggle(&mut self, slug: &str, dataset: &Dataset) -> bool {
        if dataset.get(slug).is_none() {
            warn!(slug, "ignoring favorite toggle for unknown restaurant");
            return false;
        }
        let favorited = self.favorites.toggle(slug);
        self.persist();
        let fragment = encode_fragment(&self.favorites, dataset, &self.host.fragment());
        self.host.set_fragment(&fragment);
        favorited
    }

    pub const fn favorites(&self) -> &Favorites {
        &self.favorites
    }

    pub fn share_fragment(&self, dataset: &Dataset) -> String {
        encode_fragment(&self.favorites, dataset, "")
    }

    pub const fn storage(&self) -> &S {
        &self.storage
    }

    pub const fn host(&self) -> &H {
        &self.host
    }

    fn persist(&mut self) {
        let json = match serde_json::to_string(&self.favorites) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "could not serialize favorites");
                return;
            }
        };
        if let Err(e) = self.storage.set(FAVORITES_KEY, &json) {
            warn!(error = %e, "favorites not persisted");
        }
    }

    fn read_stored(&self, dataset: &Dataset) -> Favorites {
        let raw = match self.storage.get(FAVORITES_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Favorites::default(),
            Err(e) => {
                warn!(error = %e, "favorites storage unreadable, starting empty");
                return Favorites::default();
            }
        };

        let stored: Vec<String> = match serde_json::from_str(&raw) {
            Ok(stored) => stored,
            Err(source) => {
                let e = StorageError::Malformed {
                    key: FAVORITES_KEY.to_string(),
                    source,
                };
                warn!(error = %e, "ignoring stored favorites");
                return Favorites::default();
            }
        };

        // Older revisions stored display names; resolve both.
        stored
            .iter()
            .filter_map(|identifier| dataset.resolve(identifier))
            .map(|restaurant| restaurant.slug.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dataset() -> Dataset {
        Dataset::from_value(json!([
            { "name": "Le Bernardin", "slug": "le-bernardin" },
            { "name": "Peter Luger", "slug": "peter-luger" },
            { "name": "Café & Co", "slug": "cafe-&-co" }
        ]))
        .unwrap()
    }

    struct FailingStore;

    impl KeyValueStore for FailingStore {
        fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Err(StorageError::Unavailable("quota exceeded".to_string()))
        }

        fn set(&mut self, key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Write {
                key: key.to_string(),
                reason: "quota exceeded".to_string(),
            })
        }
    }

    #[test]
    fn encode_percent_encodes_the_joined_list() {
        let dataset = dataset();
        let favorites: Favorites = ["le-bernardin", "cafe-&-co"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(
            encode_fragment(&favorites, &dataset, ""),
            "favorites=le-bernardin%2Ccafe-%26-co"
        );
    }

    #[test]
    fn round_trip_keeps_known_members_in_order() {
        let dataset = dataset();
        let favorites: Favorites = ["peter-luger", "ghost-kitchen", "le-bernardin"]
            .into_iter()
            .map(String::from)
            .collect();
        let fragment = encode_fragment(&favorites, &dataset, "#");
        let decoded = decode_fragment(&fragment, &dataset).unwrap();
        assert_eq!(decoded.as_slice(), ["peter-luger", "le-bernardin"]);
    }

    #[test]
    fn empty_set_removes_only_the_favorites_segment() {
        let dataset = dataset();
        let fragment = encode_fragment(
            &Favorites::default(),
            &dataset,
            "#view=map&favorites=peter-luger",
        );
        assert_eq!(fragment, "view=map");

        let favorites: Favorites = ["peter-luger".to_string()].into_iter().collect();
        assert_eq!(
            encode_fragment(&favorites, &dataset, "view=map"),
            "favorites=peter-luger&view=map"
        );
    }

    #[test]
    fn decode_ignores_unknown_slugs_and_other_segments() {
        let dataset = dataset();
        assert!(decode_fragment("#view=map", &dataset).is_none());
        assert!(decode_fragment("", &dataset).is_none());

        let decoded = decode_fragment("view=map&favorites=nope%2Cpeter-luger", &dataset).unwrap();
        assert_eq!(decoded.as_slice(), ["peter-luger"]);

        let empty = decode_fragment("favorites=", &dataset).unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn link_wins_over_storage_and_overwrites_it() {
        let dataset = dataset();
        let mut storage = MemoryStore::default();
        storage
            .set(FAVORITES_KEY, r#"["le-bernardin"]"#)
            .unwrap();
        let mut store = FavoritesStore::new(storage, MemoryFragment::new("#favorites=peter-luger"));

        assert_eq!(store.load_initial(&dataset).as_slice(), ["peter-luger"]);
        assert_eq!(
            store.storage().get(FAVORITES_KEY).unwrap().as_deref(),
            Some(r#"["peter-luger"]"#)
        );
    }

    #[test]
    fn storage_is_used_without_a_link_and_resolves_legacy_names() {
        let dataset = dataset();
        let mut storage = MemoryStore::default();
        storage
            .set(FAVORITES_KEY, r#"["Le Bernardin", "peter-luger", "Closed Place"]"#)
            .unwrap();
        let mut store = FavoritesStore::new(storage, MemoryFragment::default());

        assert_eq!(
            store.load_initial(&dataset).as_slice(),
            ["le-bernardin", "peter-luger"]
        );
    }

    #[test]
    fn malformed_storage_starts_empty() {
        let dataset = dataset();
        let mut storage = MemoryStore::default();
        storage.set(FAVORITES_KEY, "{not json").unwrap();
        let mut store = FavoritesStore::new(storage, MemoryFragment::default());
        assert!(store.load_initial(&dataset).is_empty());
    }

    #[test]
    fn toggle_writes_through_to_storage_and_fragment() {
        let dataset = dataset();
        let mut store = FavoritesStore::new(MemoryStore::default(), MemoryFragment::default());
        store.load_initial(&dataset);

        assert!(store.toggle("le-bernardin", &dataset));
        assert!(store.toggle("peter-luger", &dataset));
        assert_eq!(store.host().fragment(), "favorites=le-bernardin%2Cpeter-luger");

        assert!(!store.toggle("le-bernardin", &dataset));
        assert_eq!(store.host().fragment(), "favorites=peter-luger");
        assert_eq!(
            store.storage().get(FAVORITES_KEY).unwrap().as_deref(),
            Some(r#"["peter-luger"]"#)
        );

        assert!(!store.toggle("peter-luger", &dataset));
        assert_eq!(store.host().fragment(), "");
        assert_eq!(
            store.storage().get(FAVORITES_KEY).unwrap().as_deref(),
            Some("[]")
        );
    }

    #[test]
    fn reload_reconstructs_the_same_set() {
        let dataset = dataset();
        let mut store = FavoritesStore::new(MemoryStore::default(), MemoryFragment::default());
        store.toggle("peter-luger", &dataset);
        store.toggle("cafe-&-co", &dataset);

        let fragment = store.host().fragment();
        let storage = store.storage().clone();

        let mut from_link = FavoritesStore::new(MemoryStore::default(), MemoryFragment::new(fragment));
        let mut from_storage = FavoritesStore::new(storage, MemoryFragment::default());
        assert_eq!(
            from_link.load_initial(&dataset),
            from_storage.load_initial(&dataset)
        );
    }

    #[test]
    fn storage_failures_do_not_block_toggles() {
        let dataset = dataset();
        let mut store = FavoritesStore::new(FailingStore, MemoryFragment::default());
        assert!(store.load_initial(&dataset).is_empty());
        assert!(store.toggle("peter-luger", &dataset));
        assert!(store.favorites().contains("peter-luger"));
        assert_eq!(store.host().fragment(), "favorites=peter-luger");
    }

    #[test]
    fn unknown_slug_toggle_is_ignored() {
        let dataset = dataset();
        let mut store = FavoritesStore::new(MemoryStore::default(), MemoryFragment::default());
        assert!(!store.toggle("gone", &dataset));
        assert!(store.favorites().is_empty());
    }
}
