// Export our modules for use in the terminal app, the web dashboard and tests
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod dataset;
pub mod error;
pub mod favorites;
pub mod filter;
pub mod map;
pub mod state;

pub use dataset::{Dataset, GeoPoint, MichelinAward, Restaurant};
pub use error::{DatasetError, FilterError, StorageError};
pub use favorites::{Favorites, FavoritesStore, FragmentHost, KeyValueStore};
pub use filter::{compute_visible, ActiveFilters, FilterCategory, FilterQuery, LegendFilters, LegendKey};
pub use state::{Action, Explorer, ExplorerState};
pub use map::{
    build_markers, select_backend, ActiveBackend, Connectivity, MapBackend, Marker, MarkerEvents,
    MarkerKind, SchematicBackend, Subscription, TileBackend,
};
