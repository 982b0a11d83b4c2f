//! Marker projection for the restaurant map.
//!
//! Two backends share one trait: a networked slippy-tile backend using Web
//! Mercator, and a schematic fallback that projects latitude/longitude
//! linearly against fixed NYC bounds and never touches the network. Hosts
//! pick one with [`select_backend`] from their connectivity check and draw
//! the [`Marker`]s however their renderer likes.

use crate::dataset::{GeoPoint, Restaurant};
use crate::favorites::Favorites;
use std::cell::RefCell;
use std::f64::consts::PI;
use std::rc::{Rc, Weak};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

pub const NYC_BOUNDS: Bounds = Bounds {
    min_lat: 40.4774,
    max_lat: 40.9176,
    min_lng: -74.2591,
    max_lng: -73.7004,
};

/// Map centre used by the networked provider.
pub const NYC_CENTER: GeoPoint = GeoPoint {
    latitude: 40.744_293,
    longitude: -73.979_545,
};

pub const DEFAULT_TILE_TEMPLATE: &str = "https://tile.openstreetmap.org/{z}/{x}/{y}.png";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerKind {
    Michelin,
    Bib,
    Nyt,
    Regular,
}

impl MarkerKind {
    /// Michelin stars outrank Bib Gourmand, which outranks the NYT list.
    pub fn for_restaurant(restaurant: &Restaurant) -> Self {
        if restaurant.is_michelin_starred() {
            Self::Michelin
        } else if restaurant.is_bib_gourmand() {
            Self::Bib
        } else if restaurant.is_nyt_top_100() {
            Self::Nyt
        } else {
            Self::Regular
        }
    }

    pub const fn hex(self) -> &'static str {
        match self {
            Self::Michelin => "#C81224",
            Self::Bib => "#f9a83d",
            Self::Nyt => "#FF69B4",
            Self::Regular => "#000000",
        }
    }

    pub const fn rgb(self) -> (u8, u8, u8) {
        match self {
            Self::Michelin => (200, 18, 36),
            Self::Bib => (249, 168, 61),
            Self::Nyt => (255, 105, 180),
            Self::Regular => (0, 0, 0),
        }
    }
}

/// A pin in unit-square map space: `x` grows east, `y` grows north.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub slug: String,
    pub x: f64,
    pub y: f64,
    pub kind: MarkerKind,
    pub favorite: bool,
}

pub trait MapBackend {
    fn name(&self) -> &'static str;
    fn requires_network(&self) -> bool;
    /// Unit-square position for `point`, or `None` when it cannot be drawn.
    fn project(&self, point: GeoPoint) -> Option<(f64, f64)>;
}

/// Offline fallback: linear projection against [`NYC_BOUNDS`], clamped to the frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchematicBackend;

impl MapBackend for SchematicBackend {
    fn name(&self) -> &'static str {
        "schematic"
    }

    fn requires_network(&self) -> bool {
        false
    }

    fn project(&self, point: GeoPoint) -> Option<(f64, f64)> {
        let b = NYC_BOUNDS;
        let x = (point.longitude - b.min_lng) / (b.max_lng - b.min_lng);
        let y = (point.latitude - b.min_lat) / (b.max_lat - b.min_lat);
        Some((x.clamp(0.0, 1.0), y.clamp(0.0, 1.0)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileCoord {
    pub x: u32,
    pub y: u32,
    pub z: u8,
}

/// World-space Web Mercator coordinates in 0..1, `y` growing south.
fn mercator(point: GeoPoint) -> (f64, f64) {
    let lat = point.latitude.clamp(-85.051_128, 85.051_128).to_radians();
    let x = (point.longitude + 180.0) / 360.0;
    let y = (1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / PI) / 2.0;
    (x, y)
}

/// Networked slippy-tile provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileBackend {
    template: String,
    zoom: u8,
}

impl Default for TileBackend {
    fn default() -> Self {
        Self::new(DEFAULT_TILE_TEMPLATE, 11)
    }
}

impl TileBackend {
    pub fn new(template: impl Into<String>, zoom: u8) -> Self {
        Self {
            template: template.into(),
            zoom: zoom.min(19),
        }
    }

    pub const fn zoom(&self) -> u8 {
        self.zoom
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn tile_url(&self, tile: TileCoord) -> String {
        self.template
            .replace("{z}", &tile.z.to_string())
            .replace("{x}", &tile.x.to_string())
            .replace("{y}", &tile.y.to_string())
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn tile_for(&self, point: GeoPoint) -> TileCoord {
        let (x, y) = mercator(point);
        let n = f64::from(1_u32 << self.zoom);
        let max = (1_u32 << self.zoom) - 1;
        TileCoord {
            x: ((x * n).floor() as u32).min(max),
            y: ((y * n).floor() as u32).min(max),
            z: self.zoom,
        }
    }

    /// Every tile covering [`NYC_BOUNDS`] at the backend's zoom.
    pub fn tiles_for_bounds(&self) -> Vec<TileCoord> {
        let b = NYC_BOUNDS;
        let north_west = self.tile_for(GeoPoint {
            latitude: b.max_lat,
            longitude: b.min_lng,
        });
        let south_east = self.tile_for(GeoPoint {
            latitude: b.min_lat,
            longitude: b.max_lng,
        });
        (north_west.y..=south_east.y)
            .flat_map(|y| {
                (north_west.x..=south_east.x).map(move |x| TileCoord {
                    x,
                    y,
                    z: self.zoom,
                })
            })
            .collect()
    }
}

impl MapBackend for TileBackend {
    fn name(&self) -> &'static str {
        "tiles"
    }

    fn requires_network(&self) -> bool {
        true
    }

    fn project(&self, point: GeoPoint) -> Option<(f64, f64)> {
        let b = NYC_BOUNDS;
        let (x0, y0) = mercator(GeoPoint {
            latitude: b.max_lat,
            longitude: b.min_lng,
        });
        let (x1, y1) = mercator(GeoPoint {
            latitude: b.min_lat,
            longitude: b.max_lng,
        });
        let (x, y) = mercator(point);
        let u = (x - x0) / (x1 - x0);
        let v = (y1 - y) / (y1 - y0);
        if (0.0..=1.0).contains(&u) && (0.0..=1.0).contains(&v) {
            Some((u, v))
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connectivity {
    Online,
    Offline,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActiveBackend {
    Tiles(TileBackend),
    Schematic(SchematicBackend),
}

impl MapBackend for ActiveBackend {
    fn name(&self) -> &'static str {
        match self {
            Self::Tiles(backend) => backend.name(),
            Self::Schematic(backend) => backend.name(),
        }
    }

    fn requires_network(&self) -> bool {
        match self {
            Self::Tiles(backend) => backend.requires_network(),
            Self::Schematic(backend) => backend.requires_network(),
        }
    }

    fn project(&self, point: GeoPoint) -> Option<(f64, f64)> {
        match self {
            Self::Tiles(backend) => backend.project(point),
            Self::Schematic(backend) => backend.project(point),
        }
    }
}

pub fn select_backend(connectivity: Connectivity, tiles: TileBackend) -> ActiveBackend {
    match connectivity {
        Connectivity::Online => ActiveBackend::Tiles(tiles),
        Connectivity::Offline => ActiveBackend::Schematic(SchematicBackend),
    }
}

/// One marker per restaurant with usable coordinates, in input order.
pub fn build_markers<'a, I>(backend: &dyn MapBackend, restaurants: I, favorites: &Favorites) -> Vec<Marker>
where
    I: IntoIterator<Item = &'a Restaurant>,
{
    restaurants
        .into_iter()
        .filter_map(|restaurant| {
            let (x, y) = backend.project(restaurant.location?)?;
            Some(Marker {
                slug: restaurant.slug.clone(),
                x,
                y,
                kind: MarkerKind::for_restaurant(restaurant),
                favorite: favorites.contains(&restaurant.slug),
            })
        })
        .collect()
}

/// Closest marker to (`x`, `y`) within `radius`, in unit-square distance.
pub fn nearest_marker(markers: &[Marker], x: f64, y: f64, radius: f64) -> Option<&Marker> {
    markers
        .iter()
        .map(|marker| ((marker.x - x).hypot(marker.y - y), marker))
        .filter(|(distance, _)| *distance <= radius)
        .min_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, marker)| marker)
}

type Listener = Box<dyn FnMut(&str)>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: Vec<(u64, Listener)>,
    dropped_while_emitting: Vec<u64>,
}

/// Marker click notifications scoped to their subscribers' lifetimes.
#[derive(Default, Clone)]
pub struct MarkerEvents {
    registry: Rc<RefCell<Registry>>,
}

/// Keeps a listener registered; dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    id: u64,
    registry: Weak<RefCell<Registry>>,
}

impl MarkerEvents {
    pub fn subscribe(&self, listener: impl FnMut(&str) + 'static) -> Subscription {
        let mut registry = self.registry.borrow_mut();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.listeners.push((id, Box::new(listener)));
        Subscription {
            id,
            registry: Rc::downgrade(&self.registry),
        }
    }

    /// Notifies every live subscriber; returns how many were called.
    pub fn emit_click(&self, slug: &str) -> usize {
        let mut listeners = std::mem::take(&mut self.registry.borrow_mut().listeners);
        for (_, listener) in &mut listeners {
            listener(slug);
        }
        let called = listeners.len();

        let mut registry = self.registry.borrow_mut();
        let dropped = std::mem::take(&mut registry.dropped_while_emitting);
        listeners.retain(|(id, _)| !dropped.contains(id));
        listeners.append(&mut registry.listeners);
        registry.listeners = listeners;
        called
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry.borrow().listeners.len()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let Some(registry) = self.registry.upgrade() else {
            return;
        };
        let Ok(mut registry) = registry.try_borrow_mut() else {
            return;
        };
        let before = registry.listeners.len();
        registry.listeners.retain(|(id, _)| *id != self.id);
        if registry.listeners.len() == before {
            registry.dropped_while_emitting.push(self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Dataset;
    use serde_json::json;

    fn dataset() -> Dataset {
        Dataset::from_value(json!([
            { "name": "Midtown", "slug": "midtown", "latitude": 40.7549, "longitude": -73.984, "michelin_award": "THREE_STARS" },
            { "name": "No Coordinates", "slug": "nowhere", "michelin_award": "BIB_GOURMAND" },
            { "name": "Far Away", "slug": "far", "latitude": 34.05, "longitude": -118.24 },
            { "name": "Flushing", "slug": "flushing", "latitude": 40.7675, "longitude": -73.833, "nyttop100_rank": 40 }
        ]))
        .unwrap()
    }

    #[test]
    fn schematic_projection_stays_inside_the_frame() {
        let backend = SchematicBackend;
        for (lat, lng) in [(40.7, -74.0), (10.0, 50.0), (-80.0, -170.0), (40.9176, -73.7004)] {
            let (x, y) = backend.project(GeoPoint::new(lat, lng).unwrap()).unwrap();
            assert!((0.0..=1.0).contains(&x));
            assert!((0.0..=1.0).contains(&y));
        }
        let (x, y) = backend
            .project(GeoPoint::new(NYC_BOUNDS.min_lat, NYC_BOUNDS.min_lng).unwrap())
            .unwrap();
        assert!(x.abs() < f64::EPSILON && y.abs() < f64::EPSILON);
    }

    #[test]
    fn tile_projection_drops_points_outside_the_city() {
        let dataset = dataset();
        let tiles = TileBackend::default();
        let markers = build_markers(&tiles, &dataset, &Favorites::default());
        let slugs: Vec<_> = markers.iter().map(|m| m.slug.as_str()).collect();
        assert_eq!(slugs, vec!["midtown", "flushing"]);
    }

    #[test]
    fn markers_skip_missing_coordinates_and_flag_favorites() {
        let dataset = dataset();
        let favorites: Favorites = ["flushing".to_string()].into_iter().collect();
        let markers = build_markers(&SchematicBackend, &dataset, &favorites);
        assert_eq!(markers.len(), 3);
        assert_eq!(markers[0].kind, MarkerKind::Michelin);
        assert!(!markers[0].favorite);
        assert_eq!(markers[2].kind, MarkerKind::Nyt);
        assert!(markers[2].favorite);
    }

    #[test]
    fn offline_selects_the_schematic_fallback() {
        let backend = select_backend(Connectivity::Offline, TileBackend::default());
        assert_eq!(backend.name(), "schematic");
        assert!(!backend.requires_network());

        let backend = select_backend(Connectivity::Online, TileBackend::default());
        assert_eq!(backend.name(), "tiles");
        assert!(backend.requires_network());
    }

    #[test]
    fn tile_urls_cover_the_city() {
        let backend = TileBackend::new("https://tiles.example/{z}/{x}/{y}.png", 10);
        let tiles = backend.tiles_for_bounds();
        assert!(!tiles.is_empty());
        assert!(tiles.contains(&backend.tile_for(NYC_CENTER)));
        assert_eq!(
            backend.tile_url(TileCoord { x: 301, y: 385, z: 10 }),
            "https://tiles.example/10/301/385.png"
        );
    }

    #[test]
    fn nearest_marker_respects_radius() {
        let markers = build_markers(&SchematicBackend, &dataset(), &Favorites::default());
        let midtown = &markers[0];
        let hit = nearest_marker(&markers, midtown.x + 0.01, midtown.y, 0.05).unwrap();
        assert_eq!(hit.slug, "midtown");
        assert!(nearest_marker(&markers, -1.0, -1.0, 0.01).is_none());

        // "Far Away" clamps to the origin; a pick exactly one radius out still lands
        let edge = nearest_marker(&markers, 0.0, -0.5, 0.5).unwrap();
        assert_eq!(edge.slug, "far");
        assert!(nearest_marker(&markers, 0.0, -0.5, 0.49).is_none());
    }

    #[test]
    fn dropped_subscriptions_stop_receiving_clicks() {
        let events = MarkerEvents::default();
        let clicks = Rc::new(RefCell::new(Vec::new()));

        let first = events.subscribe({
            let clicks = clicks.clone();
            move |slug| clicks.borrow_mut().push(format!("first:{slug}"))
        });
        let _second = events.subscribe({
            let clicks = clicks.clone();
            move |slug| clicks.borrow_mut().push(format!("second:{slug}"))
        });

        assert_eq!(events.emit_click("lilia"), 2);
        drop(first);
        assert_eq!(events.subscriber_count(), 1);
        assert_eq!(events.emit_click("dhamaka"), 1);
        assert_eq!(
            *clicks.borrow(),
            vec!["first:lilia", "second:lilia", "second:dhamaka"]
        );
    }
}
