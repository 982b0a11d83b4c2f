use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use nyc_rw_core::favorites::MemoryFragment;
use nyc_rw_core::filter::{category_options, legend_counts, search_suggestions, FilterOption};
use nyc_rw_core::map::{build_markers, nearest_marker, ActiveBackend, MapBackend, Marker, MarkerEvents, Subscription};
use nyc_rw_core::{
    Action, Dataset, Explorer, FavoritesStore, FilterCategory, KeyValueStore, LegendKey, Restaurant,
};
use ratatui::layout::Rect;
use tracing::{debug, info};

pub type Favorites = FavoritesStore<Box<dyn KeyValueStore>, MemoryFragment>;

pub const SUGGESTION_LIMIT: usize = 5;
/// Marker pick radius in unit-square map space.
const PICK_RADIUS: f64 = 0.04;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum AppScreen {
    Explore,
    Filters,
    Card,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum FilterFocus {
    Categories,
    Options,
}

/// Independently rendered screen areas; a panic in one leaves the others drawing.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy)]
pub enum Region {
    Header,
    List,
    Map,
    Legend,
    Card,
    Filters,
}

impl Region {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Header => "Search",
            Self::List => "Restaurants",
            Self::Map => "Map",
            Self::Legend => "Legend",
            Self::Card => "Details",
            Self::Filters => "Filters",
        }
    }
}

pub struct App {
    pub running: bool,
    pub explorer: Explorer,
    pub favorites: Favorites,
    pub screen: AppScreen,
    pub show_help: bool,
    pub selected_row: usize,
    pub search_editing: bool,
    pub search_input: String,
    pub suggestion_index: Option<usize>,
    pub filter_focus: FilterFocus,
    pub filter_category_index: usize,
    pub filter_option_index: usize,
    pub status_message: String,
    pub map: ActiveBackend,
    pub markers: Vec<Marker>,
    /// Where the map was last drawn, for mouse picking.
    pub map_area: Cell<Rect>,
    pub render_faults: RefCell<BTreeMap<Region, String>>,
    share_base: String,
    options: Vec<(FilterCategory, Vec<FilterOption>)>,
    marker_events: MarkerEvents,
    clicked: Rc<RefCell<Vec<String>>>,
    _marker_subscription: Subscription,
}

impl App {
    pub fn new(dataset: Dataset, mut favorites: Favorites, map: ActiveBackend, share_base: &str) -> Self {
        favorites.load_initial(&dataset);
        let options = FilterCategory::ALL
            .iter()
            .map(|category| (*category, category_options(&dataset, *category)))
            .collect();

        let marker_events = MarkerEvents::default();
        let clicked = Rc::new(RefCell::new(Vec::new()));
        let subscription = marker_events.subscribe({
            let clicked = clicked.clone();
            move |slug| clicked.borrow_mut().push(slug.to_string())
        });

        let mut explorer = Explorer::new(dataset);
        explorer.refresh(favorites.favorites());

        info!(
            restaurants = explorer.dataset().len(),
            favorites = favorites.favorites().len(),
            map = map.name(),
            "explorer ready"
        );

        let mut app = Self {
            running: true,
            explorer,
            favorites,
            screen: AppScreen::Explore,
            show_help: false,
            selected_row: 0,
            search_editing: false,
            search_input: String::new(),
            suggestion_index: None,
            filter_focus: FilterFocus::Categories,
            filter_category_index: 0,
            filter_option_index: 0,
            status_message: String::new(),
            map,
            markers: Vec::new(),
            map_area: Cell::new(Rect::default()),
            render_faults: RefCell::new(BTreeMap::new()),
            share_base: share_base.split('#').next().unwrap_or_default().to_string(),
            options,
            marker_events,
            clicked,
            _marker_subscription: subscription,
        };
        app.rebuild_markers();
        app
    }

    pub fn dataset(&self) -> &Dataset {
        self.explorer.dataset()
    }

    /// Applies `action`; the visible list and markers are current when this returns.
    pub fn dispatch(&mut self, action: Action) {
        debug!(?action, "dispatch");
        self.explorer.dispatch(action, self.favorites.favorites());
        self.after_change();
    }

    fn after_change(&mut self) {
        let len = self.explorer.visible_len();
        if self.selected_row >= len {
            self.selected_row = len.saturating_sub(1);
        }
        self.rebuild_markers();
    }

    fn rebuild_markers(&mut self) {
        self.markers = build_markers(&self.map, self.explorer.visible(), self.favorites.favorites());
    }

    /// Swaps the map renderer after a connectivity change. Returns whether it changed.
    pub fn set_map_backend(&mut self, map: ActiveBackend) -> bool {
        if self.map == map {
            return false;
        }
        info!(from = self.map.name(), to = map.name(), "map backend switched");
        self.map = map;
        self.rebuild_markers();
        self.status_message = if self.map.requires_network() {
            "Back online: showing the tile map".to_string()
        } else {
            "Offline: showing the schematic map".to_string()
        };
        true
    }

    /// The card's restaurant when a card is open, otherwise the highlighted row.
    pub fn focused(&self) -> Option<&Restaurant> {
        if self.screen == AppScreen::Card {
            self.explorer.selected()
        } else {
            self.explorer.visible_at(self.selected_row)
        }
    }

    pub fn open_card(&mut self) {
        if let Some(slug) = self.explorer.visible_at(self.selected_row).map(|r| r.slug.clone()) {
            self.select(slug);
        }
    }

    fn select(&mut self, slug: String) {
        self.dispatch(Action::Select(slug));
        if self.explorer.selected().is_some() {
            self.screen = AppScreen::Card;
            if let Some(row) = self
                .explorer
                .selected()
                .and_then(|r| self.explorer.visible_row(&r.slug))
            {
                self.selected_row = row;
            }
        }
    }

    pub fn close_card(&mut self) {
        self.dispatch(Action::CloseCard);
        self.screen = AppScreen::Explore;
    }

    pub fn toggle_favorite(&mut self) {
        let Some((slug, name)) = self.focused().map(|r| (r.slug.clone(), r.name.clone())) else {
            return;
        };
        let dataset = self.explorer.dataset();
        let added = self.favorites.toggle(&slug, dataset);
        self.explorer.refresh(self.favorites.favorites());
        self.after_change();
        self.status_message = if added {
            format!("Added {name} to favorites")
        } else {
            format!("Removed {name} from favorites")
        };
    }

    pub fn is_favorite(&self, slug: &str) -> bool {
        self.favorites.favorites().contains(slug)
    }

    pub fn share_link(&self) -> String {
        let fragment = self.favorites.share_fragment(self.explorer.dataset());
        if fragment.is_empty() {
            self.share_base.clone()
        } else {
            format!("{}#{fragment}", self.share_base)
        }
    }

    pub fn show_share_link(&mut self) {
        self.status_message = if self.favorites.favorites().is_empty() {
            "No favorites to share yet".to_string()
        } else {
            format!("Share link: {}", self.share_link())
        };
    }

    /// Clears every filter, the search and the selection; favorites stay.
    pub fn reset_all(&mut self) {
        self.dispatch(Action::ResetAll);
        self.search_input.clear();
        self.search_editing = false;
        self.suggestion_index = None;
        self.selected_row = 0;
        self.screen = AppScreen::Explore;
        self.status_message = "All filters cleared".to_string();
    }

    pub fn set_search(&mut self, term: String) {
        self.search_input.clone_from(&term);
        self.suggestion_index = None;
        self.dispatch(Action::SetSearch(term));
    }

    pub fn suggestions(&self) -> Vec<&Restaurant> {
        if !self.search_editing {
            return Vec::new();
        }
        search_suggestions(self.explorer.dataset(), &self.search_input, SUGGESTION_LIMIT)
    }

    pub fn accept_suggestion(&mut self) -> bool {
        let Some(slug) = self
            .suggestion_index
            .and_then(|index| self.suggestions().get(index).map(|r| r.slug.clone()))
        else {
            return false;
        };
        self.dispatch(Action::SelectSuggestion(slug));
        self.search_input.clone_from(&self.explorer.query().search);
        self.search_editing = false;
        self.suggestion_index = None;
        if let Some(slug) = self.explorer.state().selected.clone() {
            self.select(slug);
        }
        true
    }

    pub fn current_category(&self) -> FilterCategory {
        FilterCategory::ALL[self.filter_category_index % FilterCategory::ALL.len()]
    }

    pub fn options_for(&self, category: FilterCategory) -> &[FilterOption] {
        self.options
            .iter()
            .find(|(c, _)| *c == category)
            .map_or(&[], |(_, options)| options.as_slice())
    }

    pub fn toggle_current_option(&mut self) {
        let category = self.current_category();
        if category.is_toggle() {
            self.dispatch(Action::ToggleHasMenu);
            return;
        }
        let Some(value) = self
            .options_for(category)
            .get(self.filter_option_index)
            .map(|option| option.value.clone())
        else {
            return;
        };
        self.dispatch(Action::ToggleOption(category, value));
    }

    /// Drops the most recently listed chip from the applied filters.
    pub fn remove_last_chip(&mut self) {
        if let Some((category, value)) = self.explorer.applied_filters().pop() {
            self.status_message = format!("Removed {}: {value}", category.label());
            self.dispatch(Action::RemoveOption(category, value));
        }
    }

    pub fn legend_counts(&self) -> Vec<(LegendKey, usize)> {
        legend_counts(self.explorer.dataset(), self.favorites.favorites())
    }

    /// Picks the marker nearest a terminal cell inside the last drawn map area.
    pub fn click_map(&mut self, column: u16, row: u16) {
        let area = self.map_area.get();
        if area.width == 0 || area.height == 0 || !area.contains((column, row).into()) {
            return;
        }
        let x = (f64::from(column - area.x) + 0.5) / f64::from(area.width);
        let y = 1.0 - (f64::from(row - area.y) + 0.5) / f64::from(area.height);
        let Some(slug) = nearest_marker(&self.markers, x, y, PICK_RADIUS).map(|m| m.slug.clone()) else {
            return;
        };
        self.marker_events.emit_click(&slug);
        let clicked: Vec<String> = self.clicked.borrow_mut().drain(..).collect();
        if let Some(slug) = clicked.into_iter().last() {
            self.select(slug);
        }
    }

    pub fn record_fault(&self, region: Region, message: String) {
        self.render_faults.borrow_mut().insert(region, message);
    }

    pub fn has_faults(&self) -> bool {
        !self.render_faults.borrow().is_empty()
    }

    pub fn retry_faults(&mut self) {
        self.render_faults.borrow_mut().clear();
        self.status_message = "Retrying failed panels".to_string();
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use nyc_rw_core::map::SchematicBackend;
    use nyc_rw_core::FragmentHost;

    #[test]
    fn link_favorites_load_on_startup() {
        let app = app_with_link("favorites=lilia%2Cdhamaka");
        assert!(app.is_favorite("lilia"));
        assert!(app.is_favorite("dhamaka"));
        assert_eq!(
            app.share_link(),
            "http://localhost:5173/#favorites=lilia%2Cdhamaka"
        );
    }

    #[test]
    fn toggling_a_favorite_updates_the_favorites_only_view() {
        let mut app = app();
        app.dispatch(Action::ToggleFavoritesActive);
        assert_eq!(app.explorer.visible_len(), 0);

        app.dispatch(Action::ToggleFavoritesActive);
        app.selected_row = 2;
        app.toggle_favorite();
        assert_eq!(app.status_message, "Added Lilia to favorites");

        app.dispatch(Action::ToggleFavoritesActive);
        let visible: Vec<_> = app.explorer.visible().map(|r| r.slug.as_str()).collect();
        assert_eq!(visible, vec!["lilia"]);
        assert!(app.markers.iter().all(|m| m.favorite));
        assert_eq!(app.favorites.host().fragment(), "favorites=lilia");
    }

    #[test]
    fn cursor_is_clamped_when_the_list_shrinks() {
        let mut app = app();
        app.selected_row = 3;
        app.set_search("lil".to_string());
        assert_eq!(app.selected_row, 0);
        assert_eq!(app.focused().map(|r| r.slug.as_str()), Some("lilia"));
    }

    #[test]
    fn markers_skip_unpinnable_restaurants() {
        let app = app();
        assert_eq!(app.markers.len(), 3);
        assert!(app.markers.iter().all(|m| m.slug != "deli"));
    }

    #[test]
    fn accepting_a_suggestion_opens_its_card() {
        let mut app = app();
        app.search_editing = true;
        app.search_input = "dha".to_string();
        app.suggestion_index = Some(0);
        assert!(app.accept_suggestion());
        assert_eq!(app.screen, AppScreen::Card);
        assert_eq!(app.search_input, "Dhamaka");
        assert_eq!(app.focused().map(|r| r.slug.as_str()), Some("dhamaka"));
    }

    #[test]
    fn map_click_selects_the_nearest_marker() {
        let mut app = app();
        app.map_area.set(Rect::new(0, 0, 100, 50));
        let lilia = app.markers.iter().find(|m| m.slug == "lilia").cloned().unwrap();
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let (column, row) = ((lilia.x * 100.0) as u16, ((1.0 - lilia.y) * 50.0) as u16);

        app.click_map(column, row);
        assert_eq!(app.screen, AppScreen::Card);
        assert_eq!(app.focused().map(|r| r.slug.as_str()), Some("lilia"));

        app.close_card();
        app.click_map(200, 200);
        assert_eq!(app.screen, AppScreen::Explore);
    }

    #[test]
    fn reset_all_keeps_favorites() {
        let mut app = app_with_link("favorites=deli");
        app.set_search("x".to_string());
        app.dispatch(Action::ToggleLegend(LegendKey::Nyt));
        app.reset_all();
        assert_eq!(app.explorer.visible_len(), 4);
        assert!(app.search_input.is_empty());
        assert!(app.is_favorite("deli"));
    }

    #[test]
    fn removing_the_last_chip_relaxes_the_filter() {
        let mut app = app();
        app.dispatch(Action::ToggleOption(FilterCategory::Cuisine, "Italian".into()));
        app.dispatch(Action::ToggleOption(FilterCategory::MealTypes, "Dinner".into()));
        assert_eq!(app.explorer.visible_len(), 1);

        app.remove_last_chip();
        assert_eq!(app.explorer.applied_filters().len(), 1);
        app.remove_last_chip();
        assert_eq!(app.explorer.visible_len(), 4);
    }

    #[test]
    fn connectivity_changes_swap_the_map_backend() {
        let mut app = app();
        let tiles = ActiveBackend::Tiles(nyc_rw_core::TileBackend::default());

        assert!(app.set_map_backend(tiles.clone()));
        assert_eq!(app.map.name(), "tiles");
        assert_eq!(app.markers.len(), 3);
        assert_eq!(app.status_message, "Back online: showing the tile map");
        assert!(!app.set_map_backend(tiles));

        assert!(app.set_map_backend(ActiveBackend::Schematic(SchematicBackend)));
        assert_eq!(app.status_message, "Offline: showing the schematic map");
    }

    #[test]
    fn empty_dataset_still_builds_an_explorer() {
        let store: Box<dyn KeyValueStore> = Box::new(nyc_rw_core::favorites::MemoryStore::default());
        let favorites = FavoritesStore::new(store, MemoryFragment::new("favorites=lilia"));
        let mut app = App::new(
            Dataset::default(),
            favorites,
            ActiveBackend::Schematic(SchematicBackend),
            "http://localhost:5173/",
        );
        assert_eq!(app.explorer.visible_len(), 0);
        assert!(app.markers.is_empty());
        app.toggle_favorite();
        app.open_card();
        assert!(app.focused().is_none());
    }
}
