use crate::dataset::{Dataset, Restaurant};
use crate::favorites::Favorites;
use crate::filter::{visible_indices, FilterCategory, FilterQuery, LegendKey, HAS_MENU_ACTIVE};

/// Every user-driven change to the explorer's filters or selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    SetSearch(String),
    /// Picking a search suggestion fills the search box and opens its card.
    SelectSuggestion(String),
    ToggleOption(FilterCategory, String),
    RemoveOption(FilterCategory, String),
    SetCategory(FilterCategory, Vec<String>),
    ClearCategory(FilterCategory),
    ToggleHasMenu,
    ToggleLegend(LegendKey),
    /// Standalone Michelin Star / Bib Gourmand buttons: turning one on turns the other off.
    ToggleExclusiveAward(LegendKey),
    ToggleFavoritesActive,
    Select(String),
    CloseCard,
    ResetAll,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExplorerState {
    pub query: FilterQuery,
    pub selected: Option<String>,
}

const fn award_partner(key: LegendKey) -> Option<LegendKey> {
    match key {
        LegendKey::Michelin => Some(LegendKey::Bib),
        LegendKey::Bib => Some(LegendKey::Michelin),
        _ => None,
    }
}

impl ExplorerState {
    /// Computes the complete next state for `action` in one step.
    pub fn apply(&self, action: Action, dataset: &Dataset) -> Self {
        let mut next = self.clone();
        match action {
            Action::SetSearch(term) => next.query.search = term,
            Action::SelectSuggestion(slug) => {
                if let Some(restaurant) = dataset.get(&slug) {
                    next.query.search.clone_from(&restaurant.name);
                    next.selected = Some(slug);
                }
            }
            Action::ToggleOption(category, value) => next.query.filters.toggle(category, &value),
            Action::RemoveOption(category, value) => next.query.filters.remove(category, &value),
            Action::SetCategory(category, values) => next.query.filters.set(category, values),
            Action::ClearCategory(category) => next.query.filters.clear(category),
            Action::ToggleHasMenu => next
                .query
                .filters
                .toggle(FilterCategory::HasMenu, HAS_MENU_ACTIVE),
            Action::ToggleLegend(key) => next.query.legend.toggle(key),
            Action::ToggleExclusiveAward(key) => {
                if next.query.legend.contains(key) {
                    next.query.legend.remove(key);
                } else {
                    next.query.legend.insert(key);
                    if let Some(partner) = award_partner(key) {
                        next.query.legend.remove(partner);
                    }
                }
            }
            Action::ToggleFavoritesActive => {
                next.query.favorites_active = !next.query.favorites_active;
            }
            Action::Select(slug) => {
                if dataset.get(&slug).is_some() {
                    next.selected = Some(slug);
                }
            }
            Action::CloseCard => next.selected = None,
            Action::ResetAll => next = Self::default(),
        }
        next
    }
}

/// Top-level state holder: the dataset, the current state and its visible list.
#[derive(Debug, Clone)]
pub struct Explorer {
    dataset: Dataset,
    state: ExplorerState,
    visible: Vec<usize>,
}

impl Explorer {
    pub fn new(dataset: Dataset) -> Self {
        let visible = (0..dataset.len()).collect();
        Self {
            dataset,
            state: ExplorerState::default(),
            visible,
        }
    }

    /// Applies `action` and recomputes the visible list before returning.
    pub fn dispatch(&mut self, action: Action, favorites: &Favorites) {
        let next = self.state.apply(action, &self.dataset);
        let query_changed = next.query != self.state.query;
        self.state = next;
        if query_changed {
            self.refresh(favorites);
        }
    }

    /// Recomputes after a favorites change, which the query cannot observe.
    pub fn refresh(&mut self, favorites: &Favorites) {
        self.visible = visible_indices(&self.dataset, &self.state.query, favorites);
    }

    pub const fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub const fn state(&self) -> &ExplorerState {
        &self.state
    }

    pub const fn query(&self) -> &FilterQuery {
        &self.state.query
    }

    pub fn visible(&self) -> impl Iterator<Item = &Restaurant> {
        self.visible.iter().filter_map(|index| self.dataset.at(*index))
    }

    pub fn visible_len(&self) -> usize {
        self.visible.len()
    }

    pub fn visible_at(&self, row: usize) -> Option<&Restaurant> {
        self.visible.get(row).and_then(|index| self.dataset.at(*index))
    }

    /// Row of `slug` in the visible list, if it is visible.
    pub fn visible_row(&self, slug: &str) -> Option<usize> {
        let index = self.dataset.position(slug)?;
        self.visible.iter().position(|visible| *visible == index)
    }

    pub fn selected(&self) -> Option<&Restaurant> {
        self.state
            .selected
            .as_deref()
            .and_then(|slug| self.dataset.get(slug))
    }

    pub fn applied_filters(&self) -> Vec<(FilterCategory, String)> {
        self.state.query.filters.applied()
    }
}
