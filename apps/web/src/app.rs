use std::cell::RefCell;

use nyc_rw_core::filter::{category_options, search_suggestions, FilterOption};
use nyc_rw_core::{
    build_markers, Action, Dataset, Explorer, FavoritesStore, FilterCategory, FragmentHost,
    KeyValueStore, LegendKey, Marker, Restaurant, SchematicBackend,
};
use ratzilla::event::KeyCode;

pub const SUGGESTION_LIMIT: usize = 5;

/// Category list on the left, option list on the right.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Picker {
    pub category_index: usize,
    pub option_index: usize,
    pub options_focused: bool,
}

pub struct WebApp<S, H> {
    pub explorer: Explorer,
    pub favorites: FavoritesStore<S, H>,
    pub markers: Vec<Marker>,
    pub selected_row: usize,
    pub search_editing: bool,
    pub suggestion_index: Option<usize>,
    pub picker: Option<Picker>,
    pub status: String,
    /// Set by the draw guard when a frame panics; cleared by `r`.
    pub fault: RefCell<Option<String>>,
    share_base: String,
    options: Vec<(FilterCategory, Vec<FilterOption>)>,
}

impl<S: KeyValueStore, H: FragmentHost> WebApp<S, H> {
    pub fn new(dataset: Dataset, mut favorites: FavoritesStore<S, H>, share_base: &str) -> Self {
        favorites.load_initial(&dataset);
        let options = FilterCategory::ALL
            .iter()
            .map(|category| (*category, category_options(&dataset, *category)))
            .collect();
        let mut explorer = Explorer::new(dataset);
        explorer.refresh(favorites.favorites());

        let mut app = Self {
            explorer,
            favorites,
            markers: Vec::new(),
            selected_row: 0,
            search_editing: false,
            suggestion_index: None,
            picker: None,
            status: String::new(),
            fault: RefCell::new(None),
            share_base: share_base.split('#').next().unwrap_or_default().to_string(),
            options,
        };
        app.rebuild_markers();
        app
    }

    pub fn dispatch(&mut self, action: Action) {
        self.explorer.dispatch(action, self.favorites.favorites());
        self.clamp_row();
        self.rebuild_markers();
    }

    fn clamp_row(&mut self) {
        self.selected_row = self
            .selected_row
            .min(self.explorer.visible_len().saturating_sub(1));
    }

    fn rebuild_markers(&mut self) {
        self.markers = build_markers(
            &SchematicBackend,
            self.explorer.visible(),
            self.favorites.favorites(),
        );
    }

    pub fn focused(&self) -> Option<&Restaurant> {
        self.explorer.visible_at(self.selected_row)
    }

    pub fn is_favorite(&self, slug: &str) -> bool {
        self.favorites.favorites().contains(slug)
    }

    pub fn toggle_favorite(&mut self) {
        let Some((slug, name)) = self.focused().map(|r| (r.slug.clone(), r.name.clone())) else {
            return;
        };
        let favorited = self.favorites.toggle(&slug, self.explorer.dataset());
        self.explorer.refresh(self.favorites.favorites());
        self.clamp_row();
        self.rebuild_markers();
        self.status = if favorited {
            format!("Added {name} to favorites")
        } else {
            format!("Removed {name} from favorites")
        };
    }

    pub fn share(&mut self) {
        self.status = if self.favorites.favorites().is_empty() {
            "No favorites to share yet".to_string()
        } else {
            let fragment = self.favorites.share_fragment(self.explorer.dataset());
            format!("Share link: {}#{fragment}", self.share_base)
        };
    }

    pub fn suggestions(&self) -> Vec<&Restaurant> {
        if !self.search_editing {
            return Vec::new();
        }
        search_suggestions(
            self.explorer.dataset(),
            &self.explorer.query().search,
            SUGGESTION_LIMIT,
        )
    }

    pub fn options_for(&self, category: FilterCategory) -> &[FilterOption] {
        self.options
            .iter()
            .find(|(c, _)| *c == category)
            .map_or(&[], |(_, options)| options.as_slice())
    }

    pub fn picker_category(&self) -> Option<FilterCategory> {
        self.picker
            .map(|picker| FilterCategory::ALL[picker.category_index % FilterCategory::ALL.len()])
    }

    pub fn handle_key(&mut self, code: KeyCode) {
        if self.fault.borrow().is_some() {
            if matches!(code, KeyCode::Char('r')) {
                *self.fault.borrow_mut() = None;
                self.status = "Retrying".to_string();
            }
            return;
        }
        if self.search_editing {
            self.handle_search_key(code);
        } else if self.picker.is_some() {
            self.handle_picker_key(code);
        } else {
            self.handle_explore_key(code);
        }
    }

    fn handle_explore_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Up => self.selected_row = self.selected_row.saturating_sub(1),
            KeyCode::Down => {
                if self.selected_row + 1 < self.explorer.visible_len() {
                    self.selected_row += 1;
                }
            }
            KeyCode::Enter => {
                if let Some(slug) = self.focused().map(|r| r.slug.clone()) {
                    self.dispatch(Action::Select(slug));
                }
            }
            KeyCode::Esc => self.dispatch(Action::CloseCard),
            KeyCode::Char('/') => {
                self.search_editing = true;
                self.suggestion_index = None;
            }
            KeyCode::Char('c') => self.picker = Some(Picker::default()),
            KeyCode::Char('f') => self.toggle_favorite(),
            KeyCode::Char('F') => self.dispatch(Action::ToggleFavoritesActive),
            KeyCode::Char('m') => self.dispatch(Action::ToggleExclusiveAward(LegendKey::Michelin)),
            KeyCode::Char('b') => self.dispatch(Action::ToggleExclusiveAward(LegendKey::Bib)),
            KeyCode::Char('h') => self.dispatch(Action::ToggleHasMenu),
            KeyCode::Char('x') => {
                self.dispatch(Action::ResetAll);
                self.status = "All filters cleared".to_string();
            }
            KeyCode::Char('s') => self.share(),
            KeyCode::Char(c @ '1'..='5') => {
                let index = c as usize - '1' as usize;
                if let Some(key) = LegendKey::ALL.get(index) {
                    self.dispatch(Action::ToggleLegend(*key));
                }
            }
            _ => {}
        }
    }

    fn handle_search_key(&mut self, code: KeyCode) {
        let mut term = self.explorer.query().search.clone();
        match code {
            KeyCode::Esc => {
                self.search_editing = false;
                self.suggestion_index = None;
                return;
            }
            KeyCode::Tab | KeyCode::Down => {
                let count = self.suggestions().len();
                if count > 0 {
                    self.suggestion_index = Some(self.suggestion_index.map_or(0, |i| (i + 1) % count));
                }
                return;
            }
            KeyCode::Up => {
                let count = self.suggestions().len();
                if count > 0 {
                    self.suggestion_index =
                        Some(self.suggestion_index.map_or(count - 1, |i| (i + count - 1) % count));
                }
                return;
            }
            KeyCode::Enter => {
                let picked = self
                    .suggestion_index
                    .and_then(|index| self.suggestions().get(index).map(|r| r.slug.clone()));
                self.search_editing = false;
                self.suggestion_index = None;
                if let Some(slug) = picked {
                    self.dispatch(Action::SelectSuggestion(slug.clone()));
                    if let Some(row) = self.explorer.visible_row(&slug) {
                        self.selected_row = row;
                    }
                }
                return;
            }
            KeyCode::Backspace => {
                term.pop();
            }
            KeyCode::Char(c) => term.push(c),
            _ => return,
        }
        self.selected_row = 0;
        self.suggestion_index = None;
        self.dispatch(Action::SetSearch(term));
    }

    fn handle_picker_key(&mut self, code: KeyCode) {
        let Some(mut picker) = self.picker else {
            return;
        };
        let category = FilterCategory::ALL[picker.category_index % FilterCategory::ALL.len()];
        let option_count = self.options_for(category).len();

        match code {
            KeyCode::Esc | KeyCode::Char('c') => {
                self.picker = None;
                return;
            }
            KeyCode::Left => picker.options_focused = false,
            KeyCode::Right | KeyCode::Tab => picker.options_focused = option_count > 0,
            KeyCode::Up if picker.options_focused => {
                picker.option_index = picker.option_index.saturating_sub(1);
            }
            KeyCode::Down if picker.options_focused => {
                if picker.option_index + 1 < option_count {
                    picker.option_index += 1;
                }
            }
            KeyCode::Up => {
                picker.category_index =
                    (picker.category_index + FilterCategory::ALL.len() - 1) % FilterCategory::ALL.len();
                picker.option_index = 0;
            }
            KeyCode::Down => {
                picker.category_index = (picker.category_index + 1) % FilterCategory::ALL.len();
                picker.option_index = 0;
            }
            KeyCode::Enter | KeyCode::Char(' ') => {
                if category.is_toggle() {
                    self.dispatch(Action::ToggleHasMenu);
                } else if let Some(value) = self
                    .options_for(category)
                    .get(picker.option_index)
                    .map(|option| option.value.clone())
                {
                    self.dispatch(Action::ToggleOption(category, value));
                }
            }
            KeyCode::Backspace => self.dispatch(Action::ClearCategory(category)),
            _ => {}
        }
        self.picker = Some(picker);
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::app;
    use super::*;

    fn type_search(app: &mut test_support::TestApp, term: &str) {
        app.handle_key(KeyCode::Char('/'));
        for c in term.chars() {
            app.handle_key(KeyCode::Char(c));
        }
    }

    #[test]
    fn test_favorite_status_uses_the_display_name() {
        let mut app = app();
        app.handle_key(KeyCode::Char('f'));
        assert_eq!(app.status, "Added Gramercy Tavern to favorites");
        assert!(app.is_favorite("gramercy"));

        app.handle_key(KeyCode::Char('s'));
        assert_eq!(app.status, "Share link: http://localhost:8080/#favorites=gramercy");
    }

    #[test]
    fn test_search_suggestion_opens_the_restaurant() {
        let mut app = app();
        type_search(&mut app, "lil");
        assert_eq!(app.suggestions().len(), 1);

        app.handle_key(KeyCode::Tab);
        app.handle_key(KeyCode::Enter);
        assert!(!app.search_editing);
        assert_eq!(app.explorer.query().search, "Lilia");
        assert_eq!(app.explorer.selected().map(|r| r.slug.as_str()), Some("lilia"));
        assert_eq!(app.focused().map(|r| r.slug.as_str()), Some("lilia"));
    }

    #[test]
    fn test_picker_toggles_a_cuisine() {
        let mut app = app();
        app.handle_key(KeyCode::Char('c'));
        assert_eq!(app.picker_category(), Some(FilterCategory::Cuisine));

        app.handle_key(KeyCode::Right);
        let first = app.options_for(FilterCategory::Cuisine)[0].value.clone();
        app.handle_key(KeyCode::Enter);
        assert_eq!(app.explorer.visible_len(), 1);
        assert!(app.explorer.query().filters.is_selected(FilterCategory::Cuisine, &first));

        app.handle_key(KeyCode::Backspace);
        assert_eq!(app.explorer.visible_len(), 3);

        app.handle_key(KeyCode::Esc);
        assert!(app.picker.is_none());
    }

    #[test]
    fn test_fault_blocks_keys_until_retry() {
        let mut app = app();
        *app.fault.borrow_mut() = Some("boom".to_string());

        app.handle_key(KeyCode::Char('f'));
        assert!(!app.is_favorite("gramercy"));

        app.handle_key(KeyCode::Char('r'));
        assert!(app.fault.borrow().is_none());
        app.handle_key(KeyCode::Char('f'));
        assert!(app.is_favorite("gramercy"));
    }
}
