use crate::dataset::{Dataset, Restaurant};
use crate::error::FilterError;
use crate::favorites::Favorites;
use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use std::collections::{BTreeMap, BTreeSet};

/// Option value carried by the Has Menu toggle.
pub const HAS_MENU_ACTIVE: &str = "active";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FilterCategory {
    Cuisine,
    ParticipatingWeeks,
    MealTypes,
    Collections,
    HasMenu,
}

impl FilterCategory {
    pub const ALL: [Self; 5] = [
        Self::Cuisine,
        Self::ParticipatingWeeks,
        Self::MealTypes,
        Self::Collections,
        Self::HasMenu,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cuisine => "cuisine",
            Self::ParticipatingWeeks => "weeks",
            Self::MealTypes => "meal-types",
            Self::Collections => "collections",
            Self::HasMenu => "has-menu",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Cuisine => "Cuisine",
            Self::ParticipatingWeeks => "Participating Weeks",
            Self::MealTypes => "Meal Types",
            Self::Collections => "Collections",
            Self::HasMenu => "Has Menu",
        }
    }

    pub fn parse(value: &str) -> Result<Self, FilterError> {
        let key: String = value
            .trim()
            .to_lowercase()
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .collect();
        match key.as_str() {
            "cuisine" | "cuisines" => Ok(Self::Cuisine),
            "participatingweeks" | "weeksparticipating" | "weeks" | "week" => {
                Ok(Self::ParticipatingWeeks)
            }
            "mealtypes" | "mealtype" | "meals" => Ok(Self::MealTypes),
            "collections" | "collection" => Ok(Self::Collections),
            "hasmenu" | "menu" => Ok(Self::HasMenu),
            "accessibility" | "nyttop100" | "nyt" => {
                Err(FilterError::UnsupportedCategory(value.trim().to_string()))
            }
            _ => Err(FilterError::UnknownCategory(value.trim().to_string())),
        }
    }

    /// Has Menu is an on/off toggle rather than a multi-select.
    pub const fn is_toggle(self) -> bool {
        matches!(self, Self::HasMenu)
    }

    fn values(self, restaurant: &Restaurant) -> &[String] {
        match self {
            Self::Cuisine => restaurant.cuisine.as_slice(),
            Self::ParticipatingWeeks => restaurant.participation_weeks.as_slice(),
            Self::MealTypes => restaurant.meal_types.as_slice(),
            Self::Collections => restaurant.collections.as_slice(),
            Self::HasMenu => &[],
        }
    }

    fn matches(self, restaurant: &Restaurant, selected: &BTreeSet<String>) -> bool {
        match self {
            Self::HasMenu => restaurant.has_menu(),
            _ => self
                .values(restaurant)
                .iter()
                .any(|value| selected.contains(value)),
        }
    }
}

/// Structured filter selections: AND across categories, OR within one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveFilters(BTreeMap<FilterCategory, BTreeSet<String>>);

impl ActiveFilters {
    pub fn selected(&self, category: FilterCategory) -> Option<&BTreeSet<String>> {
        self.0.get(&category).filter(|values| !values.is_empty())
    }

    pub fn is_selected(&self, category: FilterCategory, value: &str) -> bool {
        self.selected(category)
            .is_some_and(|values| values.contains(value))
    }

    pub fn is_active(&self, category: FilterCategory) -> bool {
        self.selected(category).is_some()
    }

    /// Replaces a category's selection; an empty selection removes the constraint.
    pub fn set<I, S>(&mut self, category: FilterCategory, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values: BTreeSet<String> = values.into_iter().map(Into::into).collect();
        if values.is_empty() {
            self.0.remove(&category);
        } else {
            self.0.insert(category, values);
        }
    }

    pub fn toggle(&mut self, category: FilterCategory, value: &str) {
        let values = self.0.entry(category).or_default();
        if !values.remove(value) {
            values.insert(value.to_string());
        }
        if values.is_empty() {
            self.0.remove(&category);
        }
    }

    pub fn remove(&mut self, category: FilterCategory, value: &str) {
        if let Some(values) = self.0.get_mut(&category) {
            values.remove(value);
            if values.is_empty() {
                self.0.remove(&category);
            }
        }
    }

    pub fn clear(&mut self, category: FilterCategory) {
        self.0.remove(&category);
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(BTreeSet::is_empty)
    }

    pub fn iter(&self) -> impl Iterator<Item = (FilterCategory, &BTreeSet<String>)> {
        self.0
            .iter()
            .filter(|(_, values)| !values.is_empty())
            .map(|(category, values)| (*category, values))
    }

    /// Flattened (category, value) pairs, one per applied-filter chip.
    pub fn applied(&self) -> Vec<(FilterCategory, String)> {
        self.iter()
            .flat_map(|(category, values)| values.iter().map(move |v| (category, v.clone())))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LegendKey {
    Michelin,
    Bib,
    Nyt,
    Regular,
    Favorites,
}

impl LegendKey {
    pub const ALL: [Self; 5] = [
        Self::Michelin,
        Self::Bib,
        Self::Nyt,
        Self::Regular,
        Self::Favorites,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Michelin => "michelin",
            Self::Bib => "bib",
            Self::Nyt => "nyt",
            Self::Regular => "regular",
            Self::Favorites => "favorites",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Michelin => "Michelin",
            Self::Bib => "Bib Gourmand",
            Self::Nyt => "NYT Top 100",
            Self::Regular => "The Rest",
            Self::Favorites => "Favorites",
        }
    }

    pub fn parse(value: &str) -> Result<Self, FilterError> {
        match value.trim().to_lowercase().as_str() {
            "michelin" => Ok(Self::Michelin),
            "bib" | "bib-gourmand" | "bibgourmand" => Ok(Self::Bib),
            "nyt" | "nyt-top-100" | "nyttop100" => Ok(Self::Nyt),
            "regular" | "rest" => Ok(Self::Regular),
            "favorites" | "favourites" => Ok(Self::Favorites),
            _ => Err(FilterError::UnknownLegendKey(value.trim().to_string())),
        }
    }

    pub fn matches(self, restaurant: &Restaurant, favorites: &Favorites) -> bool {
        match self {
            Self::Michelin => restaurant.is_michelin_starred(),
            Self::Bib => restaurant.is_bib_gourmand(),
            Self::Nyt => restaurant.is_nyt_top_100(),
            Self::Regular => restaurant.is_regular(),
            Self::Favorites => favorites.contains(&restaurant.slug),
        }
    }
}

/// Legend toggles, OR-ed together when any is active.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LegendFilters(BTreeSet<LegendKey>);

impl LegendFilters {
    pub fn contains(&self, key: LegendKey) -> bool {
        self.0.contains(&key)
    }

    pub fn insert(&mut self, key: LegendKey) {
        self.0.insert(key);
    }

    pub fn remove(&mut self, key: LegendKey) {
        self.0.remove(&key);
    }

    pub fn toggle(&mut self, key: LegendKey) {
        if !self.0.remove(&key) {
            self.0.insert(key);
        }
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = LegendKey> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<LegendKey> for LegendFilters {
    fn from_iter<I: IntoIterator<Item = LegendKey>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterQuery {
    pub search: String,
    pub filters: ActiveFilters,
    pub legend: LegendFilters,
    pub favorites_active: bool,
}

impl FilterQuery {
    pub fn is_empty(&self) -> bool {
        self.search.trim().is_empty()
            && self.filters.is_empty()
            && self.legend.is_empty()
            && !self.favorites_active
    }
}

fn name_matches(restaurant: &Restaurant, needle: &str) -> bool {
    needle.is_empty() || restaurant.name.to_lowercase().contains(needle)
}

fn passes(
    restaurant: &Restaurant,
    query: &FilterQuery,
    needle: &str,
    favorites: &Favorites,
) -> bool {
    if query.favorites_active && !favorites.contains(&restaurant.slug) {
        return false;
    }

    if !name_matches(restaurant, needle) {
        return false;
    }

    if !query
        .filters
        .iter()
        .all(|(category, selected)| category.matches(restaurant, selected))
    {
        return false;
    }

    query.legend.is_empty()
        || query
            .legend
            .iter()
            .any(|key| key.matches(restaurant, favorites))
}

/// Dataset positions of the records that pass `query`, in dataset order.
pub fn visible_indices(dataset: &Dataset, query: &FilterQuery, favorites: &Favorites) -> Vec<usize> {
    let needle = query.search.trim().to_lowercase();
    dataset
        .iter()
        .enumerate()
        .filter(|(_, restaurant)| passes(restaurant, query, &needle, favorites))
        .map(|(index, _)| index)
        .collect()
}

/// Filters the dataset without reordering it.
pub fn compute_visible<'a>(
    dataset: &'a Dataset,
    query: &FilterQuery,
    favorites: &Favorites,
) -> Vec<&'a Restaurant> {
    let needle = query.search.trim().to_lowercase();
    dataset
        .iter()
        .filter(|restaurant| passes(restaurant, query, &needle, favorites))
        .collect()
}

/// Names containing `term`, best fuzzy score first, dataset order breaking ties.
pub fn search_suggestions<'a>(dataset: &'a Dataset, term: &str, limit: usize) -> Vec<&'a Restaurant> {
    let term = term.trim();
    if term.is_empty() || limit == 0 {
        return Vec::new();
    }

    let needle = term.to_lowercase();
    let matcher = SkimMatcherV2::default().ignore_case();
    let mut scored: Vec<(i64, usize, &Restaurant)> = dataset
        .iter()
        .enumerate()
        .filter(|(_, restaurant)| name_matches(restaurant, &needle))
        .map(|(index, restaurant)| {
            let score = matcher.fuzzy_match(&restaurant.name, term).unwrap_or(0);
            (score, index, restaurant)
        })
        .collect();

    scored.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
    scored
        .into_iter()
        .take(limit)
        .map(|(_, _, restaurant)| restaurant)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterOption {
    pub value: String,
    pub count: usize,
}

/// Distinct option values for a category with the number of records carrying each.
pub fn category_options(dataset: &Dataset, category: FilterCategory) -> Vec<FilterOption> {
    if category.is_toggle() {
        let count = dataset.iter().filter(|r| r.has_menu()).count();
        return vec![FilterOption {
            value: HAS_MENU_ACTIVE.to_string(),
            count,
        }];
    }

    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for restaurant in dataset {
        let distinct: BTreeSet<&str> = category
            .values(restaurant)
            .iter()
            .map(String::as_str)
            .collect();
        for value in distinct {
            *counts.entry(value).or_default() += 1;
        }
    }

    let mut options: Vec<FilterOption> = counts
        .into_iter()
        .map(|(value, count)| FilterOption {
            value: value.to_string(),
            count,
        })
        .collect();
    options.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.value.cmp(&b.value)));
    options
}

pub fn legend_counts(dataset: &Dataset, favorites: &Favorites) -> Vec<(LegendKey, usize)> {
    LegendKey::ALL
        .iter()
        .map(|key| {
            let count = dataset
                .iter()
                .filter(|restaurant| key.matches(restaurant, favorites))
                .count();
            (*key, count)
        })
        .collect()
}
