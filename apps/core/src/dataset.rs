use crate::error::DatasetError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MichelinAward {
    OneStar,
    TwoStars,
    ThreeStars,
    BibGourmand,
}

impl MichelinAward {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OneStar => "ONE_STAR",
            Self::TwoStars => "TWO_STARS",
            Self::ThreeStars => "THREE_STARS",
            Self::BibGourmand => "BIB_GOURMAND",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_uppercase().replace([' ', '-'], "_").as_str() {
            "ONE_STAR" => Some(Self::OneStar),
            "TWO_STARS" => Some(Self::TwoStars),
            "THREE_STARS" => Some(Self::ThreeStars),
            "BIB_GOURMAND" => Some(Self::BibGourmand),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::OneStar => "1 Michelin Star",
            Self::TwoStars => "2 Michelin Stars",
            Self::ThreeStars => "3 Michelin Stars",
            Self::BibGourmand => "Bib Gourmand",
        }
    }

    pub const fn is_starred(self) -> bool {
        matches!(self, Self::OneStar | Self::TwoStars | Self::ThreeStars)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    /// Builds a point only from finite, non-null-island coordinates.
    pub fn new(latitude: f64, longitude: f64) -> Option<Self> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return None;
        }
        if latitude == 0.0 && longitude == 0.0 {
            return None;
        }
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return None;
        }
        Some(Self {
            latitude,
            longitude,
        })
    }
}

/// A normalized restaurant record.
///
/// Records are only ever handed out by shared reference from a [`Dataset`],
/// so nothing downstream can change one after load.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Restaurant {
    pub name: String,
    pub slug: String,
    pub borough: String,
    pub neighborhood: String,
    pub cuisine: Vec<String>,
    pub summary: Option<String>,
    pub meal_types: Vec<String>,
    pub participation_weeks: Vec<String>,
    pub collections: Vec<String>,
    pub menu_url: Option<String>,
    pub website: Option<String>,
    pub opentable_id: Option<String>,
    pub image_url: Option<String>,
    pub address: Option<String>,
    pub telephone: Option<String>,
    pub price_range: Option<String>,
    pub primary_location: Option<String>,
    pub michelin_award: Option<MichelinAward>,
    pub nyttop100_rank: Option<String>,
    pub location: Option<GeoPoint>,
}

impl Restaurant {
    pub const fn has_menu(&self) -> bool {
        self.menu_url.is_some()
    }

    pub fn is_michelin_starred(&self) -> bool {
        self.michelin_award.is_some_and(MichelinAward::is_starred)
    }

    pub fn is_bib_gourmand(&self) -> bool {
        self.michelin_award == Some(MichelinAward::BibGourmand)
    }

    pub const fn is_nyt_top_100(&self) -> bool {
        self.nyttop100_rank.is_some()
    }

    /// Neither a Michelin award nor an NYT Top 100 rank.
    pub const fn is_regular(&self) -> bool {
        self.michelin_award.is_none() && self.nyttop100_rank.is_none()
    }

    pub fn cuisine_label(&self) -> String {
        self.cuisine.join(", ")
    }
}

/// `cuisine` was a plain string in one schema revision and an array in another.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<Option<String>>),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TextOrNumber {
    Number(f64),
    Text(String),
}

impl TextOrNumber {
    fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            Self::Text(text) => text.trim().parse().ok(),
        }
    }

    fn into_text(self) -> Option<String> {
        match self {
            #[allow(clippy::cast_possible_truncation)]
            Self::Number(value) if value.fract() == 0.0 => Some(format!("{}", value as i64)),
            Self::Number(value) => Some(value.to_string()),
            Self::Text(text) => present(Some(text)),
        }
    }
}

/// Record shape as it appears in `FinalData.json`.
#[derive(Debug, Deserialize)]
pub struct RawRestaurant {
    name: String,
    slug: Option<String>,
    borough: Option<String>,
    neighborhood: Option<String>,
    cuisine: Option<OneOrMany>,
    summary: Option<String>,
    meal_types: Option<Vec<Option<String>>>,
    participation_weeks: Option<Vec<Option<String>>>,
    collections: Option<Vec<Option<String>>>,
    menu_url: Option<String>,
    website: Option<String>,
    opentable_id: Option<TextOrNumber>,
    image_url: Option<String>,
    address: Option<String>,
    telephone: Option<String>,
    price_range: Option<String>,
    primary_location: Option<String>,
    michelin_award: Option<String>,
    nyttop100_rank: Option<TextOrNumber>,
    latitude: Option<TextOrNumber>,
    longitude: Option<TextOrNumber>,
}

impl RawRestaurant {
    fn normalize(self) -> Restaurant {
        let cuisine = match self.cuisine {
            Some(OneOrMany::One(value)) => present(Some(value)).into_iter().collect(),
            Some(OneOrMany::Many(values)) => clean_list(Some(values)),
            None => Vec::new(),
        };

        let michelin_award = self.michelin_award.and_then(|value| {
            let award = MichelinAward::parse(&value);
            if award.is_none() && !value.trim().is_empty() {
                debug!(restaurant = %self.name, award = %value, "ignoring unknown michelin award");
            }
            award
        });

        let location = match (
            self.latitude.as_ref().and_then(TextOrNumber::as_f64),
            self.longitude.as_ref().and_then(TextOrNumber::as_f64),
        ) {
            (Some(latitude), Some(longitude)) => GeoPoint::new(latitude, longitude),
            _ => None,
        };

        let name = self.name.trim().to_string();
        let slug = present(self.slug).unwrap_or_else(|| slugify(&name));

        Restaurant {
            slug,
            borough: self.borough.unwrap_or_default().trim().to_string(),
            neighborhood: self.neighborhood.unwrap_or_default().trim().to_string(),
            cuisine,
            summary: present(self.summary),
            meal_types: clean_list(self.meal_types),
            participation_weeks: clean_list(self.participation_weeks),
            collections: clean_list(self.collections),
            menu_url: present(self.menu_url),
            website: present(self.website),
            opentable_id: self.opentable_id.and_then(TextOrNumber::into_text),
            image_url: present(self.image_url),
            address: present(self.address),
            telephone: present(self.telephone),
            price_range: present(self.price_range),
            primary_location: present(self.primary_location),
            michelin_award,
            nyttop100_rank: self.nyttop100_rank.and_then(TextOrNumber::into_text),
            location,
            name,
        }
    }
}

/// Treats blank strings and the literal `na` (any case) as absent.
fn present(value: Option<String>) -> Option<String> {
    let value = value?;
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("na") {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn clean_list(values: Option<Vec<Option<String>>>) -> Vec<String> {
    values
        .unwrap_or_default()
        .into_iter()
        .filter_map(present)
        .collect()
}

/// Lowercase ASCII slug used when a record carries no `slug` of its own.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    if slug.is_empty() {
        slug.push_str("restaurant");
    }
    slug
}

/// The restaurant collection, loaded once and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    restaurants: Vec<Restaurant>,
    by_slug: HashMap<String, usize>,
}

impl Dataset {
    pub fn from_json(json: &str) -> Result<Self, DatasetError> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, DatasetError> {
        let records = match value {
            Value::Array(records) => records,
            Value::Object(_) => return Err(DatasetError::Shape("an object")),
            Value::String(_) => return Err(DatasetError::Shape("a string")),
            Value::Number(_) => return Err(DatasetError::Shape("a number")),
            Value::Bool(_) => return Err(DatasetError::Shape("a boolean")),
            Value::Null => return Err(DatasetError::Shape("null")),
        };

        let mut restaurants = Vec::with_capacity(records.len());
        for (index, record) in records.into_iter().enumerate() {
            match serde_json::from_value::<RawRestaurant>(record) {
                Ok(raw) if !raw.name.trim().is_empty() => restaurants.push(raw.normalize()),
                Ok(_) => warn!(index, "skipping restaurant record without a name"),
                Err(e) => warn!(index, error = %e, "skipping malformed restaurant record"),
            }
        }

        Ok(Self::from_restaurants(restaurants))
    }

    /// Indexes normalized records, suffixing duplicate slugs so identity stays unique.
    pub fn from_restaurants(mut restaurants: Vec<Restaurant>) -> Self {
        let mut by_slug = HashMap::with_capacity(restaurants.len());
        for (index, restaurant) in restaurants.iter_mut().enumerate() {
            if by_slug.contains_key(&restaurant.slug) {
                let base = restaurant.slug.clone();
                let mut suffix = 2;
                while by_slug.contains_key(&format!("{base}-{suffix}")) {
                    suffix += 1;
                }
                restaurant.slug = format!("{base}-{suffix}");
                debug!(name = %restaurant.name, slug = %restaurant.slug, "renamed duplicate slug");
            }
            by_slug.insert(restaurant.slug.clone(), index);
        }

        Self {
            restaurants,
            by_slug,
        }
    }

    pub fn len(&self) -> usize {
        self.restaurants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.restaurants.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Restaurant> {
        self.restaurants.iter()
    }

    pub fn as_slice(&self) -> &[Restaurant] {
        &self.restaurants
    }

    pub fn at(&self, index: usize) -> Option<&Restaurant> {
        self.restaurants.get(index)
    }

    pub fn get(&self, slug: &str) -> Option<&Restaurant> {
        self.position(slug).and_then(|index| self.restaurants.get(index))
    }

    pub fn position(&self, slug: &str) -> Option<usize> {
        self.by_slug.get(slug).copied()
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Restaurant> {
        self.restaurants.iter().find(|restaurant| restaurant.name == name)
    }

    /// Resolves a stored identifier: slug first, then a legacy display name.
    pub fn resolve(&self, identifier: &str) -> Option<&Restaurant> {
        self.get(identifier).or_else(|| self.find_by_name(identifier))
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a Restaurant;
    type IntoIter = std::slice::Iter<'a, Restaurant>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
