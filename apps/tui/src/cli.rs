use clap::{CommandFactory, Parser};
use nyc_rw_core::filter::HAS_MENU_ACTIVE;
use nyc_rw_core::{Action, FilterCategory, FilterError, LegendKey};

#[derive(Debug, Default, Parser)]
#[command(name = "nyc_rw-explorer", version, about = "NYC Restaurant Week explorer")]
pub struct CliArgs {
    /// Print the filtered list and summary counts, then exit
    #[arg(long)]
    pub headless: bool,

    /// Print headless output as JSON
    #[arg(long)]
    pub json: bool,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Load the dataset from a local file instead of DATASET_URL
    #[arg(long, value_name = "PATH")]
    pub dataset: Option<String>,

    /// Override the dataset URL
    #[arg(long = "dataset-url", value_name = "URL")]
    pub dataset_url: Option<String>,

    /// Override the data directory (favorites, cache, log)
    #[arg(long = "data-dir", value_name = "PATH")]
    pub data_dir: Option<String>,

    /// Warm the offline cache with map tiles for the whole city
    #[arg(long = "prefetch-tiles")]
    pub prefetch_tiles: bool,

    /// Shared link or fragment carrying `favorites=...`
    #[arg(long, value_name = "URL")]
    pub link: Option<String>,

    /// Restaurant name search
    #[arg(long)]
    pub search: Option<String>,

    #[arg(long, value_name = "CUISINE")]
    pub cuisine: Vec<String>,

    #[arg(long, value_name = "WEEK")]
    pub week: Vec<String>,

    #[arg(long, value_name = "MEAL")]
    pub meal: Vec<String>,

    #[arg(long, value_name = "COLLECTION")]
    pub collection: Vec<String>,

    /// Generic filter, e.g. `--filter "Meal Types=Dinner"`
    #[arg(long, value_name = "CATEGORY=VALUE")]
    pub filter: Vec<String>,

    /// Only restaurants with an online menu
    #[arg(long = "has-menu")]
    pub has_menu: bool,

    /// Legend keys: michelin, bib, nyt, regular, favorites
    #[arg(long, value_name = "KEY")]
    pub legend: Vec<String>,

    /// Only favorited restaurants
    #[arg(long = "favorites-only")]
    pub favorites_only: bool,
}

impl CliArgs {
    pub fn apply_env_overrides(&self) {
        if let Some(path) = &self.dataset {
            std::env::set_var("DATASET_PATH", path);
        }
        if let Some(url) = &self.dataset_url {
            std::env::set_var("DATASET_URL", url);
        }
        if let Some(dir) = &self.data_dir {
            std::env::set_var("DATA_DIR", dir);
        }
        if self.debug {
            std::env::set_var("DEBUG", "1");
        }
    }

    /// The URL fragment from `--link`, accepting either a full URL or a bare fragment.
    pub fn link_fragment(&self) -> String {
        self.link.as_deref().map_or_else(String::new, |link| {
            link.split_once('#')
                .map_or(link, |(_, fragment)| fragment)
                .to_string()
        })
    }

    /// Filter flags as explorer actions, applied in order on startup.
    pub fn filter_actions(&self) -> Result<Vec<Action>, FilterError> {
        let mut actions = Vec::new();

        if let Some(search) = &self.search {
            actions.push(Action::SetSearch(search.clone()));
        }

        for (category, values) in [
            (FilterCategory::Cuisine, &self.cuisine),
            (FilterCategory::ParticipatingWeeks, &self.week),
            (FilterCategory::MealTypes, &self.meal),
            (FilterCategory::Collections, &self.collection),
        ] {
            if !values.is_empty() {
                actions.push(Action::SetCategory(category, values.clone()));
            }
        }

        let mut has_menu = self.has_menu;
        for pair in &self.filter {
            let (category, value) = pair
                .split_once('=')
                .ok_or_else(|| FilterError::UnknownCategory(pair.clone()))?;
            let category = FilterCategory::parse(category)?;
            if category.is_toggle() {
                // Last yes/no wins; --has-menu still forces it on
                has_menu = parse_switch(category, value)? || self.has_menu;
            } else {
                actions.push(Action::ToggleOption(category, value.trim().to_string()));
            }
        }

        if has_menu {
            actions.push(Action::SetCategory(
                FilterCategory::HasMenu,
                vec![HAS_MENU_ACTIVE.to_string()],
            ));
        }

        for key in &self.legend {
            actions.push(Action::ToggleLegend(LegendKey::parse(key)?));
        }

        if self.favorites_only {
            actions.push(Action::ToggleFavoritesActive);
        }

        Ok(actions)
    }

    pub fn help_text() -> String {
        let mut command = Self::command();
        let mut buffer = Vec::new();
        command.write_help(&mut buffer).ok();
        String::from_utf8_lossy(&buffer).to_string()
    }
}

fn parse_switch(category: FilterCategory, value: &str) -> Result<bool, FilterError> {
    match value.trim().to_lowercase().as_str() {
        "yes" | "true" | "on" | "1" => Ok(true),
        "no" | "false" | "off" | "0" => Ok(false),
        _ => Err(FilterError::InvalidToggleValue {
            category: category.label().to_string(),
            value: value.trim().to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliArgs {
        CliArgs::try_parse_from(std::iter::once("nyc_rw-explorer").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn filter_flags_become_actions() {
        let args = parse(&[
            "--search",
            "tav",
            "--cuisine",
            "Italian",
            "--cuisine",
            "Indian",
            "--meal",
            "Dinner",
            "--has-menu",
            "--legend",
            "bib",
            "--favorites-only",
        ]);
        assert_eq!(
            args.filter_actions().unwrap(),
            vec![
                Action::SetSearch("tav".into()),
                Action::SetCategory(FilterCategory::Cuisine, vec!["Italian".into(), "Indian".into()]),
                Action::SetCategory(FilterCategory::MealTypes, vec!["Dinner".into()]),
                Action::SetCategory(FilterCategory::HasMenu, vec![HAS_MENU_ACTIVE.into()]),
                Action::ToggleLegend(LegendKey::Bib),
                Action::ToggleFavoritesActive,
            ]
        );
    }

    #[test]
    fn generic_filters_parse_category_labels() {
        let args = parse(&["--filter", "Participating Weeks=Week 1", "--filter", "has menu=yes"]);
        assert_eq!(
            args.filter_actions().unwrap(),
            vec![
                Action::ToggleOption(FilterCategory::ParticipatingWeeks, "Week 1".into()),
                Action::SetCategory(FilterCategory::HasMenu, vec![HAS_MENU_ACTIVE.into()]),
            ]
        );
    }

    fn has_menu_active(args: &CliArgs) -> bool {
        let mut state = nyc_rw_core::ExplorerState::default();
        for action in args.filter_actions().unwrap() {
            state = state.apply(action, &nyc_rw_core::Dataset::default());
        }
        state.query.filters.is_active(FilterCategory::HasMenu)
    }

    #[test]
    fn has_menu_flags_are_idempotent() {
        assert!(has_menu_active(&parse(&["--filter", "Has Menu=yes", "--has-menu"])));
        assert!(!has_menu_active(&parse(&["--filter", "Has Menu=no"])));
        assert!(has_menu_active(&parse(&["--filter", "Has Menu=no", "--has-menu"])));
        assert!(!has_menu_active(&parse(&[])));
    }

    #[test]
    fn has_menu_rejects_values_other_than_yes_or_no() {
        let args = parse(&["--filter", "Has Menu=maybe"]);
        assert_eq!(
            args.filter_actions(),
            Err(FilterError::InvalidToggleValue {
                category: "Has Menu".into(),
                value: "maybe".into(),
            })
        );
    }

    #[test]
    fn unwired_categories_are_rejected() {
        let args = parse(&["--filter", "Accessibility=Wheelchair"]);
        assert!(matches!(
            args.filter_actions(),
            Err(FilterError::UnsupportedCategory(_))
        ));

        let args = parse(&["--legend", "green"]);
        assert!(matches!(
            args.filter_actions(),
            Err(FilterError::UnknownLegendKey(_))
        ));
    }

    #[test]
    fn link_accepts_urls_and_bare_fragments() {
        let args = parse(&["--link", "https://rw.example/#favorites=lilia%2Cdhamaka"]);
        assert_eq!(args.link_fragment(), "favorites=lilia%2Cdhamaka");

        let args = parse(&["--link", "favorites=lilia"]);
        assert_eq!(args.link_fragment(), "favorites=lilia");
        assert_eq!(parse(&[]).link_fragment(), "");
    }
}
