use color_eyre::Result;
use crossterm::event::{self, Event, KeyEventKind, MouseButton, MouseEventKind};
use nyc_rw_core::{MapBackend, Restaurant};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::collections::BTreeMap;
use std::io::Stdout;
use tracing::{debug, info};

use crate::app::{handle_input, App};
use crate::offline::ConnectivityMonitor;
use crate::ui;

/// Run the application in headless mode (no UI)
pub fn run_headless(app: &App, json: bool) -> Result<()> {
    let report = build_headless_report(app);
    info!(visible = report.visible, total = report.total, "headless report");

    if json {
        let json = serde_json::to_string_pretty(&report)?;
        println!("{json}");
    } else {
        render_headless_report(&report);
    }

    Ok(())
}

fn render_headless_report(report: &HeadlessReport) {
    println!("\nNYC Restaurant Week");
    println!("===================");
    println!("Showing {} of {} restaurants", report.visible, report.total);
    println!("Favorites: {}", report.favorites);
    println!("Map: {}", report.map);

    if !report.search.is_empty() {
        println!("Search: {}", report.search);
    }
    if !report.applied_filters.is_empty() {
        println!("Filters: {}", report.applied_filters.join(" | "));
    }

    println!("\nBy Borough:");
    for (borough, count) in &report.by_borough {
        println!("- {borough}: {count}");
    }

    println!("\nLegend:");
    for (legend, count) in &report.legend {
        println!("- {legend}: {count}");
    }

    println!("\nRestaurants:");
    for restaurant in &report.restaurants {
        let star = if restaurant.favorite { "*" } else { " " };
        println!(
            "{star} {} | {} | {} | {}",
            restaurant.name, restaurant.borough, restaurant.cuisine, restaurant.award
        );
    }
}

fn award_label(restaurant: &Restaurant) -> String {
    match (&restaurant.michelin_award, &restaurant.nyttop100_rank) {
        (Some(award), _) => award.label().to_string(),
        (None, Some(rank)) => format!("NYT Top 100 #{rank}"),
        (None, None) => String::new(),
    }
}

fn build_headless_report(app: &App) -> HeadlessReport {
    let mut by_borough: BTreeMap<String, usize> = BTreeMap::new();
    let restaurants: Vec<HeadlessRestaurant> = app
        .explorer
        .visible()
        .map(|restaurant| {
            let borough = if restaurant.borough.is_empty() {
                "(unknown)".to_string()
            } else {
                restaurant.borough.clone()
            };
            *by_borough.entry(borough.clone()).or_default() += 1;
            HeadlessRestaurant {
                name: restaurant.name.clone(),
                slug: restaurant.slug.clone(),
                borough,
                neighborhood: restaurant.neighborhood.clone(),
                cuisine: restaurant.cuisine_label(),
                award: award_label(restaurant),
                menu_url: restaurant.menu_url.clone(),
                favorite: app.is_favorite(&restaurant.slug),
            }
        })
        .collect();

    let applied_filters = app
        .explorer
        .applied_filters()
        .into_iter()
        .map(|(category, value)| format!("{}: {value}", category.label()))
        .collect();

    let legend = app
        .legend_counts()
        .into_iter()
        .map(|(key, count)| (key.label().to_string(), count))
        .collect();

    HeadlessReport {
        total: app.dataset().len(),
        visible: restaurants.len(),
        favorites: app.favorites.favorites().len(),
        map: app.map.name().to_string(),
        search: app.explorer.query().search.clone(),
        applied_filters,
        by_borough: by_borough.into_iter().collect(),
        legend,
        share_link: app.share_link(),
        restaurants,
    }
}

#[derive(serde::Serialize)]
struct HeadlessReport {
    total: usize,
    visible: usize,
    favorites: usize,
    map: String,
    search: String,
    applied_filters: Vec<String>,
    by_borough: Vec<(String, usize)>,
    legend: Vec<(String, usize)>,
    share_link: String,
    restaurants: Vec<HeadlessRestaurant>,
}

#[derive(serde::Serialize)]
struct HeadlessRestaurant {
    name: String,
    slug: String,
    borough: String,
    neighborhood: String,
    cuisine: String,
    award: String,
    menu_url: Option<String>,
    favorite: bool,
}

/// Run the main application event loop
pub fn run(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &mut App,
    monitor: &mut ConnectivityMonitor,
) -> Result<()> {
    // Configure event poll timeout (ms)
    const EVENT_POLL_TIMEOUT: u64 = 50;

    loop {
        if let Some(map) = monitor.poll() {
            app.set_map_backend(map);
        }

        if let Err(e) = terminal.draw(|f| ui::ui(app, f)) {
            return Err(color_eyre::eyre::eyre!("Terminal draw error: {e}"));
        }

        if matches!(
            event::poll(std::time::Duration::from_millis(EVENT_POLL_TIMEOUT)),
            Ok(true)
        ) {
            match event::read() {
                Ok(Event::Key(key)) if key.kind != KeyEventKind::Release => {
                    handle_input(app, key.code);
                    if !app.running {
                        break;
                    }
                }
                Ok(Event::Mouse(mouse)) => {
                    if mouse.kind == MouseEventKind::Down(MouseButton::Left) {
                        app.click_map(mouse.column, mouse.row);
                    }
                }
                Ok(Event::Resize(width, height)) => {
                    debug!(width, height, "terminal resized");
                }
                Ok(Event::Key(_) | Event::FocusGained | Event::FocusLost | Event::Paste(_))
                | Err(_) => {}
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::state::test_support::{app, app_with_link};
    use nyc_rw_core::{Action, FilterCategory};

    #[test]
    fn report_counts_the_visible_list() {
        let mut app = app_with_link("favorites=lilia");
        app.dispatch(Action::ToggleOption(FilterCategory::Cuisine, "Italian".into()));
        let report = build_headless_report(&app);

        assert_eq!(report.total, 4);
        assert_eq!(report.visible, 1);
        assert_eq!(report.favorites, 1);
        assert_eq!(report.map, "schematic");
        assert_eq!(report.applied_filters, vec!["Cuisine: Italian"]);
        assert_eq!(report.by_borough, vec![("(unknown)".to_string(), 1)]);
        assert!(report.restaurants[0].favorite);
        assert_eq!(report.restaurants[0].award, "NYT Top 100 #3");
    }

    #[test]
    fn report_serializes_as_json() {
        let report = build_headless_report(&app());
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["visible"], 4);
        assert_eq!(json["legend"][0][0], "Michelin");
        assert_eq!(json["share_link"], "http://localhost:5173/");
    }
}
