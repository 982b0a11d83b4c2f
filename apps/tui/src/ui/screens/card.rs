use crate::app::state::Region;
use crate::app::App;
use crate::ui::widgets::map::{marker_color, FAVORITE_COLOR};
use crate::ui::widgets::popup::{centered_rect, ClearWidget};
use crate::ui::{guarded, shortcut};
use nyc_rw_core::{MarkerKind, Restaurant};
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line as TextLine, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Widget, Wrap};
use ratatui::Frame;

pub fn render_card(app: &App, f: &mut Frame<'_>) {
    let area = centered_rect(60, 70, f.area());
    guarded(app, f, Region::Card, area, render_card_body);
}

fn labelled(label: &'static str, value: String) -> TextLine<'static> {
    TextLine::from(vec![
        Span::styled(
            format!("{label}: "),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(value),
    ])
}

/// "Prix Fixe Lunch Price" reads better without the trailing "Price".
fn meal_label(meal: &str) -> String {
    meal.replace(" Price", "")
}

fn card_lines(restaurant: &Restaurant, favorite: bool) -> Vec<TextLine<'static>> {
    let mut title = vec![Span::styled(
        restaurant.name.clone(),
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    )];
    if favorite {
        title.push(Span::styled(" ♥", Style::default().fg(FAVORITE_COLOR)));
    }

    let mut lines = vec![TextLine::from(title)];

    let kind = MarkerKind::for_restaurant(restaurant);
    let mut tags = Vec::new();
    if let Some(award) = restaurant.michelin_award {
        tags.push(award.label().to_string());
    }
    if let Some(rank) = &restaurant.nyttop100_rank {
        tags.push(format!("NYT Top 100 #{rank}"));
    }
    if !tags.is_empty() {
        lines.push(TextLine::from(Span::styled(
            tags.join(" · "),
            Style::default().fg(marker_color(kind)),
        )));
    }

    let place: Vec<&str> = [restaurant.neighborhood.as_str(), restaurant.borough.as_str()]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect();
    if !place.is_empty() {
        lines.push(TextLine::from(place.join(", ")));
    }
    lines.push(TextLine::from(""));

    if !restaurant.cuisine.is_empty() {
        lines.push(labelled("Cuisine", restaurant.cuisine_label()));
    }
    if let Some(price) = &restaurant.price_range {
        lines.push(labelled("Price", price.clone()));
    }
    if let Some(address) = &restaurant.address {
        lines.push(labelled("Address", address.clone()));
    }
    if let Some(telephone) = &restaurant.telephone {
        lines.push(labelled("Phone", telephone.clone()));
    }
    if !restaurant.participation_weeks.is_empty() {
        lines.push(labelled("Weeks", restaurant.participation_weeks.join(", ")));
    }
    if !restaurant.collections.is_empty() {
        lines.push(labelled("Collections", restaurant.collections.join(", ")));
    }

    if !restaurant.meal_types.is_empty() {
        lines.push(TextLine::from(""));
        lines.push(TextLine::from(Span::styled(
            "Meals Available",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )));
        for meal in &restaurant.meal_types {
            lines.push(TextLine::from(format!("  • {}", meal_label(meal))));
        }
    }

    if let Some(summary) = &restaurant.summary {
        lines.push(TextLine::from(""));
        lines.push(TextLine::from(summary.clone()));
    }

    lines.push(TextLine::from(""));
    if let Some(menu) = &restaurant.menu_url {
        lines.push(labelled("Menu", menu.clone()));
    }
    if let Some(website) = &restaurant.website {
        lines.push(labelled("Website", website.clone()));
    }

    lines
}

fn render_card_body(app: &App, area: Rect, buf: &mut Buffer) {
    ClearWidget.render(area, buf);

    let Some(restaurant) = app.explorer.selected() else {
        return;
    };

    let mut lines = card_lines(restaurant, app.is_favorite(&restaurant.slug));
    let mut keys = Vec::new();
    for (key, description) in [
        ("f", ": Favorite   "),
        ("s", ": Share   "),
        ("Esc", ": Close"),
    ] {
        keys.extend(shortcut(key, description));
    }
    lines.push(TextLine::from(keys));

    Paragraph::new(lines)
        .block(
            Block::default()
                .title("Restaurant Details")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan)),
        )
        .wrap(Wrap { trim: false })
        .render(area, buf);
}
