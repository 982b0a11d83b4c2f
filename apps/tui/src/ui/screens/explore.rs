use crate::app::state::Region;
use crate::app::App;
use crate::ui::widgets::map::{marker_color, render_map, FAVORITE_COLOR};
use crate::ui::widgets::tables::scroll_offset;
use crate::ui::{guarded, shortcut};
use nyc_rw_core::{LegendKey, MarkerKind, Restaurant};
use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line as TextLine, Span};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Widget};
use ratatui::Frame;

pub fn render_explore(app: &App, f: &mut Frame<'_>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Min(8),
            Constraint::Length(3),
        ])
        .split(f.area());

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[1]);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(5), Constraint::Length(4)])
        .split(body[1]);

    guarded(app, f, Region::Header, chunks[0], render_header);
    guarded(app, f, Region::List, body[0], render_list);
    guarded(app, f, Region::Map, right[0], render_map);
    guarded(app, f, Region::Legend, right[1], render_legend);
    render_status(app, f, chunks[2]);

    if app.search_editing {
        let suggestions = suggestion_area(chunks[0], body[0], app.suggestions().len());
        guarded(app, f, Region::Header, suggestions, render_suggestions);
    }
}

fn render_header(app: &App, area: Rect, buf: &mut Buffer) {
    let border = if app.search_editing {
        Color::Yellow
    } else {
        Color::Cyan
    };
    let block = Block::default()
        .title("Search Restaurants")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border));

    let search_line = if app.search_input.is_empty() && !app.search_editing {
        TextLine::from(Span::styled(
            "Press / to search by name",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let cursor = if app.search_editing { "_" } else { "" };
        TextLine::from(format!("{}{cursor}", app.search_input))
    };

    Paragraph::new(vec![search_line, chips_line(app)])
        .block(block)
        .render(area, buf);
}

/// The applied-filter chips, plus tags for legend and favorites toggles.
fn chips_line(app: &App) -> TextLine<'static> {
    let query = app.explorer.query();
    let mut spans = vec![Span::styled(
        "Applied: ",
        Style::default().fg(Color::Gray),
    )];

    let chips: Vec<String> = app
        .explorer
        .applied_filters()
        .into_iter()
        .map(|(category, value)| {
            if category.is_toggle() {
                category.label().to_string()
            } else {
                format!("{}: {value}", category.label())
            }
        })
        .chain(query.legend.iter().map(|key| key.label().to_string()))
        .chain(query.favorites_active.then(|| "Favorites only".to_string()))
        .collect();

    if chips.is_empty() {
        spans.push(Span::styled("none", Style::default().fg(Color::DarkGray)));
    }
    for chip in chips {
        spans.push(Span::styled(
            format!("[{chip}]"),
            Style::default().fg(Color::Black).bg(Color::Cyan),
        ));
        spans.push(Span::raw(" "));
    }

    TextLine::from(spans)
}

fn award_cell(restaurant: &Restaurant) -> (String, Color) {
    let kind = MarkerKind::for_restaurant(restaurant);
    let label = match (&restaurant.michelin_award, &restaurant.nyttop100_rank) {
        (Some(award), _) => award.label().to_string(),
        (None, Some(rank)) => format!("NYT #{rank}"),
        (None, None) => String::new(),
    };
    (label, marker_color(kind))
}

fn render_list(app: &App, area: Rect, buf: &mut Buffer) {
    let total_rows = app.explorer.visible_len();
    let block = Block::default()
        .title(format!(
            "Restaurants ({} of {})",
            total_rows,
            app.dataset().len()
        ))
        .borders(Borders::ALL);

    if total_rows == 0 {
        Paragraph::new("No restaurants match. Press x to clear filters.")
            .block(block.border_style(Style::default().fg(Color::Yellow)))
            .alignment(Alignment::Center)
            .render(area, buf);
        return;
    }

    let header = Row::new(vec![
        Cell::from(""),
        Cell::from("Name"),
        Cell::from("Neighborhood"),
        Cell::from("Award"),
    ])
    .style(
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    );

    let max_visible_rows = area.height.saturating_sub(3) as usize;
    let offset = scroll_offset(total_rows, max_visible_rows, app.selected_row);

    let rows = app
        .explorer
        .visible()
        .enumerate()
        .skip(offset)
        .take(max_visible_rows)
        .map(|(index, restaurant)| {
            let (award, award_color) = award_cell(restaurant);
            let favorite = app.is_favorite(&restaurant.slug);
            let style = if index == app.selected_row {
                Style::default()
                    .bg(Color::Rgb(0, 0, 238))
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };

            Row::new(vec![
                Cell::from(Span::styled(
                    if favorite { "♥" } else { " " },
                    Style::default().fg(FAVORITE_COLOR),
                )),
                Cell::from(restaurant.name.clone()),
                Cell::from(restaurant.neighborhood.clone()),
                Cell::from(Span::styled(award, Style::default().fg(award_color))),
            ])
            .style(style)
        });

    let widths = [
        Constraint::Length(1),
        Constraint::Percentage(45),
        Constraint::Percentage(30),
        Constraint::Percentage(25),
    ];

    Table::new(rows, widths)
        .header(header)
        .block(block)
        .column_spacing(1)
        .render(area, buf);
}

fn legend_color(key: LegendKey) -> Color {
    match key {
        LegendKey::Michelin => marker_color(MarkerKind::Michelin),
        LegendKey::Bib => marker_color(MarkerKind::Bib),
        LegendKey::Nyt => marker_color(MarkerKind::Nyt),
        LegendKey::Regular => marker_color(MarkerKind::Regular),
        LegendKey::Favorites => FAVORITE_COLOR,
    }
}

fn render_legend(app: &App, area: Rect, buf: &mut Buffer) {
    let active = &app.explorer.query().legend;
    let mut spans = Vec::new();

    for (index, (key, count)) in app.legend_counts().into_iter().enumerate() {
        let mut style = Style::default().fg(legend_color(key));
        if active.contains(key) {
            style = style.add_modifier(Modifier::BOLD | Modifier::REVERSED);
        }
        spans.push(Span::styled(format!("{} ", index + 1), Style::default().fg(Color::Yellow)));
        spans.push(Span::styled(format!("● {} ({count})", key.label()), style));
        spans.push(Span::raw("  "));
    }

    Paragraph::new(TextLine::from(spans))
        .block(
            Block::default()
                .title("Legend")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan)),
        )
        .wrap(ratatui::widgets::Wrap { trim: true })
        .render(area, buf);
}

fn suggestion_area(header: Rect, list: Rect, count: usize) -> Rect {
    let height = u16::try_from(count).unwrap_or(u16::MAX).saturating_add(2);
    Rect {
        x: list.x,
        y: header.bottom(),
        width: list.width,
        height: height.min(list.height),
    }
}

fn render_suggestions(app: &App, area: Rect, buf: &mut Buffer) {
    let suggestions = app.suggestions();
    if suggestions.is_empty() {
        return;
    }

    Clear.render(area, buf);
    let lines: Vec<TextLine<'_>> = suggestions
        .iter()
        .enumerate()
        .map(|(index, restaurant)| {
            let style = if app.suggestion_index == Some(index) {
                Style::default()
                    .bg(Color::Rgb(0, 0, 238))
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            TextLine::from(vec![
                Span::styled(restaurant.name.clone(), style),
                Span::styled(
                    format!("  {}", restaurant.neighborhood),
                    Style::default().fg(Color::DarkGray),
                ),
            ])
        })
        .collect();

    Paragraph::new(lines)
        .block(
            Block::default()
                .title("Suggestions (Tab)")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Yellow)),
        )
        .render(area, buf);
}

fn render_status(app: &App, f: &mut Frame<'_>, area: Rect) {
    let status = if app.status_message.is_empty() {
        format!(
            "{} favorites · {} map",
            app.favorites.favorites().len(),
            nyc_rw_core::MapBackend::name(&app.map)
        )
    } else {
        app.status_message.clone()
    };

    let mut keys = Vec::new();
    for (key, description) in [
        ("/", ": Search  "),
        ("Enter", ": Details  "),
        ("f", ": Favorite  "),
        ("F", ": Favorites only  "),
        ("1-5", ": Legend  "),
        ("c", ": Filters  "),
        ("x", ": Reset  "),
        ("s", ": Share  "),
        ("F1", ": Help  "),
        ("q", ": Quit"),
    ] {
        keys.extend(shortcut(key, description));
    }

    let paragraph = Paragraph::new(vec![
        TextLine::from(Span::styled(status, Style::default().fg(Color::Cyan))),
        TextLine::from(keys),
    ])
    .block(Block::default().borders(Borders::TOP))
    .alignment(Alignment::Center);

    f.render_widget(paragraph, area);
}
