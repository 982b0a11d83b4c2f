use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use nyc_rw_core::{FilterCategory, FragmentHost, KeyValueStore, LegendKey, MarkerKind, Restaurant};
use ratzilla::ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line as TextLine, Span},
    widgets::{
        canvas::{Canvas, Points},
        Block, Borders, Cell, Clear, Paragraph, Row, Table, Widget, Wrap,
    },
};

use crate::app::WebApp;

/// Draws the explorer into a scratch buffer; a panic leaves an error panel instead.
pub fn draw_guarded<S: KeyValueStore, H: FragmentHost>(
    app: &WebApp<S, H>,
    area: Rect,
    buf: &mut Buffer,
) {
    let existing = app.fault.borrow().clone();
    if let Some(message) = existing {
        render_fault(&message, area, buf);
        return;
    }

    let mut scratch = Buffer::empty(area);
    match panic::catch_unwind(AssertUnwindSafe(|| render_explorer(app, area, &mut scratch))) {
        Ok(()) => buf.merge(&scratch),
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            web_sys::console::error_1(&format!("Render fault: {message}").into());
            render_fault(&message, area, buf);
            *app.fault.borrow_mut() = Some(message);
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown error".to_string())
}

fn render_fault(message: &str, area: Rect, buf: &mut Buffer) {
    let text = vec![
        TextLine::from(Span::styled(
            "Something went wrong drawing the explorer.",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )),
        TextLine::from(Span::styled(message.to_string(), Style::default().fg(Color::Gray))),
        TextLine::from(vec![
            Span::raw("Press "),
            Span::styled(
                "r",
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw(" to try again"),
        ]),
    ];
    Paragraph::new(text)
        .block(
            Block::default()
                .title("Explorer unavailable")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Red)),
        )
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .render(area, buf);
}

pub fn render_explorer<S: KeyValueStore, H: FragmentHost>(
    app: &WebApp<S, H>,
    area: Rect,
    buf: &mut Buffer,
) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(12),
            Constraint::Length(3),
        ])
        .split(area);

    render_search(app, rows[0], buf);

    let content = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(rows[1]);
    render_list(app, content[0], buf);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(55),
            Constraint::Length(3),
            Constraint::Min(6),
        ])
        .split(content[1]);
    render_map(app, right[0], buf);
    render_legend(app, right[1], buf);
    render_detail(app, right[2], buf);

    render_footer(app, rows[2], buf);

    if app.search_editing {
        render_suggestions(app, content[0], buf);
    }
    if app.picker.is_some() {
        render_picker(app, rows[1], buf);
    }
}

fn render_search<S: KeyValueStore, H: FragmentHost>(app: &WebApp<S, H>, area: Rect, buf: &mut Buffer) {
    let term = &app.explorer.query().search;
    let text = if app.search_editing {
        format!("{term}_")
    } else if term.is_empty() {
        "Press / to search".to_string()
    } else {
        term.clone()
    };
    let border = if app.search_editing {
        Color::Yellow
    } else {
        Color::Gray
    };
    Paragraph::new(text)
        .block(
            Block::default()
                .title("Search")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border)),
        )
        .render(area, buf);
}

fn render_suggestions<S: KeyValueStore, H: FragmentHost>(
    app: &WebApp<S, H>,
    list_area: Rect,
    buf: &mut Buffer,
) {
    let suggestions = app.suggestions();
    if suggestions.is_empty() {
        return;
    }
    #[allow(clippy::cast_possible_truncation)]
    let height = (suggestions.len() as u16 + 2).min(list_area.height);
    let area = Rect::new(list_area.x, list_area.y, list_area.width, height);

    let lines: Vec<TextLine<'_>> = suggestions
        .iter()
        .enumerate()
        .map(|(index, restaurant)| {
            let style = if app.suggestion_index == Some(index) {
                Style::default().bg(Color::Rgb(0, 0, 238)).fg(Color::White)
            } else {
                Style::default()
            };
            TextLine::from(Span::styled(restaurant.name.clone(), style))
        })
        .collect();

    Clear.render(area, buf);
    Paragraph::new(lines)
        .block(
            Block::default()
                .title("Suggestions (Tab / Enter)")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Yellow)),
        )
        .render(area, buf);
}

fn render_list<S: KeyValueStore, H: FragmentHost>(app: &WebApp<S, H>, area: Rect, buf: &mut Buffer) {
    let height = area.height.saturating_sub(3) as usize;
    let offset = if app.selected_row >= height {
        app.selected_row + 1 - height
    } else {
        0
    };

    let rows = app
        .explorer
        .visible()
        .enumerate()
        .skip(offset)
        .take(height)
        .map(|(index, restaurant)| {
            let heart = if app.is_favorite(&restaurant.slug) {
                "♥"
            } else {
                " "
            };
            let style = if index == app.selected_row {
                Style::default().bg(Color::Rgb(0, 0, 238)).fg(Color::White)
            } else {
                Style::default()
            };
            Row::new(vec![
                Cell::from(heart).style(Style::default().fg(Color::LightRed)),
                Cell::from(restaurant.name.clone()),
                Cell::from(restaurant.neighborhood.clone()),
            ])
            .style(style)
        });

    Widget::render(
        Table::new(
            rows,
            [
                Constraint::Length(2),
                Constraint::Percentage(60),
                Constraint::Percentage(40),
            ],
        )
        .header(
            Row::new(vec!["", "Name", "Neighborhood"])
                .style(Style::default().add_modifier(Modifier::BOLD)),
        )
        .block(
            Block::default()
                .title(format!(
                    "Restaurants ({} of {})",
                    app.explorer.visible_len(),
                    app.explorer.dataset().len()
                ))
                .borders(Borders::ALL),
        ),
        area,
        buf,
    );
}

const fn marker_color(kind: MarkerKind) -> Color {
    let (r, g, b) = kind.rgb();
    match kind {
        MarkerKind::Regular => Color::Gray,
        _ => Color::Rgb(r, g, b),
    }
}

fn render_map<S: KeyValueStore, H: FragmentHost>(app: &WebApp<S, H>, area: Rect, buf: &mut Buffer) {
    let focused = app.focused().map(|r| r.slug.as_str());
    Canvas::default()
        .block(Block::default().title("Map").borders(Borders::ALL))
        .x_bounds([0.0, 1.0])
        .y_bounds([0.0, 1.0])
        .paint(|ctx| {
            for kind in [
                MarkerKind::Regular,
                MarkerKind::Nyt,
                MarkerKind::Bib,
                MarkerKind::Michelin,
            ] {
                let coords: Vec<(f64, f64)> = app
                    .markers
                    .iter()
                    .filter(|m| m.kind == kind && !m.favorite)
                    .map(|m| (m.x, m.y))
                    .collect();
                ctx.draw(&Points {
                    coords: &coords,
                    color: marker_color(kind),
                });
            }
            ctx.layer();
            for marker in app.markers.iter().filter(|m| m.favorite) {
                ctx.print(marker.x, marker.y, Span::styled("♥", Style::default().fg(Color::LightRed)));
            }
            if let Some(marker) = app.markers.iter().find(|m| Some(m.slug.as_str()) == focused) {
                ctx.print(marker.x, marker.y, Span::styled("◉", Style::default().fg(Color::Yellow)));
            }
        })
        .render(area, buf);
}

fn render_legend<S: KeyValueStore, H: FragmentHost>(app: &WebApp<S, H>, area: Rect, buf: &mut Buffer) {
    let legend = &app.explorer.query().legend;
    let mut spans = Vec::new();
    for (index, key) in LegendKey::ALL.iter().enumerate() {
        let style = if legend.contains(*key) {
            Style::default().fg(Color::Black).bg(Color::Yellow)
        } else {
            Style::default().fg(Color::Gray)
        };
        spans.push(Span::styled(format!(" {} {} ", index + 1, key.label()), style));
        spans.push(Span::raw(" "));
    }
    Paragraph::new(TextLine::from(spans))
        .block(Block::default().title("Legend").borders(Borders::ALL))
        .render(area, buf);
}

pub fn detail_lines(restaurant: &Restaurant, favorite: bool) -> Vec<TextLine<'static>> {
    let mut lines = vec![TextLine::from(Span::styled(
        format!("{}{}", restaurant.name, if favorite { " ♥" } else { "" }),
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    ))];
    if let Some(award) = restaurant.michelin_award {
        lines.push(TextLine::from(award.label()));
    }
    if let Some(rank) = &restaurant.nyttop100_rank {
        lines.push(TextLine::from(format!("NYT Top 100 #{rank}")));
    }
    let place = [restaurant.neighborhood.as_str(), restaurant.borough.as_str()]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ");
    if !place.is_empty() {
        lines.push(TextLine::from(place));
    }
    if !restaurant.cuisine.is_empty() {
        lines.push(TextLine::from(restaurant.cuisine_label()));
    }
    if let Some(summary) = &restaurant.summary {
        lines.push(TextLine::from(""));
        lines.push(TextLine::from(summary.clone()));
    }
    if let Some(menu) = &restaurant.menu_url {
        lines.push(TextLine::from(format!("Menu: {menu}")));
    }
    lines
}

fn render_detail<S: KeyValueStore, H: FragmentHost>(app: &WebApp<S, H>, area: Rect, buf: &mut Buffer) {
    let lines = app
        .explorer
        .selected()
        .map(|r| detail_lines(r, app.is_favorite(&r.slug)))
        .unwrap_or_else(|| vec![TextLine::from("Press Enter to open a restaurant")]);
    Paragraph::new(lines)
        .block(Block::default().title("Restaurant Details").borders(Borders::ALL))
        .wrap(Wrap { trim: true })
        .render(area, buf);
}

fn render_picker<S: KeyValueStore, H: FragmentHost>(app: &WebApp<S, H>, area: Rect, buf: &mut Buffer) {
    let (Some(picker), Some(current)) = (app.picker, app.picker_category()) else {
        return;
    };
    let filters = &app.explorer.query().filters;

    Clear.render(area, buf);
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
        .split(area);

    let categories: Vec<TextLine<'_>> = FilterCategory::ALL
        .iter()
        .map(|category| {
            let count = filters.selected(*category).map_or(0, |values| values.len());
            let style = if *category == current && !picker.options_focused {
                Style::default().bg(Color::Rgb(0, 0, 238)).fg(Color::White)
            } else if *category == current {
                Style::default().fg(Color::Cyan)
            } else {
                Style::default()
            };
            TextLine::from(Span::styled(format!("{} ({count})", category.label()), style))
        })
        .collect();
    Paragraph::new(categories)
        .block(
            Block::default()
                .title("Filters")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Yellow)),
        )
        .render(columns[0], buf);

    let height = columns[1].height.saturating_sub(2) as usize;
    let offset = if picker.option_index >= height {
        picker.option_index + 1 - height
    } else {
        0
    };
    let options: Vec<TextLine<'_>> = app
        .options_for(current)
        .iter()
        .enumerate()
        .skip(offset)
        .take(height)
        .map(|(index, option)| {
            let mark = if filters.is_selected(current, &option.value) {
                "[x]"
            } else {
                "[ ]"
            };
            let label = if current.is_toggle() {
                "Has a menu link"
            } else {
                option.value.as_str()
            };
            let style = if picker.options_focused && index == picker.option_index {
                Style::default().bg(Color::Rgb(0, 0, 238)).fg(Color::White)
            } else {
                Style::default()
            };
            TextLine::from(Span::styled(format!("{mark} {label} ({})", option.count), style))
        })
        .collect();
    Paragraph::new(options)
        .block(
            Block::default()
                .title(format!("{} (Enter toggles, Backspace clears, Esc closes)", current.label()))
                .borders(Borders::ALL),
        )
        .render(columns[1], buf);
}

fn render_footer<S: KeyValueStore, H: FragmentHost>(app: &WebApp<S, H>, area: Rect, buf: &mut Buffer) {
    let key = Style::default().fg(Color::Yellow);
    let text = if app.status.is_empty() {
        TextLine::from(vec![
            Span::styled("/", key),
            Span::raw(" search  "),
            Span::styled("c", key),
            Span::raw(" filters  "),
            Span::styled("f", key),
            Span::raw(" favorite  "),
            Span::styled("F", key),
            Span::raw(" favorites only  "),
            Span::styled("1-5", key),
            Span::raw(" legend  "),
            Span::styled("s", key),
            Span::raw(" share  "),
            Span::styled("x", key),
            Span::raw(" reset"),
        ])
    } else {
        TextLine::from(app.status.clone())
    };
    Paragraph::new(text)
        .block(Block::default().borders(Borders::ALL))
        .render(area, buf);
}
