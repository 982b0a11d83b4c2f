use crate::app::App;
use nyc_rw_core::{ActiveBackend, GeoPoint, MapBackend, MarkerKind};
use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols;
use ratatui::text::Span;
use ratatui::widgets::canvas::{Canvas, Line as CanvasLine, Points};
use ratatui::widgets::{Block, Borders, Paragraph, Widget};

pub const FAVORITE_COLOR: Color = Color::LightRed;

const BOROUGH_LABELS: [(&str, f64, f64); 5] = [
    ("Manhattan", 40.7831, -73.9712),
    ("Brooklyn", 40.6500, -73.9496),
    ("Queens", 40.7282, -73.7949),
    ("Bronx", 40.8448, -73.8648),
    ("Staten Is.", 40.5795, -74.1502),
];

// Awards last so they sit on top of regular pins
const DRAW_ORDER: [MarkerKind; 4] = [
    MarkerKind::Regular,
    MarkerKind::Nyt,
    MarkerKind::Bib,
    MarkerKind::Michelin,
];

pub const fn marker_color(kind: MarkerKind) -> Color {
    match kind {
        // Black pins vanish on dark terminals
        MarkerKind::Regular => Color::Gray,
        _ => {
            let (r, g, b) = kind.rgb();
            Color::Rgb(r, g, b)
        }
    }
}

fn map_title(backend: &ActiveBackend) -> String {
    match backend {
        ActiveBackend::Tiles(tiles) => format!("Map (tiles, zoom {})", tiles.zoom()),
        ActiveBackend::Schematic(_) => "Map (schematic, offline)".to_string(),
    }
}

pub fn render_map(app: &App, area: Rect, buf: &mut Buffer) {
    let block = Block::default()
        .title(map_title(&app.map))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    let inner = block.inner(area);
    block.render(area, buf);
    app.map_area.set(inner);

    if inner.width < 4 || inner.height < 3 {
        return;
    }

    if app.markers.is_empty() {
        Paragraph::new("No restaurants to pin")
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::Gray))
            .render(inner, buf);
        return;
    }

    let groups: Vec<(Color, Vec<(f64, f64)>)> = DRAW_ORDER
        .iter()
        .map(|kind| {
            let coords = app
                .markers
                .iter()
                .filter(|marker| marker.kind == *kind)
                .map(|marker| (marker.x, marker.y))
                .collect();
            (marker_color(*kind), coords)
        })
        .collect();

    let labels: Vec<(&str, (f64, f64))> = BOROUGH_LABELS
        .iter()
        .filter_map(|(name, lat, lng)| {
            let point = GeoPoint::new(*lat, *lng)?;
            Some((*name, app.map.project(point)?))
        })
        .collect();

    let focused = app
        .focused()
        .and_then(|restaurant| app.markers.iter().find(|m| m.slug == restaurant.slug));
    let schematic = matches!(app.map, ActiveBackend::Schematic(_));

    Canvas::default()
        .marker(symbols::Marker::Braille)
        .x_bounds([0.0, 1.0])
        .y_bounds([0.0, 1.0])
        .paint(|ctx| {
            if schematic {
                for step in [0.25, 0.5, 0.75] {
                    ctx.draw(&CanvasLine {
                        x1: step,
                        y1: 0.0,
                        x2: step,
                        y2: 1.0,
                        color: Color::DarkGray,
                    });
                    ctx.draw(&CanvasLine {
                        x1: 0.0,
                        y1: step,
                        x2: 1.0,
                        y2: step,
                        color: Color::DarkGray,
                    });
                }
            }

            for (name, (x, y)) in &labels {
                ctx.print(*x, *y, Span::styled(*name, Style::default().fg(Color::DarkGray)));
            }
            ctx.layer();

            for (color, coords) in &groups {
                ctx.draw(&Points {
                    coords,
                    color: *color,
                });
            }
            ctx.layer();

            for marker in app.markers.iter().filter(|m| m.favorite) {
                ctx.print(
                    marker.x,
                    marker.y,
                    Span::styled("♥", Style::default().fg(FAVORITE_COLOR)),
                );
            }

            if let Some(marker) = focused {
                ctx.print(
                    marker.x,
                    marker.y,
                    Span::styled(
                        "◉",
                        Style::default()
                            .fg(Color::Yellow)
                            .add_modifier(Modifier::BOLD),
                    ),
                );
            }
        })
        .render(inner, buf);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::state::test_support::app;
    use nyc_rw_core::Action;

    #[test]
    fn map_records_its_inner_area() {
        let app = app();
        let area = Rect::new(0, 0, 40, 20);
        let mut buf = Buffer::empty(area);
        render_map(&app, area, &mut buf);
        assert_eq!(app.map_area.get(), Rect::new(1, 1, 38, 18));
    }

    #[test]
    fn empty_map_says_so() {
        let mut app = app();
        app.dispatch(Action::SetSearch("no such place".into()));
        let area = Rect::new(0, 0, 40, 10);
        let mut buf = Buffer::empty(area);
        render_map(&app, area, &mut buf);
        let text: String = buf.content().iter().map(|cell| cell.symbol()).collect();
        assert!(text.contains("No restaurants to pin"));
    }

    #[test]
    fn regular_pins_stay_visible() {
        assert_eq!(marker_color(MarkerKind::Regular), Color::Gray);
        assert_eq!(marker_color(MarkerKind::Michelin), Color::Rgb(200, 18, 36));
    }
}
