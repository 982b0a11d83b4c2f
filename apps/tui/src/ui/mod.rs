// UI module for the restaurant explorer
// Handles all UI rendering functions

pub mod screens;
pub mod widgets;

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use crate::app::state::{AppScreen, Region};
use crate::app::App;
use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line as TextLine, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Widget, Wrap};
use ratatui::Frame;
use tracing::error;

pub fn ui(app: &App, f: &mut Frame<'_>) {
    screens::explore::render_explore(app, f);

    match app.screen {
        AppScreen::Explore => {}
        AppScreen::Filters => screens::filters::render_filters(app, f),
        AppScreen::Card => screens::card::render_card(app, f),
    }

    if app.show_help {
        screens::help::render_help(f);
    }
}

/// Draws one region into its own buffer so a panic only blanks that region.
pub fn guarded(
    app: &App,
    f: &mut Frame<'_>,
    region: Region,
    area: Rect,
    draw: impl FnOnce(&App, Rect, &mut Buffer),
) {
    if area.width == 0 || area.height == 0 {
        return;
    }

    let existing = app.render_faults.borrow().get(&region).cloned();
    if let Some(message) = existing {
        render_fault(region, &message, area, f.buffer_mut());
        return;
    }

    let mut scratch = Buffer::empty(area);
    match panic::catch_unwind(AssertUnwindSafe(|| draw(app, area, &mut scratch))) {
        Ok(()) => f.buffer_mut().merge(&scratch),
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!(region = region.label(), %message, "render fault");
            render_fault(region, &message, area, f.buffer_mut());
            app.record_fault(region, message);
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

fn render_fault(region: Region, message: &str, area: Rect, buf: &mut Buffer) {
    let block = Block::default()
        .title(format!("{} unavailable", region.label()))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red));

    let text = vec![
        TextLine::from(Span::styled(
            "Something went wrong drawing this panel.",
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
            Span::raw(" to retry"),
        ]),
    ];

    Paragraph::new(text)
        .block(block)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .render(area, buf);
}

/// A bold yellow key followed by its description, the shortcut bar style.
pub fn shortcut<'a>(key: &'a str, description: &'a str) -> [Span<'a>; 2] {
    [
        Span::styled(
            key,
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(description),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::state::test_support::app;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    fn buffer_text(buffer: &Buffer) -> String {
        buffer.content().iter().map(|cell| cell.symbol()).collect()
    }

    #[test]
    fn explore_screen_renders_list_and_legend() {
        let app = app();
        let mut terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();
        terminal.draw(|f| ui(&app, f)).unwrap();

        let text = buffer_text(terminal.backend().buffer());
        assert!(text.contains("Restaurants (4 of 4)"));
        assert!(text.contains("Gramercy Tavern"));
        assert!(text.contains("Bib Gourmand"));
        assert!(app.map_area.get().width > 0);
        assert!(!app.has_faults());
    }

    #[test]
    fn a_panicking_region_is_contained() {
        let app = app();
        let mut terminal = Terminal::new(TestBackend::new(60, 12)).unwrap();
        terminal
            .draw(|f| {
                let area = f.area();
                let (top, bottom) = (
                    Rect::new(0, 0, area.width, 6),
                    Rect::new(0, 6, area.width, 6),
                );
                guarded(&app, f, Region::Map, top, |_, _, _| panic!("projection blew up"));
                guarded(&app, f, Region::Legend, bottom, |_, area, buf| {
                    Paragraph::new("still here").render(area, buf);
                });
            })
            .unwrap();

        let text = buffer_text(terminal.backend().buffer());
        assert!(text.contains("Map unavailable"));
        assert!(text.contains("still here"));
        assert_eq!(
            app.render_faults.borrow().get(&Region::Map).map(String::as_str),
            Some("projection blew up")
        );
    }

    #[test]
    fn card_and_help_overlays_render() {
        let mut app = app();
        app.open_card();
        let mut terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();
        terminal.draw(|f| ui(&app, f)).unwrap();
        let text = buffer_text(terminal.backend().buffer());
        assert!(text.contains("Restaurant Details"));
        assert!(text.contains("Menu: https://g"));

        app.show_help = true;
        terminal.draw(|f| ui(&app, f)).unwrap();
        let text = buffer_text(terminal.backend().buffer());
        assert!(text.contains("Keyboard Shortcuts"));
    }

    #[test]
    fn search_suggestions_render_while_editing() {
        let mut app = app();
        app.search_editing = true;
        app.search_input = "Lil".to_string();
        app.suggestion_index = Some(0);
        let mut terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();
        terminal.draw(|f| ui(&app, f)).unwrap();

        let text = buffer_text(terminal.backend().buffer());
        assert!(text.contains("Suggestions (Tab)"));
        assert!(text.contains("Lilia"));
    }
}
