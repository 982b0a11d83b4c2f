use crate::ui::widgets::popup::{centered_rect, ClearWidget};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line as TextLine, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

const SHORTCUTS: [(&str, &str); 17] = [
    ("/", "Search by name (Tab cycles suggestions)"),
    ("↑/↓ PgUp/PgDn", "Move through the list"),
    ("Enter", "Open the restaurant card"),
    ("Mouse click", "Open the card for a map pin"),
    ("f", "Toggle favorite"),
    ("F", "Show favorites only"),
    ("1-5", "Michelin, Bib, NYT, The Rest, Favorites"),
    ("m / b", "Michelin Star or Bib Gourmand only"),
    ("h", "Has an online menu"),
    ("c", "Open the filter picker"),
    ("u", "Remove the last applied filter"),
    ("x", "Reset all filters"),
    ("s", "Show the share link for favorites"),
    ("r", "Retry a panel that failed to draw"),
    ("Esc", "Close the card or leave search"),
    ("F1 / ?", "Toggle this help"),
    ("q", "Quit"),
];

pub fn render_help(f: &mut Frame<'_>) {
    let area = centered_rect(60, 70, f.area());
    f.render_widget(ClearWidget, area);

    let lines: Vec<TextLine<'_>> = SHORTCUTS
        .iter()
        .map(|(key, description)| {
            TextLine::from(vec![
                Span::styled(
                    format!("{key:>15}  "),
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::raw(*description),
            ])
        })
        .collect();

    let help = Paragraph::new(lines).block(
        Block::default()
            .title("Keyboard Shortcuts")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow)),
    );
    f.render_widget(help, area);
}
