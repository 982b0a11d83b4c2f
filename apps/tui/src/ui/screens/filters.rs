use crate::app::state::{FilterFocus, Region};
use crate::app::App;
use crate::ui::widgets::popup::{centered_rect, ClearWidget};
use crate::ui::widgets::tables::scroll_offset;
use crate::ui::{guarded, shortcut};
use nyc_rw_core::FilterCategory;
use ratatui::buffer::Buffer;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line as TextLine, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Widget};
use ratatui::Frame;

pub fn render_filters(app: &App, f: &mut Frame<'_>) {
    let area = centered_rect(80, 75, f.area());
    guarded(app, f, Region::Filters, area, render_filters_body);
}

fn focus_border(app: &App, focus: FilterFocus) -> Style {
    if app.filter_focus == focus {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::Cyan)
    }
}

const fn selected_style() -> Style {
    Style::new()
        .bg(Color::Rgb(0, 0, 238))
        .fg(Color::White)
        .add_modifier(Modifier::BOLD)
}

fn render_filters_body(app: &App, area: Rect, buf: &mut Buffer) {
    ClearWidget.render(area, buf);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(4), Constraint::Length(2)])
        .split(area);
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(30), Constraint::Percentage(70)])
        .split(rows[0]);

    let filters = &app.explorer.query().filters;
    let category_lines: Vec<TextLine<'_>> = FilterCategory::ALL
        .iter()
        .enumerate()
        .map(|(index, category)| {
            let active = filters.selected(*category).map_or(0, |values| values.len());
            let label = if active > 0 {
                format!("{} ({active})", category.label())
            } else {
                category.label().to_string()
            };
            let style = if index == app.filter_category_index {
                selected_style()
            } else {
                Style::default()
            };
            TextLine::from(Span::styled(label, style))
        })
        .collect();

    Paragraph::new(category_lines)
        .block(
            Block::default()
                .title("Categories")
                .borders(Borders::ALL)
                .border_style(focus_border(app, FilterFocus::Categories)),
        )
        .render(columns[0], buf);

    let category = app.current_category();
    let options = app.options_for(category);
    let max_visible_rows = columns[1].height.saturating_sub(2) as usize;
    let offset = scroll_offset(options.len(), max_visible_rows, app.filter_option_index);

    let option_lines: Vec<TextLine<'_>> = options
        .iter()
        .enumerate()
        .skip(offset)
        .take(max_visible_rows)
        .map(|(index, option)| {
            let checked = filters.is_selected(category, &option.value);
            let label = if category.is_toggle() {
                "Has an online menu".to_string()
            } else {
                option.value.clone()
            };
            let text = format!(
                "[{}] {label} ({})",
                if checked { "x" } else { " " },
                option.count
            );
            let style = if app.filter_focus == FilterFocus::Options
                && index == app.filter_option_index
            {
                selected_style()
            } else if checked {
                Style::default().fg(Color::Green)
            } else {
                Style::default()
            };
            TextLine::from(Span::styled(text, style))
        })
        .collect();

    Paragraph::new(option_lines)
        .block(
            Block::default()
                .title(category.label())
                .borders(Borders::ALL)
                .border_style(focus_border(app, FilterFocus::Options)),
        )
        .render(columns[1], buf);

    let mut keys = Vec::new();
    for (key, description) in [
        ("←/→", ": Focus   "),
        ("↑/↓", ": Move   "),
        ("Space", ": Toggle   "),
        ("d", ": Clear category   "),
        ("x", ": Reset all   "),
        ("Esc", ": Done"),
    ] {
        keys.extend(shortcut(key, description));
    }
    Paragraph::new(TextLine::from(keys))
        .block(Block::default().borders(Borders::TOP))
        .alignment(ratatui::layout::Alignment::Center)
        .render(rows[1], buf);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::state::test_support::app;
    use nyc_rw_core::Action;

    #[test]
    fn options_show_counts_and_checks() {
        let mut app = app();
        app.dispatch(Action::ToggleOption(FilterCategory::Cuisine, "Italian".into()));
        let area = Rect::new(0, 0, 80, 20);
        let mut buf = Buffer::empty(area);
        render_filters_body(&app, area, &mut buf);

        let text: String = buf.content().iter().map(|cell| cell.symbol()).collect();
        assert!(text.contains("Cuisine (1)"));
        assert!(text.contains("[x] Italian (1)"));
        assert!(text.contains("[ ] Indian (1)"));
    }
}
