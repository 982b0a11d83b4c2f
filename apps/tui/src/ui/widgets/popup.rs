use ratatui::layout::{Constraint, Flex, Layout, Rect};
use ratatui::prelude::Buffer;
use ratatui::widgets::Widget;

/// Overlay area for cards and pickers, as percentages of `area`.
pub fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let [row] = Layout::vertical([Constraint::Percentage(percent_y)])
        .flex(Flex::Center)
        .areas(area);
    let [overlay] = Layout::horizontal([Constraint::Percentage(percent_x)])
        .flex(Flex::Center)
        .areas(row);
    overlay
}

/// Blanks whatever the explore screen drew under an overlay.
pub struct ClearWidget;

impl Widget for ClearWidget {
    fn render(self, area: Rect, buf: &mut Buffer) {
        ratatui::widgets::Clear.render(area, buf);
    }
}
