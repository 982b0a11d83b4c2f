use crate::app::state::{App, AppScreen, FilterFocus};
use crossterm::event::KeyCode;
use nyc_rw_core::{Action, LegendKey};

const PAGE: usize = 5;

pub fn handle_explore_input(app: &mut App, key: KeyCode) {
    let total_rows = app.explorer.visible_len();

    match key {
        KeyCode::Char('q') => {
            app.running = false;
        }
        KeyCode::Up => {
            app.selected_row = app.selected_row.saturating_sub(1);
        }
        KeyCode::Down => {
            if app.selected_row + 1 < total_rows {
                app.selected_row += 1;
            }
        }
        KeyCode::PageUp => {
            app.selected_row = app.selected_row.saturating_sub(PAGE);
        }
        KeyCode::PageDown => {
            if total_rows > 0 {
                app.selected_row = (app.selected_row + PAGE).min(total_rows - 1);
            }
        }
        KeyCode::Home => {
            app.selected_row = 0;
        }
        KeyCode::End => {
            app.selected_row = total_rows.saturating_sub(1);
        }
        KeyCode::Enter => app.open_card(),
        KeyCode::Char('/') => {
            app.search_editing = true;
            app.suggestion_index = None;
        }
        KeyCode::Char('f') => app.toggle_favorite(),
        KeyCode::Char('F') => app.dispatch(Action::ToggleFavoritesActive),
        KeyCode::Char(digit @ '1'..='5') => {
            let index = usize::from(digit as u8 - b'1');
            if let Some(legend) = LegendKey::ALL.get(index) {
                app.dispatch(Action::ToggleLegend(*legend));
            }
        }
        KeyCode::Char('m') => app.dispatch(Action::ToggleExclusiveAward(LegendKey::Michelin)),
        KeyCode::Char('b') => app.dispatch(Action::ToggleExclusiveAward(LegendKey::Bib)),
        KeyCode::Char('h') => app.dispatch(Action::ToggleHasMenu),
        KeyCode::Char('c') => {
            app.filter_focus = FilterFocus::Categories;
            app.filter_option_index = 0;
            app.screen = AppScreen::Filters;
        }
        KeyCode::Char('u') => app.remove_last_chip(),
        KeyCode::Char('x') => app.reset_all(),
        KeyCode::Char('s') => app.show_share_link(),
        KeyCode::Esc => {
            if !app.search_input.is_empty() {
                app.set_search(String::new());
            }
        }
        _ => {}
    }
}
