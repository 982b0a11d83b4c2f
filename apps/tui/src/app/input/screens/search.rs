use crate::app::input::helpers::{wrap_decrement, wrap_increment};
use crate::app::state::App;
use crossterm::event::KeyCode;

pub fn handle_search_input(app: &mut App, key: KeyCode) {
    let suggestion_count = app.suggestions().len();

    match key {
        KeyCode::Esc => {
            app.search_editing = false;
            app.suggestion_index = None;
        }
        KeyCode::Enter => {
            if !app.accept_suggestion() {
                app.search_editing = false;
            }
        }
        KeyCode::Tab | KeyCode::Down => {
            app.suggestion_index = match app.suggestion_index {
                None if suggestion_count > 0 => Some(0),
                Some(index) => Some(wrap_increment(index, suggestion_count)),
                None => None,
            };
        }
        KeyCode::BackTab | KeyCode::Up => {
            app.suggestion_index = match app.suggestion_index {
                Some(0) | None => None,
                Some(index) => Some(wrap_decrement(index, suggestion_count)),
            };
        }
        KeyCode::Backspace => {
            let mut term = app.search_input.clone();
            term.pop();
            app.set_search(term);
        }
        KeyCode::Char(ch) => {
            let mut term = app.search_input.clone();
            term.push(ch);
            app.set_search(term);
        }
        _ => {}
    }
}
