use crate::app::state::App;
use crossterm::event::KeyCode;

pub fn handle_card_input(app: &mut App, key: KeyCode) {
    match key {
        KeyCode::Esc | KeyCode::Enter | KeyCode::Backspace => app.close_card(),
        KeyCode::Char('f') => app.toggle_favorite(),
        KeyCode::Char('s') => app.show_share_link(),
        KeyCode::Char('q') => {
            app.running = false;
        }
        _ => {}
    }
}
