use crate::app::state::App;
use crossterm::event::KeyCode;

pub fn handle_help_toggle(app: &mut App, key: KeyCode) -> bool {
    let search_typing = app.search_editing && key == KeyCode::Char('?');
    if key == KeyCode::F(1) || (key == KeyCode::Char('?') && !search_typing) {
        app.show_help = !app.show_help;
        return true;
    }

    if app.show_help {
        if key == KeyCode::Esc {
            app.show_help = false;
        }
        return true;
    }

    false
}

/// `r` re-renders panels that failed to draw; only claimed while a fault is showing.
pub fn handle_retry(app: &mut App, key: KeyCode) -> bool {
    if key == KeyCode::Char('r') && !app.search_editing && app.has_faults() {
        app.retry_faults();
        return true;
    }

    false
}
