use crate::app::input::helpers::{wrap_decrement, wrap_increment};
use crate::app::state::{App, AppScreen, FilterFocus};
use crossterm::event::KeyCode;
use nyc_rw_core::{Action, FilterCategory};

pub fn handle_filters_input(app: &mut App, key: KeyCode) {
    let categories = FilterCategory::ALL.len();
    let options = app.options_for(app.current_category()).len();

    match key {
        KeyCode::Esc | KeyCode::Char('c') => {
            app.screen = AppScreen::Explore;
        }
        KeyCode::Char('q') => {
            app.running = false;
        }
        KeyCode::Left => {
            app.filter_focus = FilterFocus::Categories;
        }
        KeyCode::Right | KeyCode::Tab => {
            app.filter_focus = match app.filter_focus {
                FilterFocus::Categories => FilterFocus::Options,
                FilterFocus::Options if key == KeyCode::Tab => FilterFocus::Categories,
                FilterFocus::Options => FilterFocus::Options,
            };
        }
        KeyCode::Up => match app.filter_focus {
            FilterFocus::Categories => {
                app.filter_category_index = wrap_decrement(app.filter_category_index, categories);
                app.filter_option_index = 0;
            }
            FilterFocus::Options => {
                app.filter_option_index = wrap_decrement(app.filter_option_index, options);
            }
        },
        KeyCode::Down => match app.filter_focus {
            FilterFocus::Categories => {
                app.filter_category_index = wrap_increment(app.filter_category_index, categories);
                app.filter_option_index = 0;
            }
            FilterFocus::Options => {
                app.filter_option_index = wrap_increment(app.filter_option_index, options);
            }
        },
        KeyCode::Enter | KeyCode::Char(' ') => {
            if app.filter_focus == FilterFocus::Categories {
                app.filter_focus = FilterFocus::Options;
            }
            app.toggle_current_option();
        }
        KeyCode::Backspace | KeyCode::Char('d') => {
            app.dispatch(Action::ClearCategory(app.current_category()));
        }
        KeyCode::Char('x') => app.reset_all(),
        _ => {}
    }
}
