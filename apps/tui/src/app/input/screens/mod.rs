use crate::app::state::{App, AppScreen};
use crossterm::event::KeyCode;

mod card;
mod explore;
mod filters;
mod help;
mod search;

pub fn dispatch_input(app: &mut App, key: KeyCode) {
    if help::handle_help_toggle(app, key) {
        return;
    }

    if help::handle_retry(app, key) {
        return;
    }

    if app.search_editing {
        search::handle_search_input(app, key);
        return;
    }

    match app.screen {
        AppScreen::Explore => explore::handle_explore_input(app, key),
        AppScreen::Filters => filters::handle_filters_input(app, key),
        AppScreen::Card => card::handle_card_input(app, key),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::state::test_support::app;
    use nyc_rw_core::LegendKey;

    fn press(app: &mut App, keys: &[KeyCode]) {
        for key in keys {
            dispatch_input(app, *key);
        }
    }

    #[test]
    fn help_swallows_keys_until_closed() {
        let mut app = app();
        press(&mut app, &[KeyCode::F(1), KeyCode::Char('q')]);
        assert!(app.show_help);
        assert!(app.running);

        press(&mut app, &[KeyCode::Esc, KeyCode::Char('q')]);
        assert!(!app.show_help);
        assert!(!app.running);
    }

    #[test]
    fn typing_a_search_filters_live_and_enter_opens_the_suggestion() {
        let mut app = app();
        press(
            &mut app,
            &[
                KeyCode::Char('/'),
                KeyCode::Char('l'),
                KeyCode::Char('i'),
                KeyCode::Char('l'),
                KeyCode::Char('?'),
            ],
        );
        assert!(app.search_editing);
        assert!(!app.show_help);
        assert_eq!(app.explorer.query().search, "lil?");
        assert_eq!(app.explorer.visible_len(), 0);

        press(&mut app, &[KeyCode::Backspace, KeyCode::Tab, KeyCode::Enter]);
        assert_eq!(app.screen, AppScreen::Card);
        assert_eq!(app.focused().map(|r| r.slug.as_str()), Some("lilia"));

        press(&mut app, &[KeyCode::Esc]);
        assert_eq!(app.screen, AppScreen::Explore);
        assert!(app.explorer.state().selected.is_none());
    }

    #[test]
    fn award_shortcuts_are_mutually_exclusive() {
        let mut app = app();
        press(&mut app, &[KeyCode::Char('m')]);
        assert!(app.explorer.query().legend.contains(LegendKey::Michelin));
        press(&mut app, &[KeyCode::Char('b')]);
        assert!(app.explorer.query().legend.contains(LegendKey::Bib));
        assert!(!app.explorer.query().legend.contains(LegendKey::Michelin));
        let visible: Vec<_> = app.explorer.visible().map(|r| r.slug.as_str()).collect();
        assert_eq!(visible, vec!["dhamaka"]);
    }

    #[test]
    fn legend_digits_toggle_keys() {
        let mut app = app();
        press(&mut app, &[KeyCode::Char('3'), KeyCode::Char('4')]);
        let visible: Vec<_> = app.explorer.visible().map(|r| r.slug.as_str()).collect();
        assert_eq!(visible, vec!["lilia", "deli"]);
        press(&mut app, &[KeyCode::Char('3'), KeyCode::Char('4')]);
        assert_eq!(app.explorer.visible_len(), 4);
    }

    #[test]
    fn filters_screen_toggles_and_clears_options() {
        let mut app = app();
        // Cuisine options sort by count then name; "American (New)" comes first
        press(&mut app, &[KeyCode::Char('c'), KeyCode::Right, KeyCode::Enter]);
        assert_eq!(app.screen, AppScreen::Filters);
        let visible: Vec<_> = app.explorer.visible().map(|r| r.slug.as_str()).collect();
        assert_eq!(visible, vec!["gramercy"]);

        press(&mut app, &[KeyCode::Char('d')]);
        assert_eq!(app.explorer.visible_len(), 4);

        // Has Menu is the last category and toggles as a single switch
        press(&mut app, &[KeyCode::Left, KeyCode::Up, KeyCode::Right, KeyCode::Char(' ')]);
        let visible: Vec<_> = app.explorer.visible().map(|r| r.slug.as_str()).collect();
        assert_eq!(visible, vec!["gramercy"]);

        press(&mut app, &[KeyCode::Esc]);
        assert_eq!(app.screen, AppScreen::Explore);
    }

    #[test]
    fn card_favorite_and_share() {
        let mut app = app();
        press(&mut app, &[KeyCode::Down, KeyCode::Enter]);
        assert_eq!(app.screen, AppScreen::Card);

        press(&mut app, &[KeyCode::Char('f'), KeyCode::Char('s')]);
        assert!(app.is_favorite("dhamaka"));
        assert_eq!(
            app.status_message,
            "Share link: http://localhost:5173/#favorites=dhamaka"
        );
    }

    #[test]
    fn retry_is_only_claimed_while_faulted() {
        let mut app = app();
        app.record_fault(crate::app::state::Region::Map, "boom".into());
        press(&mut app, &[KeyCode::Char('r')]);
        assert!(!app.has_faults());
    }
}
