use std::cell::RefCell;
use std::io;
use std::panic;
use std::rc::Rc;

use nyc_rw_core::{Dataset, FavoritesStore};
use ratzilla::ratatui::{
    layout::{Alignment, Margin},
    style::{Color, Modifier, Style},
    text::{Line as TextLine, Text},
    widgets::{Block, Borders, Paragraph},
    Terminal,
};
use ratzilla::{DomBackend, WebRenderer};
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys::{Request, RequestInit, RequestMode, Response};

mod app;
mod browser;
mod ui;

use app::WebApp;
use browser::{page_url, LocalStorageStore, LocationHashHost};

const DATASET_URL: &str = "FinalData.json";

type BrowserApp = WebApp<LocalStorageStore, LocationHashHost>;

fn main() -> io::Result<()> {
    panic::set_hook(Box::new(|info| {
        web_sys::console::error_1(&format!("panic: {info}").into());
    }));

    let app = Rc::new(RefCell::new(None::<BrowserApp>));
    let load_error = Rc::new(RefCell::new(None::<String>));

    spawn_local(fetch_dataset(app.clone(), load_error.clone()));

    let backend = DomBackend::new()?;
    let mut terminal = Terminal::new(backend)?;

    terminal.on_key_event({
        let app = app.clone();
        move |event| {
            if let Some(app) = app.borrow_mut().as_mut() {
                app.handle_key(event.code);
            }
        }
    });

    terminal.draw_web(move |f| {
        let area = f.area();
        let block = Block::default()
            .title("NYC Restaurant Week")
            .title_style(
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            )
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Gray));
        let inner = block.inner(area).inner(Margin::new(1, 1));
        f.render_widget(block, area);

        if let Some(app) = app.borrow().as_ref() {
            ui::draw_guarded(app, inner, f.buffer_mut());
            return;
        }
        let message = load_error
            .borrow()
            .clone()
            .unwrap_or_else(|| format!("Loading {DATASET_URL}..."));
        let paragraph =
            Paragraph::new(Text::from(TextLine::from(message))).alignment(Alignment::Center);
        f.render_widget(paragraph, inner);
    });

    Ok(())
}

async fn fetch_dataset(store: Rc<RefCell<Option<BrowserApp>>>, load_error: Rc<RefCell<Option<String>>>) {
    let fail = |message: String| {
        web_sys::console::error_1(&message.clone().into());
        *load_error.borrow_mut() = Some(message);
    };

    let Some(window) = web_sys::window() else {
        return;
    };

    let opts = RequestInit::new();
    opts.set_method("GET");
    opts.set_mode(RequestMode::SameOrigin);

    let Ok(request) = Request::new_with_str_and_init(DATASET_URL, &opts) else {
        fail(format!("Failed to build request for {DATASET_URL}"));
        return;
    };

    let Ok(response_value) =
        wasm_bindgen_futures::JsFuture::from(window.fetch_with_request(&request)).await
    else {
        fail(format!("Failed to fetch {DATASET_URL}"));
        return;
    };

    let Ok(response) = response_value.dyn_into::<Response>() else {
        fail("Failed to read response".to_string());
        return;
    };

    if !response.ok() {
        fail(format!(
            "{DATASET_URL} unavailable ({} {})",
            response.status(),
            response.status_text()
        ));
        return;
    }

    let Ok(body) = response.json() else {
        fail(format!("Failed to read {DATASET_URL} body"));
        return;
    };
    let Ok(json) = wasm_bindgen_futures::JsFuture::from(body).await else {
        fail(format!("Failed to read {DATASET_URL} body"));
        return;
    };

    let dataset = serde_wasm_bindgen::from_value::<serde_json::Value>(json)
        .map_err(|error| error.to_string())
        .and_then(|value| Dataset::from_value(value).map_err(|error| error.to_string()));
    match dataset {
        Ok(dataset) => {
            let favorites = FavoritesStore::new(LocalStorageStore::new(), LocationHashHost);
            *store.borrow_mut() = Some(WebApp::new(dataset, favorites, &page_url()));
        }
        Err(error) => fail(format!("Failed to parse {DATASET_URL}: {error}")),
    }
}
