use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

use clap::Parser;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use nyc_rw_core::favorites::MemoryFragment;
use nyc_rw_core::{select_backend, FavoritesStore, KeyValueStore, MapBackend, TileBackend};
use nyc_rw_explorer::app::App;
use nyc_rw_explorer::cli::CliArgs;
use nyc_rw_explorer::config::AppConfig;
use nyc_rw_explorer::db::create_database_pool;
use nyc_rw_explorer::db::migrations::in_memory_pool;
use nyc_rw_explorer::logging::init_tracing;
use nyc_rw_explorer::offline::{
    load_dataset_or_empty, prefetch_tiles, check_connectivity, ConnectivityMonitor, HttpFetcher,
    OfflineCache, PRECACHE_PATHS, CONNECTIVITY_CHECK_INTERVAL,
};
use nyc_rw_explorer::storage::FileStore;
use nyc_rw_explorer::{event, terminal};
use tracing::{error, info, warn};

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<()> {
    // Setup error handling
    color_eyre::install()?;

    let args = CliArgs::parse();
    args.apply_env_overrides();
    let config = AppConfig::from_env()?;

    let headless = args.headless || !is_terminal();
    init_tracing(&config, headless)?;
    info!(data_dir = %config.data_dir.display(), headless, "starting explorer");

    let pool = match create_database_pool(&config.database_url()?).await {
        Ok(pool) => pool,
        Err(e) => {
            warn!(error = %e, "offline cache unavailable, using an in-memory cache");
            in_memory_pool().await?
        }
    };

    let fetcher = HttpFetcher::new(HTTP_TIMEOUT)?;
    let cache = OfflineCache::new(pool, fetcher, &config.dataset_url)?;

    match cache.install(PRECACHE_PATHS).await {
        Ok(report) => info!(cached = report.cached, failed = report.failed.len(), "shell cached"),
        Err(e) => warn!(error = %e, "offline cache install failed"),
    }
    if let Err(e) = cache.activate().await {
        warn!(error = %e, "offline cache activation failed");
    }

    let (dataset, load_problem) = load_dataset_or_empty(&cache, &config).await;

    let tiles = TileBackend::new(config.tile_template.clone(), TileBackend::default().zoom());
    let connectivity = check_connectivity(cache.fetcher(), &config.map_status_url).await;
    if args.prefetch_tiles {
        let cached = prefetch_tiles(&cache, &tiles).await;
        info!(cached, "map tiles prefetched");
    }
    let map = select_backend(connectivity, tiles.clone());
    info!(?connectivity, backend = map.name(), "map backend selected");

    let storage: Box<dyn KeyValueStore> = Box::new(FileStore::open_or_reset(config.storage_path()));
    let favorites = FavoritesStore::new(storage, MemoryFragment::new(args.link_fragment()));
    let share_base = cache.resolve("/");
    let mut app = App::new(dataset, favorites, map, &share_base);

    if let Some(message) = load_problem {
        app.status_message = message;
    }

    for action in args.filter_actions().map_err(|e| eyre!("Invalid filter flag: {e}"))? {
        app.dispatch(action);
    }

    if headless {
        return event::run_headless(&app, args.json);
    }

    // Render panics are caught per region; anything else should not print over the UI
    panic::set_hook(Box::new(|info| error!(%info, "panic")));

    let mut monitor = ConnectivityMonitor::spawn(
        HttpFetcher::new(HTTP_TIMEOUT)?,
        config.map_status_url.clone(),
        connectivity,
        CONNECTIVITY_CHECK_INTERVAL,
        tiles,
    );

    let mut terminal = terminal::setup()?;
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        event::run(&mut terminal, &mut app, &mut monitor)
    }));
    terminal::cleanup(true, true);

    match outcome {
        Ok(result) => result,
        Err(payload) => panic::resume_unwind(payload),
    }
}

// Check if we're running in a terminal
fn is_terminal() -> bool {
    atty::is(atty::Stream::Stdout)
}
