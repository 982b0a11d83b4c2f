use color_eyre::Result;
use nyc_rw_explorer::config::AppConfig;
use nyc_rw_explorer::db::create_database_pool;
use nyc_rw_explorer::db::queries::{cache_names, count_entries};
use nyc_rw_explorer::offline::{DATA_CACHE, SHELL_CACHE};

/// Prints every cache generation in the offline cache database with its entry count.
#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let config = AppConfig::from_env()?;

    println!("Offline cache: {}", config.cache_db.display());
    let pool = create_database_pool(&config.database_url()?).await?;

    let names = cache_names(&pool).await?;
    if names.is_empty() {
        println!("No caches yet. Run the explorer once while online.");
        return Ok(());
    }

    for name in names {
        let entries = count_entries(&pool, &name).await?;
        let generation = if name == SHELL_CACHE || name == DATA_CACHE {
            "current"
        } else {
            "stale, purged on next start"
        };
        println!("- {name}: {entries} entries ({generation})");
    }

    Ok(())
}
