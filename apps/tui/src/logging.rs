use std::fs::OpenOptions;
use std::sync::Mutex;

use color_eyre::eyre::{eyre, Result};
use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;

/// Installs the global subscriber. The terminal UI owns stdout, so interactive
/// runs log to `<DATA_DIR>/explorer.log`; headless runs log to stderr.
pub fn init_tracing(config: &AppConfig, headless: bool) -> Result<()> {
    let default_level = if config.debug { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| eyre!("Invalid log filter: {e}"))?;

    let builder = tracing_subscriber::fmt().with_env_filter(env_filter);

    let installed = if headless {
        builder.with_writer(std::io::stderr).try_init()
    } else {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(config.log_path())
            .map_err(|e| eyre!("Failed to open log file {}: {e}", config.log_path().display()))?;
        builder
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .try_init()
    };

    installed.map_err(|e| eyre!("Failed to install tracing subscriber: {e}"))
}
