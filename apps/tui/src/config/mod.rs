#[allow(clippy::module_inception)]
mod config;

pub use config::{sqlite_url, AppConfig};
