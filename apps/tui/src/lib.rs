// Export our modules for use in binaries and tests
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod app;
pub mod cli;
pub mod config;
pub mod db;
pub mod event;
pub mod logging;
pub mod offline;
pub mod storage;
pub mod terminal;
pub mod ui;
