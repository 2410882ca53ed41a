//! Watch subcommand for netcorebb-config
//!
//! Keeps the configuration store watching `etc/` and prints each change
//! published on the system and database feeds.

use crate::config::WatcherConfig;
use clap::Args;
use std::time::Duration;

/// Arguments for the watch subcommand
#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Debounce window for coalescing rapid file changes, in milliseconds
    #[arg(long, value_name = "MS", default_value_t = 500)]
    pub debounce_ms: u64,
}

impl WatchArgs {
    pub fn watcher_config(&self) -> WatcherConfig {
        WatcherConfig {
            debounce_duration: Duration::from_millis(self.debounce_ms),
        }
    }
}
