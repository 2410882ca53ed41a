//! Layered system configuration with live reload.
//!
//! Settings come from up to three TOML files in the `etc/` directory,
//! applied field by field in increasing precedence:
//! 1. **Defaults** - built into [`SystemSettings`] and [`DatabaseSettings`]
//! 2. **Main** - `config.toml` (required; without it nothing else is read)
//! 3. **User** - `config.user.toml`
//! 4. **Dev** - `config.dev.toml`, only in the development environment
//!
//! ## File Format
//! ```toml
//! [System]
//! SystemInstalled = true
//! MaintenanceMode = false
//!
//! [MySQL]
//! Server = "localhost"
//! Port = 3306
//!
//! [MySQL.Other]
//! Pooling = true
//! ```

mod layer;
mod merge;
mod store;
mod types;
pub mod watcher;

pub use layer::{ConfigSource, ParsedDocument, load_layer};
pub use merge::{apply_layer, apply_layers, coerce_other};
pub use store::ConfigStore;
pub use types::*;
pub use watcher::{ConfigChangeEvent, WatcherConfig};
