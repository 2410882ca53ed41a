//! Configuration layers and their parsed form.
//!
//! Each layer is one optional TOML file in the configuration directory:
//! `config.toml`, `config.user.toml` and `config.dev.toml`.

use crate::error::{ConfigError, ConfigResult};
use std::fmt;
use std::path::{Path, PathBuf};
use toml::{Table, Value};
use tracing::debug;

pub const SYSTEM_SECTION: &str = "System";
pub const MYSQL_SECTION: &str = "MySQL";
pub const OTHER_TABLE: &str = "Other";

/// One of the three configuration files, lowest precedence first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConfigSource {
    /// `config.toml`; without it no other layer is read.
    Main,
    /// `config.user.toml`
    User,
    /// `config.dev.toml`, development environment only.
    Dev,
}

impl ConfigSource {
    /// All layers in application order.
    pub const ALL: [ConfigSource; 3] = [ConfigSource::Main, ConfigSource::User, ConfigSource::Dev];

    pub fn file_name(&self) -> &'static str {
        match self {
            ConfigSource::Main => "config.toml",
            ConfigSource::User => "config.user.toml",
            ConfigSource::Dev => "config.dev.toml",
        }
    }

    pub fn path_in(&self, dir: &Path) -> PathBuf {
        dir.join(self.file_name())
    }

    /// Map a file name back to its layer.
    pub fn from_file_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.file_name() == name)
    }
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::Main => write!(f, "main"),
            ConfigSource::User => write!(f, "user"),
            ConfigSource::Dev => write!(f, "dev"),
        }
    }
}

/// A well-formed configuration document.
///
/// Only the top-level structure is checked here; individual keys are typed
/// lazily by the merger so one bad value never spoils its siblings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedDocument {
    root: Table,
}

impl ParsedDocument {
    /// Parse TOML text, returning `None` if the document is malformed.
    pub fn parse(text: &str) -> Option<Self> {
        Self::try_parse(text).ok()
    }

    /// Parse TOML text, keeping the parser error.
    pub fn try_parse(text: &str) -> Result<Self, toml::de::Error> {
        text.parse::<Table>().map(|root| Self { root })
    }

    /// A named top-level section, if present and a table.
    pub fn section(&self, name: &str) -> Option<&Table> {
        self.root.get(name).and_then(Value::as_table)
    }

    /// The `[System]` section.
    pub fn system(&self) -> Option<&Table> {
        self.section(SYSTEM_SECTION)
    }

    /// The `[MySQL]` section.
    pub fn mysql(&self) -> Option<&Table> {
        self.section(MYSQL_SECTION)
    }
}

/// Read and parse one layer from `dir`.
///
/// `Ok(None)` means the file does not exist.
pub fn load_layer(dir: &Path, source: ConfigSource) -> ConfigResult<Option<ParsedDocument>> {
    let path = source.path_in(dir);
    let text = match std::fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("No {} layer at {}", source, path.display());
            return Ok(None);
        }
        Err(e) => return Err(ConfigError::read(&path, e)),
    };

    ParsedDocument::try_parse(&text)
        .map(Some)
        .map_err(|e| ConfigError::parse(&path, e))
}
