//! Structured error types for configuration loading and watching.
//!
//! None of these reach callers of [`ConfigStore::read`](crate::config::ConfigStore::read):
//! the store logs them and treats the affected layer as absent.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while locating, reading or watching configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The `etc` directory could not be resolved.
    #[error("configuration directory not found")]
    NoConfigDirectory,

    /// The main layer file is missing.
    #[error("{} not found", .path.display())]
    NotFound { path: PathBuf },

    /// A layer file exists but could not be read.
    #[error("failed to read {}: {}", .path.display(), .source)]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A layer file is not a well-formed TOML document.
    #[error("failed to parse {}: {}", .path.display(), .source)]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// The filesystem watcher could not be created or attached.
    #[error("file watcher error: {0}")]
    Watch(#[from] notify::Error),
}

impl ConfigError {
    pub fn read(path: &Path, source: io::Error) -> Self {
        Self::Read {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn parse(path: &Path, source: toml::de::Error) -> Self {
        Self::Parse {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Result type for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_error_mentions_path() {
        let err = ConfigError::read(
            Path::new("etc/config.toml"),
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        let msg = err.to_string();
        assert!(msg.contains("etc/config.toml"));
        assert!(msg.contains("denied"));
    }

    #[test]
    fn test_parse_error_keeps_source() {
        let source = toml::from_str::<toml::Table>("[System").unwrap_err();
        let err = ConfigError::parse(Path::new("config.toml"), source);
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(std::error::Error::source(&err).is_some());
    }
}
