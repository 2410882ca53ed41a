//! Location of the configuration directory.
//!
//! Configuration lives in a fixed `etc/` directory under a base path (the
//! current working directory unless one is given). Existence is checked on
//! every call; nothing is cached, so the directory may appear or disappear
//! between lookups.

use std::path::{Path, PathBuf};

/// Name of the directory holding the configuration layers.
pub const CONFIG_DIR_NAME: &str = "etc";

/// Resolves the configuration directory.
#[derive(Debug, Clone, Default)]
pub struct PathLocator {
    /// Base directory; `None` means the current working directory at lookup time.
    base: Option<PathBuf>,
}

impl PathLocator {
    /// Locator rooted at the process's current working directory.
    pub fn new() -> Self {
        Self { base: None }
    }

    /// Locator rooted at an explicit base directory.
    pub fn with_base(base: impl Into<PathBuf>) -> Self {
        Self {
            base: Some(base.into()),
        }
    }

    /// The path the config directory would have, whether or not it exists.
    pub fn candidate(&self) -> Option<PathBuf> {
        let base = match self.base {
            Some(ref base) => base.clone(),
            None => std::env::current_dir().ok()?,
        };
        Some(absolutize(&base).join(CONFIG_DIR_NAME))
    }

    /// Full path of the configuration directory, or `None` if it does not exist.
    pub fn locate(&self) -> Option<PathBuf> {
        self.candidate().filter(|path| path.is_dir())
    }
}

fn absolutize(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(_) => path.to_path_buf(),
    }
}
