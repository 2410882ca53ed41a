//! File watcher for the configuration directory.
//!
//! Watches `etc/` (non-recursively) for changes to `config.toml`,
//! `config.user.toml` and `config.dev.toml`. Uses debouncing to coalesce the
//! burst of events a single save produces, and hands each qualifying batch to
//! a callback on a dedicated thread.

use super::layer::ConfigSource;
use crate::error::ConfigResult;
use notify::RecommendedWatcher;
use notify_debouncer_mini::{DebouncedEvent, DebouncedEventKind, Debouncer, new_debouncer};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;
use tracing::{debug, error, info};

/// Event emitted when configuration files change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigChangeEvent {
    /// A single layer file changed.
    Layer(ConfigSource, PathBuf),
    /// Several layer files changed in quick succession.
    BatchChange(Vec<(ConfigSource, PathBuf)>),
}

impl ConfigChangeEvent {
    /// Layers touched by this event.
    pub fn sources(&self) -> Vec<ConfigSource> {
        match self {
            ConfigChangeEvent::Layer(source, _) => vec![*source],
            ConfigChangeEvent::BatchChange(changes) => changes.iter().map(|(s, _)| *s).collect(),
        }
    }

    /// Paths touched by this event.
    pub fn affected_paths(&self) -> Vec<&Path> {
        match self {
            ConfigChangeEvent::Layer(_, p) => vec![p.as_path()],
            ConfigChangeEvent::BatchChange(changes) => {
                changes.iter().map(|(_, p)| p.as_path()).collect()
            }
        }
    }
}

/// Configuration for the file watcher.
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Debounce duration for coalescing rapid changes.
    pub debounce_duration: Duration,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            debounce_duration: Duration::from_millis(500),
        }
    }
}

/// Live observation of a configuration directory.
///
/// Dropping the handle stops the debouncer, which closes the event channel
/// and lets the processing thread exit.
pub struct ConfigWatcher {
    dir: PathBuf,
    _debouncer: Debouncer<RecommendedWatcher>,
}

impl ConfigWatcher {
    /// Directory being observed.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// Starts watching `dir`, calling `on_change` for every qualifying event.
///
/// The callback runs on a dedicated thread; returning `false` from it stops
/// processing early.
pub fn start_config_watcher<F>(
    dir: &Path,
    config: &WatcherConfig,
    on_change: F,
) -> ConfigResult<ConfigWatcher>
where
    F: FnMut(ConfigChangeEvent) -> bool + Send + 'static,
{
    let (notify_tx, notify_rx) = mpsc::channel();

    let mut debouncer = new_debouncer(config.debounce_duration, notify_tx)?;
    debouncer
        .watcher()
        .watch(dir, notify::RecursiveMode::NonRecursive)?;
    info!("Watching config directory: {}", dir.display());

    let watched = dir.to_path_buf();
    thread::Builder::new()
        .name("config-watcher".to_string())
        .spawn(move || process_notify_events(notify_rx, &watched, on_change))
        .map_err(notify::Error::io)?;

    Ok(ConfigWatcher {
        dir: dir.to_path_buf(),
        _debouncer: debouncer,
    })
}

/// Process events from the notify debouncer and forward classified changes.
fn process_notify_events<F>(
    rx: mpsc::Receiver<Result<Vec<DebouncedEvent>, notify::Error>>,
    dir: &Path,
    mut on_change: F,
) where
    F: FnMut(ConfigChangeEvent) -> bool,
{
    loop {
        match rx.recv() {
            Ok(Ok(events)) => {
                if let Some(event) = classify_events(events) {
                    debug!("Config change in {}: {:?}", dir.display(), event);
                    if !on_change(event) {
                        info!("Config watcher handler finished, stopping");
                        return;
                    }
                }
            }
            Ok(Err(e)) => {
                error!("File watcher error: {}", e);
            }
            Err(_) => {
                // Debouncer dropped
                debug!("Config watcher channel closed, stopping");
                return;
            }
        }
    }
}

/// Collapse a debounced batch into at most one change event.
fn classify_events(events: Vec<DebouncedEvent>) -> Option<ConfigChangeEvent> {
    let mut changes: Vec<(ConfigSource, PathBuf)> = Vec::new();

    for event in events {
        if !matches!(
            event.kind,
            DebouncedEventKind::Any | DebouncedEventKind::AnyContinuous
        ) {
            continue;
        }
        if let Some(source) = classify_path(&event.path)
            && !changes.iter().any(|(s, _)| *s == source)
        {
            changes.push((source, event.path));
        }
    }

    match changes.len() {
        0 => None,
        1 => changes
            .pop()
            .map(|(source, path)| ConfigChangeEvent::Layer(source, path)),
        _ => {
            changes.sort_by_key(|(s, _)| *s);
            Some(ConfigChangeEvent::BatchChange(changes))
        }
    }
}

/// Map a path to the layer it belongs to, if it is one of ours.
///
/// The watch is non-recursive, so the file name alone identifies the layer.
fn classify_path(path: &Path) -> Option<ConfigSource> {
    let file_name = path.file_name().and_then(|n| n.to_str())?;
    ConfigSource::from_file_name(file_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(path: &str) -> DebouncedEvent {
        DebouncedEvent {
            path: PathBuf::from(path),
            kind: DebouncedEventKind::Any,
        }
    }

    #[test]
    fn test_classify_layer_files() {
        assert_eq!(
            classify_path(Path::new("/srv/etc/config.toml")),
            Some(ConfigSource::Main)
        );
        assert_eq!(
            classify_path(Path::new("/srv/etc/config.user.toml")),
            Some(ConfigSource::User)
        );
        assert_eq!(
            classify_path(Path::new("/srv/etc/config.dev.toml")),
            Some(ConfigSource::Dev)
        );
    }

    #[test]
    fn test_classify_unknown_file() {
        assert!(classify_path(Path::new("/srv/etc/config.toml.swp")).is_none());
        assert!(classify_path(Path::new("/srv/etc/other.toml")).is_none());
        assert!(classify_path(Path::new("/srv/etc")).is_none());
    }

    #[test]
    fn test_classify_events_single() {
        let result = classify_events(vec![
            event("/srv/etc/config.toml"),
            event("/srv/etc/notes.txt"),
        ]);
        assert!(matches!(
            result,
            Some(ConfigChangeEvent::Layer(ConfigSource::Main, _))
        ));
    }

    #[test]
    fn test_classify_events_batch_is_ordered_and_deduplicated() {
        let result = classify_events(vec![
            event("/srv/etc/config.dev.toml"),
            event("/srv/etc/config.toml"),
            event("/srv/etc/config.dev.toml"),
        ])
        .unwrap();

        assert_eq!(result.sources(), vec![ConfigSource::Main, ConfigSource::Dev]);
        assert_eq!(result.affected_paths().len(), 2);
    }

    #[test]
    fn test_classify_events_nothing_relevant() {
        assert!(classify_events(vec![event("/srv/etc/readme.md")]).is_none());
        assert!(classify_events(Vec::new()).is_none());
    }
}
