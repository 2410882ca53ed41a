//! Config store: merged reads, last-known-good fallback and change feeds.
//!
//! A read resolves the `etc/` directory, applies `config.toml`, then
//! `config.user.toml`, then (development only) `config.dev.toml` on top of the
//! built-in defaults. If the directory or the main file is unusable, the read
//! yields the last successfully merged snapshot, or defaults when there is
//! none. Partially applied layers are never returned.
//!
//! While watching, every qualifying file event triggers a fresh read whose
//! records are published on two broadcast feeds. A feed only emits when its
//! record differs from the previous emission.

use super::layer::{ConfigSource, ParsedDocument, load_layer};
use super::merge::apply_layers;
use super::types::{ConfigSnapshot, DatabaseSettings, SystemSettings};
use super::watcher::{ConfigChangeEvent, ConfigWatcher, WatcherConfig, start_config_watcher};
use crate::environment::Environment;
use crate::error::{ConfigError, ConfigResult};
use crate::paths::PathLocator;
use arc_swap::ArcSwapOption;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Buffered emissions per feed before slow subscribers start lagging.
const FEED_CAPACITY: usize = 16;

/// Layered configuration with live reload.
///
/// Instances are independent of one another. Dropping the store closes it.
pub struct ConfigStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    locator: PathLocator,
    environment: Environment,
    /// Last successfully merged snapshot; swapped atomically.
    last_good: ArcSwapOption<ConfigSnapshot>,
    /// Held across load and store so the newest load is the one kept.
    reload: Mutex<()>,
    /// `None` once the store is closed.
    feeds: Mutex<Option<Feeds>>,
    watch: Mutex<WatchSlot>,
}

struct Feeds {
    system: broadcast::Sender<SystemSettings>,
    database: broadcast::Sender<DatabaseSettings>,
    last_system: Option<SystemSettings>,
    last_database: Option<DatabaseSettings>,
}

impl Feeds {
    fn new() -> Self {
        let (system, _) = broadcast::channel(FEED_CAPACITY);
        let (database, _) = broadcast::channel(FEED_CAPACITY);
        Self {
            system,
            database,
            last_system: None,
            last_database: None,
        }
    }
}

struct WatchSlot {
    state: WatchState,
    /// Bumped on every start so a stale processing thread can tell it is stale.
    generation: u64,
    config: WatcherConfig,
}

enum WatchState {
    Stopped,
    Running {
        generation: u64,
        watcher: ConfigWatcher,
    },
    Closed,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ConfigStore {
    /// Create a store reading from `locator`'s directory under `environment`.
    pub fn new(locator: PathLocator, environment: Environment) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                locator,
                environment,
                last_good: ArcSwapOption::empty(),
                reload: Mutex::new(()),
                feeds: Mutex::new(Some(Feeds::new())),
                watch: Mutex::new(WatchSlot {
                    state: WatchState::Stopped,
                    generation: 0,
                    config: WatcherConfig::default(),
                }),
            }),
        }
    }

    /// Use a custom watcher configuration for subsequent `start_watching` calls.
    pub fn with_watcher_config(self, config: WatcherConfig) -> Self {
        lock(&self.inner.watch).config = config;
        self
    }

    pub fn environment(&self) -> Environment {
        self.inner.environment
    }

    pub fn locator(&self) -> &PathLocator {
        &self.inner.locator
    }

    /// Read and merge all applicable layers.
    ///
    /// Never fails: unusable configuration yields the last-known-good
    /// snapshot, or defaults if nothing was ever read successfully.
    pub fn read(&self) -> ConfigSnapshot {
        self.inner.read()
    }

    /// The last-known-good snapshot, without touching the filesystem.
    pub fn current(&self) -> Option<Arc<ConfigSnapshot>> {
        self.inner.last_good.load_full()
    }

    /// Subscribe to the system and database change feeds.
    ///
    /// Subscribing does not read; emissions only follow file events while
    /// watching. After `close` both receivers report the feed as closed.
    pub fn changes(
        &self,
    ) -> (
        broadcast::Receiver<SystemSettings>,
        broadcast::Receiver<DatabaseSettings>,
    ) {
        match lock(&self.inner.feeds).as_ref() {
            Some(feeds) => (feeds.system.subscribe(), feeds.database.subscribe()),
            None => {
                let (system, system_rx) = broadcast::channel(1);
                let (database, database_rx) = broadcast::channel(1);
                drop((system, database));
                (system_rx, database_rx)
            }
        }
    }

    /// Start observing the configuration directory.
    ///
    /// Returns `false` if already watching, if the store is closed, if no
    /// configuration directory exists, or if the watcher cannot be attached.
    pub fn start_watching(&self) -> bool {
        let mut slot = lock(&self.inner.watch);
        match slot.state {
            WatchState::Stopped => {}
            WatchState::Running { .. } => {
                debug!("Config watcher already running");
                return false;
            }
            WatchState::Closed => {
                debug!("Config store is closed; not watching");
                return false;
            }
        }

        let Some(dir) = self.inner.locator.locate() else {
            info!("No configuration directory found; hot-reload disabled");
            return false;
        };

        slot.generation += 1;
        let generation = slot.generation;
        let inner = Arc::downgrade(&self.inner);
        let result = start_config_watcher(&dir, &slot.config, move |event| {
            match inner.upgrade() {
                Some(inner) => inner.handle_change(generation, &event),
                None => false,
            }
        });

        match result {
            Ok(watcher) => {
                slot.state = WatchState::Running {
                    generation,
                    watcher,
                };
                true
            }
            Err(e) => {
                warn!(
                    "Failed to start config file watcher on {}: {}",
                    dir.display(),
                    e
                );
                false
            }
        }
    }

    /// Stop observing. No emission happens after this returns.
    pub fn stop_watching(&self) {
        let watcher = {
            let mut slot = lock(&self.inner.watch);
            if !matches!(slot.state, WatchState::Running { .. }) {
                return;
            }
            match std::mem::replace(&mut slot.state, WatchState::Stopped) {
                WatchState::Running { watcher, .. } => Some(watcher),
                _ => None,
            }
        };
        if let Some(watcher) = watcher {
            info!("Stopped watching {}", watcher.dir().display());
        }
    }

    pub fn is_watching(&self) -> bool {
        matches!(lock(&self.inner.watch).state, WatchState::Running { .. })
    }

    /// Release the watcher and close both feeds. Safe to call repeatedly.
    pub fn close(&self) {
        let previous = std::mem::replace(&mut lock(&self.inner.watch).state, WatchState::Closed);
        if let WatchState::Running { watcher, .. } = previous {
            info!("Stopped watching {}", watcher.dir().display());
        }
        if lock(&self.inner.feeds).take().is_some() {
            debug!("Config change feeds closed");
        }
    }
}

impl Drop for ConfigStore {
    fn drop(&mut self) {
        self.close();
    }
}

impl StoreInner {
    fn read(&self) -> ConfigSnapshot {
        let _reload = lock(&self.reload);
        match self.load() {
            Ok(snapshot) => {
                self.last_good.store(Some(Arc::new(snapshot.clone())));
                snapshot
            }
            Err(e) => {
                match &e {
                    ConfigError::NoConfigDirectory | ConfigError::NotFound { .. } => {
                        debug!("{}; using fallback configuration", e)
                    }
                    _ => warn!("{}; using fallback configuration", e),
                }
                self.fallback()
            }
        }
    }

    fn load(&self) -> ConfigResult<ConfigSnapshot> {
        let dir = self
            .locator
            .locate()
            .ok_or(ConfigError::NoConfigDirectory)?;

        let main = load_layer(&dir, ConfigSource::Main)?.ok_or_else(|| ConfigError::NotFound {
            path: ConfigSource::Main.path_in(&dir),
        })?;
        let mut layers = vec![main];
        layers.extend(load_optional(&dir, ConfigSource::User));
        if self.environment.is_development() {
            layers.extend(load_optional(&dir, ConfigSource::Dev));
        }

        Ok(apply_layers(ConfigSnapshot::default(), &layers))
    }

    fn fallback(&self) -> ConfigSnapshot {
        self.last_good
            .load_full()
            .map(|snapshot| (*snapshot).clone())
            .unwrap_or_default()
    }

    /// Re-read and publish after a file event. Returns `false` when the
    /// calling watcher thread is stale and should exit.
    fn handle_change(&self, generation: u64, event: &ConfigChangeEvent) -> bool {
        // Held across read and publish so stop/close wait for an in-flight reload.
        let slot = lock(&self.watch);
        match slot.state {
            WatchState::Running { generation: g, .. } if g == generation => {}
            _ => return false,
        }

        debug!("Reloading configuration after change to {:?}", event.sources());
        let snapshot = self.read();
        self.publish(snapshot);
        true
    }

    fn publish(&self, snapshot: ConfigSnapshot) {
        let mut guard = lock(&self.feeds);
        let Some(feeds) = guard.as_mut() else {
            return;
        };
        let (system, database) = snapshot.into_parts();

        if feeds.last_system.as_ref() != Some(&system) {
            info!("System settings changed");
            feeds.last_system = Some(system.clone());
            // No subscribers is not an error.
            let _ = feeds.system.send(system);
        }
        if feeds.last_database.as_ref() != Some(&database) {
            info!("Database settings changed");
            feeds.last_database = Some(database.clone());
            let _ = feeds.database.send(database);
        }
    }
}

/// Load an optional layer; any failure counts as absent.
fn load_optional(dir: &Path, source: ConfigSource) -> Option<ParsedDocument> {
    match load_layer(dir, source) {
        Ok(doc) => doc,
        Err(e) => {
            warn!("Skipping {} layer: {}", source, e);
            None
        }
    }
}
