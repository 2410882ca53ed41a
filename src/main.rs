//! NetCoreBB configuration tool
//!
//! Prints the effective layered configuration, optionally following live
//! changes to the files in `etc/`.

use anyhow::Result;
use clap::Parser;
use netcorebb_config::cli::{Cli, Command};
use netcorebb_config::config::ConfigStore;
use netcorebb_config::logging::{self, LogTarget};
use netcorebb_config::paths::PathLocator;
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(&LogTarget::parse(&cli.log), cli.verbose)?;

    let locator = match cli.dir {
        Some(ref dir) => PathLocator::with_base(dir),
        None => PathLocator::new(),
    };
    let store = ConfigStore::new(locator, cli.environment());
    info!("Environment: {}", store.environment());

    match cli.command {
        None | Some(Command::Show) => print_json(&store.read())?,
        Some(Command::Watch(args)) => {
            let store = store.with_watcher_config(args.watcher_config());
            run_watch(&store).await?;
        }
    }

    Ok(())
}

/// Print the current snapshot, then every feed emission until Ctrl-C.
async fn run_watch(store: &ConfigStore) -> Result<()> {
    let (mut system_rx, mut database_rx) = store.changes();
    print_json(&store.read())?;

    if !store.start_watching() {
        match store.locator().candidate() {
            Some(dir) => warn!("Could not start watching {}", dir.display()),
            None => warn!("Could not start watching; no configuration directory"),
        }
        return Ok(());
    }
    info!("Watching for configuration changes, press Ctrl-C to stop");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
            system = system_rx.recv() => {
                if !forward(system)? {
                    break;
                }
            }
            database = database_rx.recv() => {
                if !forward(database)? {
                    break;
                }
            }
        }
    }

    store.close();
    Ok(())
}

/// Print one feed emission. Returns `false` once the feed is closed.
fn forward<T: Serialize>(received: Result<T, RecvError>) -> Result<bool> {
    match received {
        Ok(value) => {
            print_json(&value)?;
            Ok(true)
        }
        Err(RecvError::Lagged(skipped)) => {
            warn!("Skipped {} configuration updates", skipped);
            Ok(true)
        }
        Err(RecvError::Closed) => Ok(false),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
