//! CLI command definitions for netcorebb-config
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

pub mod watch;

use crate::environment::Environment;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use watch::WatchArgs;

/// NetCoreBB system configuration inspector
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Base directory containing `etc/` (default: current directory)
    #[arg(short, long, global = true, value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Hosting environment: development, staging or production
    /// (default: $NETCOREBB_ENVIRONMENT, then production)
    #[arg(short, long, global = true, value_parser = parse_environment)]
    pub environment: Option<Environment>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// Effective environment: the flag, else the environment variable.
    pub fn environment(&self) -> Environment {
        self.environment.unwrap_or_else(Environment::from_env)
    }
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Read the configuration once and print it (default if no subcommand given)
    Show,

    /// Print the configuration, then every change until interrupted
    Watch(WatchArgs),
}

fn parse_environment(value: &str) -> Result<Environment, String> {
    value.parse()
}
