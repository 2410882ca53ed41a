//! NetCoreBB system configuration library.
//!
//! This module exports the configuration store and its building blocks for
//! the forum host and for testing.

pub mod cli;
pub mod config;
pub mod environment;
pub mod error;
pub mod logging;
pub mod paths;
