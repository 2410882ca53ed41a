//! Hosting environment signal.
//!
//! The development-override layer is only consulted when the host runs in
//! development mode.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// Environment variable naming the hosting environment.
pub const ENVIRONMENT_VAR: &str = "NETCOREBB_ENVIRONMENT";

/// Execution environment of the hosting process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Staging,
    /// Default when nothing is configured.
    #[default]
    Production,
}

impl Environment {
    /// Read the environment from `NETCOREBB_ENVIRONMENT`.
    ///
    /// Unset or unrecognized values fall back to production.
    pub fn from_env() -> Self {
        Self::from_value(std::env::var(ENVIRONMENT_VAR).ok().as_deref())
    }

    fn from_value(value: Option<&str>) -> Self {
        match value.map(str::parse::<Environment>) {
            Some(Ok(environment)) => environment,
            Some(Err(e)) => {
                warn!("{} in {}; using production", e, ENVIRONMENT_VAR);
                Environment::default()
            }
            None => Environment::default(),
        }
    }

    /// True in development mode.
    pub fn is_development(&self) -> bool {
        matches!(self, Environment::Development)
    }

    /// True in production mode.
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Staging => write!(f, "staging"),
            Environment::Production => write!(f, "production"),
        }
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "staging" => Ok(Environment::Staging),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(format!("unknown environment: {}", other)),
        }
    }
}
