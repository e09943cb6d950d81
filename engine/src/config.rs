//! Engine configuration.
//!
//! Defaults suit interactive clients; every value can be overridden from
//! the environment or a `.env` file.

use crate::{kind, Kind};
use std::{env, path::Path, time::Duration};

pub const ENV_MAX_DEPTH: &str = "LISTGRAPH_MAX_DEPTH";
pub const ENV_FETCH_ATTEMPTS: &str = "LISTGRAPH_FETCH_ATTEMPTS";
pub const ENV_FETCH_RETRY_DELAY_MS: &str = "LISTGRAPH_FETCH_RETRY_DELAY_MS";
pub const ENV_SYNC_KINDS: &str = "LISTGRAPH_SYNC_KINDS";

/// Tunables shared by the hierarchy, aggregation and sync layers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Deepest nesting level materialized (roots are depth 0)
    pub max_depth: usize,
    /// How many times the incoming sync phase tries its fetch
    pub fetch_attempts: u32,
    /// Pause between fetch attempts
    pub fetch_retry_delay: Duration,
    /// Kinds pulled by the incoming sync phase
    pub sync_kinds: Vec<Kind>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let mut sync_kinds = kind::LIST_KINDS.to_vec();
        sync_kinds.push(kind::PROFILE);
        Self {
            max_depth: 5,
            fetch_attempts: 2,
            fetch_retry_delay: Duration::from_secs(1),
            sync_kinds,
        }
    }
}

impl EngineConfig {
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Sets the fetch attempt count. Values below 1 are raised to 1.
    pub fn with_fetch_attempts(mut self, attempts: u32) -> Self {
        self.fetch_attempts = attempts.max(1);
        self
    }

    pub fn with_fetch_retry_delay(mut self, delay: Duration) -> Self {
        self.fetch_retry_delay = delay;
        self
    }

    pub fn with_sync_kinds(mut self, kinds: impl Into<Vec<Kind>>) -> Self {
        self.sync_kinds = kinds.into();
        self
    }

    /// Load configuration from environment variables, falling back to the
    /// defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let max_depth = parse_var(ENV_MAX_DEPTH)?.unwrap_or(defaults.max_depth);

        let fetch_attempts = parse_var(ENV_FETCH_ATTEMPTS)?.unwrap_or(defaults.fetch_attempts);
        if fetch_attempts == 0 {
            return Err(ConfigError::ZeroFetchAttempts);
        }

        let fetch_retry_delay = parse_var::<u64>(ENV_FETCH_RETRY_DELAY_MS)?
            .map(Duration::from_millis)
            .unwrap_or(defaults.fetch_retry_delay);

        let sync_kinds = match env::var(ENV_SYNC_KINDS) {
            Ok(raw) if !raw.trim().is_empty() => parse_kinds(&raw)?,
            _ => defaults.sync_kinds,
        };

        Ok(Self {
            max_depth,
            fetch_attempts,
            fetch_retry_delay,
            sync_kinds,
        })
    }

    /// Load a `.env` file into the process environment, then read it with
    /// [`EngineConfig::from_env`].
    pub fn from_env_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        dotenvy::from_filename(path).map_err(|e| ConfigError::EnvFile {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_env()
    }
}

fn parse_var<T: std::str::FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(name) {
        Ok(raw) if raw.trim().is_empty() => Ok(None),
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { name, value: raw }),
        Err(_) => Ok(None),
    }
}

fn parse_kinds(raw: &str) -> Result<Vec<Kind>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse().map_err(|_| ConfigError::Invalid {
                name: ENV_SYNC_KINDS,
                value: raw.to_string(),
            })
        })
        .collect()
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read env file {path}: {reason}")]
    EnvFile { path: String, reason: String },

    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },

    #[error("LISTGRAPH_FETCH_ATTEMPTS must be at least 1")]
    ZeroFetchAttempts,
}
