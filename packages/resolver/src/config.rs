//! Runtime policy for the engine.
//!
//! Values come from, in increasing precedence: built-in defaults, an
//! optional TOML file named by `SECTOR_MAP_CONFIG`, and the individual
//! `SECTOR_MAP_*` environment variables.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Largest batch accepted by default.
pub const DEFAULT_MAX_BATCH_ITEMS: usize = 1000;

/// Default minimum interval between collaborator-bound batch items.
pub const DEFAULT_PACING_MS: u64 = 50;

/// Default number of batch items in flight at once.
pub const DEFAULT_CONCURRENCY: usize = 1;

/// Environment variable naming an optional TOML config file.
pub const CONFIG_PATH_ENV: &str = "SECTOR_MAP_CONFIG";

const MAX_BATCH_ITEMS_ENV: &str = "SECTOR_MAP_MAX_BATCH_ITEMS";
const PACING_MS_ENV: &str = "SECTOR_MAP_PACING_MS";
const CONCURRENCY_ENV: &str = "SECTOR_MAP_CONCURRENCY";

/// Errors from loading [`EngineConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        /// Path that was read.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The config file is not valid TOML for [`EngineConfig`].
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A setting has an unusable value.
    #[error("Invalid value for {name}: {message}")]
    InvalidValue {
        /// Setting or environment variable name.
        name: String,
        /// Description of what went wrong.
        message: String,
    },
}

/// Batch policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Batches larger than this are rejected before any item runs.
    pub max_batch_items: usize,
    /// Minimum interval, in milliseconds, between successive batch items
    /// that call an external collaborator. Zero disables pacing.
    pub pacing_ms: u64,
    /// Number of batch items resolved concurrently. Results keep input
    /// order regardless.
    pub concurrency: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_batch_items: DEFAULT_MAX_BATCH_ITEMS,
            pacing_ms: DEFAULT_PACING_MS,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl EngineConfig {
    /// Loads the config from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the config file cannot be read or parsed,
    /// or any value is invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`Self::from_env`], reading variables through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the config file cannot be read or parsed,
    /// or any value is invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let base = match lookup(CONFIG_PATH_ENV) {
            Some(path) if !path.trim().is_empty() => Self::from_file(Path::new(path.trim()))?,
            _ => Self::default(),
        };

        base.with_overrides(lookup)
    }

    /// Loads a config file. Missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed, or any
    /// value is invalid.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        log::debug!("Loaded engine config from {}", path.display());
        Self::from_toml_str(&contents)
    }

    /// Parses a config from TOML text. Missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the text cannot be parsed or any value is
    /// invalid.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::de::from_str(toml_str)?;
        config.validate()
    }

    /// Applies `SECTOR_MAP_*` overrides read through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if an override does not parse
    /// or the result is invalid.
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(value) = lookup(MAX_BATCH_ITEMS_ENV) {
            self.max_batch_items = parse_env(MAX_BATCH_ITEMS_ENV, &value)?;
        }
        if let Some(value) = lookup(PACING_MS_ENV) {
            self.pacing_ms = parse_env(PACING_MS_ENV, &value)?;
        }
        if let Some(value) = lookup(CONCURRENCY_ENV) {
            self.concurrency = parse_env(CONCURRENCY_ENV, &value)?;
        }
        self.validate()
    }

    /// The pacing interval as a [`Duration`].
    #[must_use]
    pub const fn pacing_interval(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if self.max_batch_items == 0 {
            return Err(ConfigError::InvalidValue {
                name: "max_batch_items".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                name: "concurrency".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        Ok(self)
    }
}

fn parse_env<T>(name: &str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidValue {
            name: name.to_string(),
            message: format!("'{value}': {e}"),
        })
}
