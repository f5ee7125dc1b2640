//! Configuration
//!
//! Loaded from a TOML file; every key is optional. Environment variables
//! override the file:
//!
//! - `RESOURCEKIT_SCHEMA_DIR`
//! - `RESOURCEKIT_LOG_LEVEL`
//! - `RESOURCEKIT_FEED_BUFFER`

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::schema::SchemaCompiler;
use crate::store::InMemoryStore;

/// Environment variable overriding `schema_dir`
pub const ENV_SCHEMA_DIR: &str = "RESOURCEKIT_SCHEMA_DIR";
/// Environment variable overriding `log_level`
pub const ENV_LOG_LEVEL: &str = "RESOURCEKIT_LOG_LEVEL";
/// Environment variable overriding `feed_buffer`
pub const ENV_FEED_BUFFER: &str = "RESOURCEKIT_FEED_BUFFER";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {reason}")]
    Io { path: String, reason: String },

    #[error("invalid config file '{path}': {reason}")]
    Parse { path: String, reason: String },

    #[error("invalid value '{value}' for {key}")]
    InvalidValue { key: &'static str, value: String },
}

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Directory of `*.json` schema files (default: "./schemas")
    #[serde(default = "default_schema_dir")]
    pub schema_dir: PathBuf,

    /// Default log level when `RUST_LOG` is unset (default: "info")
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Reject undeclared fields for schemas that do not say (default: false)
    #[serde(default)]
    pub reject_additional_properties: bool,

    /// Change channel capacity per subscriber (default: 256)
    #[serde(default = "default_feed_buffer")]
    pub feed_buffer: usize,
}

fn default_schema_dir() -> PathBuf {
    PathBuf::from("./schemas")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_feed_buffer() -> usize {
    256
}

impl Default for Config {
    fn default() -> Self {
        Self {
            schema_dir: default_schema_dir(),
            log_level: default_log_level(),
            reject_additional_properties: false,
            feed_buffer: default_feed_buffer(),
        }
    }
}

impl Config {
    /// Parses TOML configuration.
    pub fn from_toml(source: &str, path: &str) -> Result<Self, ConfigError> {
        toml::from_str(source).map_err(|e| ConfigError::Parse {
            path: path.to_string(),
            reason: e.to_string(),
        })
    }

    /// Reads a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let source = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml(&source, &path.display().to_string())
    }

    /// Reads the file if given, else the defaults, then applies the
    /// process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.with_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides looked up by environment variable name.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(ENV_SCHEMA_DIR) {
            self.schema_dir = PathBuf::from(dir);
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            self.log_level = level;
        }
        if let Some(buffer) = lookup(ENV_FEED_BUFFER) {
            self.feed_buffer = buffer.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: ENV_FEED_BUFFER,
                value: buffer.clone(),
            })?;
        }
        Ok(self)
    }

    /// Schema compiler honoring `reject_additional_properties`
    pub fn compiler(&self) -> SchemaCompiler {
        SchemaCompiler::new().reject_additional_by_default(self.reject_additional_properties)
    }

    /// In-memory store with the configured feed buffer
    pub fn memory_store(&self) -> InMemoryStore {
        InMemoryStore::with_feed_buffer(self.feed_buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.schema_dir, PathBuf::from("./schemas"));
        assert_eq!(config.log_level, "info");
        assert!(!config.reject_additional_properties);
        assert_eq!(config.feed_buffer, 256);
    }

    #[test]
    fn test_partial_toml() {
        let config = Config::from_toml("log_level = \"debug\"\nreject_additional_properties = true\n", "inline").unwrap();
        assert_eq!(config.log_level, "debug");
        assert!(config.reject_additional_properties);
        assert_eq!(config.feed_buffer, 256);
    }

    #[test]
    fn test_invalid_toml() {
        let err = Config::from_toml("feed_buffer = \"lots\"", "inline").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("resourcekit.toml");
        fs::write(&path, "schema_dir = \"/srv/schemas\"\n").unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.schema_dir, PathBuf::from("/srv/schemas"));
        assert!(Config::from_file(&dir.path().join("missing.toml")).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_SCHEMA_DIR, "/tmp/schemas"),
            (ENV_LOG_LEVEL, "warn"),
            (ENV_FEED_BUFFER, "16"),
        ]);
        let config = Config::default()
            .with_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.schema_dir, PathBuf::from("/tmp/schemas"));
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.feed_buffer, 16);

        let err = Config::default()
            .with_overrides(|key| (key == ENV_FEED_BUFFER).then(|| "many".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }
}
