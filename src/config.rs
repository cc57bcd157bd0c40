//! Configuration for opening a feed store.
//!
//! The config file is optional. A missing file yields
//! `StoreConfig::default()`, and any subset of keys can be specified;
//! unknown keys are ignored by serde.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Largest config file we will read. Anything bigger is rejected rather
/// than parsed.
const MAX_CONFIG_BYTES: u64 = 64 * 1024;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Connection settings for [`FeedStore::open_with`].
///
/// All fields use `#[serde(default)]` so any subset of keys can be
/// specified. Missing keys fall back to `Default::default()`.
///
/// [`FeedStore::open_with`]: crate::FeedStore::open_with
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Path to the SQLite database file. `":memory:"` opens a
    /// throwaway in-memory store.
    pub path: String,

    /// Maximum pooled connections. SQLite is single-writer, so a small
    /// pool covers concurrent readers.
    pub max_connections: u32,

    /// How long SQLite waits for a lock to release before reporting
    /// SQLITE_BUSY, in milliseconds.
    pub busy_timeout_ms: u64,

    /// How long to wait for a free pool connection, in seconds.
    pub acquire_timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: "feedstore.db".to_string(),
            max_connections: 5,
            busy_timeout_ms: 5000,
            acquire_timeout_secs: 10,
        }
    }
}

impl StoreConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns defaults if the file does not exist. Fails on unreadable
    /// files, invalid TOML, or files over [`MAX_CONFIG_BYTES`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let metadata = std::fs::metadata(path)?;
        if metadata.len() > MAX_CONFIG_BYTES {
            return Err(ConfigError::TooLarge(format!(
                "{} is {} bytes (max {})",
                path.display(),
                metadata.len(),
                MAX_CONFIG_BYTES
            )));
        }

        let raw = std::fs::read_to_string(path)?;
        Self::parse(&raw)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let config = toml::from_str(raw)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty_yields_defaults() {
        let config = StoreConfig::parse("").unwrap();
        assert_eq!(config.path, "feedstore.db");
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.busy_timeout_ms, 5000);
        assert_eq!(config.acquire_timeout_secs, 10);
    }

    #[test]
    fn test_parse_partial_keys() {
        let config = StoreConfig::parse("path = \":memory:\"\nmax_connections = 2\n").unwrap();
        assert_eq!(config.path, ":memory:");
        assert_eq!(config.max_connections, 2);
        // Unspecified keys keep their defaults
        assert_eq!(config.busy_timeout_ms, 5000);
    }

    #[test]
    fn test_parse_unknown_keys_ignored() {
        let config = StoreConfig::parse("theme = \"dark\"\npath = \"feeds.db\"\n").unwrap();
        assert_eq!(config.path, "feeds.db");
    }

    #[test]
    fn test_parse_invalid_toml_is_error() {
        let err = StoreConfig::parse("path = [not toml").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_missing_file_yields_defaults() {
        let config = StoreConfig::load(Path::new("/nonexistent/feedstore.toml")).unwrap();
        assert_eq!(config.max_connections, 5);
    }
}
