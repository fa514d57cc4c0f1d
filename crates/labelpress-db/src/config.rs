//! # Database Configuration
//!
//! Connection settings loaded from `db_config.json`, with environment
//! variable overrides for deployment flexibility.
//!
//! ## Configuration Sources (highest priority last)
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. Built-in defaults (serde default fns)                               │
//! │  2. db_config.json                                                      │
//! │  3. LABELPRESS_DB_* environment variables                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Connection Policy Selection
//! ```text
//! pool_size > 0    → Pooled(pool_size)    (wins over `persistent`)
//! persistent       → Persistent           (one long-lived connection)
//! otherwise        → PerRequest           (fresh connection every time)
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{DbError, DbResult};

// =============================================================================
// Defaults
// =============================================================================

fn default_port() -> u16 {
    3306
}
fn default_pool_size() -> u32 {
    0
}
fn default_max_retries() -> u32 {
    0
}
fn default_connect_timeout_secs() -> u64 {
    10
}
fn default_acquire_timeout_secs() -> u64 {
    5
}
fn default_query_timeout_secs() -> u64 {
    30
}
fn default_initial_backoff_ms() -> u64 {
    200
}
fn default_max_backoff_secs() -> u64 {
    5
}

// =============================================================================
// Connection Policy
// =============================================================================

/// How the connection manager hands out connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPolicy {
    /// A fresh connection per acquisition, closed on release.
    PerRequest,
    /// One long-lived connection, reconnected transparently when it dies.
    Persistent,
    /// Up to N concurrently open connections, reused across acquisitions.
    Pooled(u32),
}

impl std::fmt::Display for ConnectionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionPolicy::PerRequest => write!(f, "per-request"),
            ConnectionPolicy::Persistent => write!(f, "persistent"),
            ConnectionPolicy::Pooled(n) => write!(f, "pooled({})", n),
        }
    }
}

// =============================================================================
// Database Configuration
// =============================================================================

/// Connection settings for the upstream MySQL product database.
///
/// `Debug` masks the password; logs and error messages never leak it.
#[derive(Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Server hostname or IP.
    pub host: String,

    /// Server port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Database (schema) name.
    pub database: String,

    /// Login user.
    pub user: String,

    /// Login password.
    #[serde(default)]
    pub password: String,

    /// Keep one connection open across requests.
    #[serde(default)]
    pub persistent: bool,

    /// Pool capacity; 0 disables pooling. Takes precedence over
    /// `persistent` when both are set.
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,

    /// Retries after the first failed connection attempt. Only transient
    /// failures are retried; 0 means a single attempt.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// TCP connect + handshake timeout, seconds.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// How long a pooled acquisition waits before giving up, seconds.
    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,

    /// Per-query execution timeout, seconds.
    #[serde(default = "default_query_timeout_secs")]
    pub query_timeout_secs: u64,

    /// First retry delay, milliseconds. Doubles per attempt.
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Retry delay ceiling, seconds.
    #[serde(default = "default_max_backoff_secs")]
    pub max_backoff_secs: u64,
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"***")
            .field("persistent", &self.persistent)
            .field("pool_size", &self.pool_size)
            .field("max_retries", &self.max_retries)
            .finish_non_exhaustive()
    }
}

impl DatabaseConfig {
    /// Loads the configuration from a JSON file and applies environment
    /// overrides. A missing or malformed file is a configuration error;
    /// there is no useful default for credentials.
    pub fn from_json_file(path: &Path) -> DbResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            DbError::Configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        let mut config: DatabaseConfig = serde_json::from_str(&contents).map_err(|e| {
            DbError::Configuration(format!("cannot parse {}: {}", path.display(), e))
        })?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Applies `LABELPRESS_DB_*` environment overrides.
    ///
    /// Lets deployments point the same settings file at another server or
    /// inject the password without writing it to disk.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("LABELPRESS_DB_HOST") {
            self.host = host;
        }
        if let Ok(port) = std::env::var("LABELPRESS_DB_PORT") {
            if let Ok(port) = port.parse() {
                self.port = port;
            }
        }
        if let Ok(database) = std::env::var("LABELPRESS_DB_NAME") {
            self.database = database;
        }
        if let Ok(user) = std::env::var("LABELPRESS_DB_USER") {
            self.user = user;
        }
        if let Ok(password) = std::env::var("LABELPRESS_DB_PASSWORD") {
            self.password = password;
        }
    }

    /// Validates the configuration.
    pub fn validate(&self) -> DbResult<()> {
        if self.host.is_empty() {
            return Err(DbError::Configuration("host must not be empty".into()));
        }
        if self.database.is_empty() {
            return Err(DbError::Configuration("database must not be empty".into()));
        }
        if self.user.is_empty() {
            return Err(DbError::Configuration("user must not be empty".into()));
        }
        if self.connect_timeout_secs == 0 {
            return Err(DbError::Configuration(
                "connect_timeout_secs must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Resolves the connection policy. An explicit pool size wins over
    /// the persistent flag when both are set.
    pub fn policy(&self) -> ConnectionPolicy {
        if self.pool_size > 0 {
            ConnectionPolicy::Pooled(self.pool_size)
        } else if self.persistent {
            ConnectionPolicy::Persistent
        } else {
            ConnectionPolicy::PerRequest
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }

    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_secs(self.max_backoff_secs)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_json() -> &'static str {
        r#"{"host": "db.local", "database": "shop", "user": "labels"}"#
    }

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config: DatabaseConfig = serde_json::from_str(minimal_json()).unwrap();
        assert_eq!(config.port, 3306);
        assert_eq!(config.pool_size, 0);
        assert_eq!(config.max_retries, 0);
        assert_eq!(config.connect_timeout_secs, 10);
        assert_eq!(config.acquire_timeout_secs, 5);
        assert_eq!(config.initial_backoff_ms, 200);
        assert!(!config.persistent);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_policy_precedence() {
        let mut config: DatabaseConfig = serde_json::from_str(minimal_json()).unwrap();
        assert_eq!(config.policy(), ConnectionPolicy::PerRequest);

        config.persistent = true;
        assert_eq!(config.policy(), ConnectionPolicy::Persistent);

        // An explicit pool size wins even with persistent set.
        config.pool_size = 4;
        assert_eq!(config.policy(), ConnectionPolicy::Pooled(4));
    }

    #[test]
    fn test_debug_masks_password() {
        let mut config: DatabaseConfig = serde_json::from_str(minimal_json()).unwrap();
        config.password = "s3cret".to_string();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("s3cret"));
        assert!(debug.contains("***"));
    }

    #[test]
    fn test_validate_rejects_empty_host() {
        let config: DatabaseConfig =
            serde_json::from_str(r#"{"host": "", "database": "shop", "user": "labels"}"#).unwrap();
        assert!(matches!(
            config.validate(),
            Err(DbError::Configuration(_))
        ));
    }

    #[test]
    fn test_policy_display() {
        assert_eq!(ConnectionPolicy::PerRequest.to_string(), "per-request");
        assert_eq!(ConnectionPolicy::Pooled(8).to_string(), "pooled(8)");
    }
}
