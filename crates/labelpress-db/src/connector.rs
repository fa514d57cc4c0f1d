//! # Connector Seam
//!
//! The [`Connector`] trait is the boundary between connection policy and
//! the actual MySQL driver. The manager only knows how to ask for a
//! connection and how to check one is still alive; everything else
//! (acquisition, pooling, retry, release) is policy and is tested against
//! a mock connector.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};
use sqlx::{ConnectOptions, Connection};
use tokio::time::timeout;
use tracing::debug;

use crate::config::DatabaseConfig;
use crate::error::{DbError, DbResult};

// =============================================================================
// Connector Trait
// =============================================================================

/// Opens and health-checks database connections.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// The connection type handed out.
    type Conn: Send + 'static;

    /// Opens a new connection. Errors carry a retry classification; the
    /// manager retries only transient ones.
    async fn connect(&self) -> DbResult<Self::Conn>;

    /// Returns true when the connection is still usable. A false answer
    /// makes the manager discard the connection and open a fresh one.
    async fn ping(&self, conn: &mut Self::Conn) -> bool;
}

// =============================================================================
// MySQL Connector
// =============================================================================

/// Production connector backed by sqlx's MySQL driver.
pub struct MySqlConnector {
    options: MySqlConnectOptions,
    connect_timeout: Duration,
}

impl MySqlConnector {
    pub fn from_config(config: &DatabaseConfig) -> Self {
        let options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.password)
            .database(&config.database);

        MySqlConnector {
            options,
            connect_timeout: config.connect_timeout(),
        }
    }
}

#[async_trait]
impl Connector for MySqlConnector {
    type Conn = MySqlConnection;

    async fn connect(&self) -> DbResult<MySqlConnection> {
        debug!(host = %self.options.get_host(), "opening MySQL connection");
        match timeout(self.connect_timeout, self.options.connect()).await {
            Ok(Ok(conn)) => Ok(conn),
            Ok(Err(e)) => Err(DbError::from(e)),
            Err(_) => Err(DbError::Transport(format!(
                "connect timed out after {} s",
                self.connect_timeout.as_secs()
            ))),
        }
    }

    async fn ping(&self, conn: &mut MySqlConnection) -> bool {
        conn.ping().await.is_ok()
    }
}
