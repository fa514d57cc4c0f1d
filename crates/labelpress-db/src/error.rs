//! # Database Error Types
//!
//! Error types for the database layer.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  MySQL Error (sqlx::Error)                                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError (this module) ← adds context and a Transient/Permanent class   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Connection manager ← retries Transient, fails fast on Permanent        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  CLI reports a user-facing message and a non-zero exit code             │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The classification drives retry behavior, so it errs on the side of
//! Permanent: retrying an `Access denied` burns attempts and can lock the
//! account, while giving up on a flaky network just surfaces one extra
//! error to the operator.

use thiserror::Error;

// =============================================================================
// Error Classification
// =============================================================================

/// Whether an error is worth retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Likely to succeed on a later attempt (network blips, timeouts,
    /// server restarts). The connection manager retries these.
    Transient,
    /// Will keep failing until a human intervenes (bad credentials,
    /// missing database, malformed request). Never retried.
    Permanent,
}

// =============================================================================
// Database Errors
// =============================================================================

/// Database layer errors.
///
/// Wraps sqlx errors with a retry classification and carries the context
/// (SKU, column, attempt count) needed to report failures usefully.
#[derive(Debug, Error)]
pub enum DbError {
    /// The configuration is unusable.
    ///
    /// ## When This Occurs
    /// - db_config.json is missing or malformed
    /// - Host/database/user fields are empty
    /// - The named database does not exist on the server
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The server rejected the credentials.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The server could not be reached or the link dropped.
    ///
    /// ## When This Occurs
    /// - TCP connect refused / timed out
    /// - TLS handshake failure
    /// - "server has gone away" mid-session
    ///
    /// Always classified Transient.
    #[error("transport error: {0}")]
    Transport(String),

    /// Connecting failed even after retrying.
    ///
    /// `attempts` counts every try including the first; `source` is the
    /// error from the final attempt.
    #[error("connection failed after {attempts} attempt(s): {source}")]
    Connection {
        attempts: u32,
        #[source]
        source: Box<DbError>,
    },

    /// All pooled connections stayed busy past the acquisition timeout.
    #[error("connection pool exhausted after waiting {waited_ms} ms")]
    PoolExhausted { waited_ms: u64 },

    /// The caller asked for something that can never succeed.
    ///
    /// ## When This Occurs
    /// - Empty SKU list
    /// - Empty name pattern
    ///
    /// Raised before any connection is acquired.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Query execution failed for a reason that is not a transport problem.
    #[error("query failed: {0}")]
    Query(String),

    /// A fetched row cannot be turned into a label record.
    ///
    /// ## When This Occurs
    /// - NULL in a column the label cannot do without (name, price)
    #[error("row for '{sku}' has no usable value in column '{column}'")]
    Mapping { sku: String, column: String },
}

impl DbError {
    /// Retry classification for this error.
    pub fn class(&self) -> ErrorClass {
        match self {
            DbError::Transport(_) => ErrorClass::Transient,
            DbError::PoolExhausted { .. } => ErrorClass::Transient,
            DbError::Configuration(_)
            | DbError::Authentication(_)
            | DbError::Connection { .. }
            | DbError::InvalidRequest(_)
            | DbError::Query(_)
            | DbError::Mapping { .. } => ErrorClass::Permanent,
        }
    }

    /// True when the connection manager should retry after this error.
    pub fn is_transient(&self) -> bool {
        self.class() == ErrorClass::Transient
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::Io / Tls / PoolTimedOut  → Transport (transient)
/// sqlx::Error::Database                 → inspect SQLSTATE and message
///   28000 / "Access denied"             → Authentication
///   "Unknown database"                  → Configuration
///   gone-away / lock-wait / too-many    → Transport
///   anything else                       → Query
/// Other                                 → Query
/// ```
///
/// MySQL reports most conditions through the message text, so the match
/// is on message fragments with the SQLSTATE as a backstop.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Io(e) => DbError::Transport(e.to_string()),
            sqlx::Error::Tls(e) => DbError::Transport(e.to_string()),
            sqlx::Error::PoolTimedOut => DbError::Transport("pool timed out".to_string()),

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message().to_string();
                let state = db_err.code().map(|c| c.to_string()).unwrap_or_default();

                if state == "28000" || msg.contains("Access denied") {
                    DbError::Authentication(msg)
                } else if msg.contains("Unknown database") {
                    DbError::Configuration(msg)
                } else if msg.contains("server has gone away")
                    || msg.contains("Lost connection")
                    || msg.contains("Too many connections")
                    || msg.contains("Lock wait timeout")
                {
                    DbError::Transport(msg)
                } else {
                    DbError::Query(msg)
                }
            }

            other => DbError::Query(other.to_string()),
        }
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_is_transient() {
        assert!(DbError::Transport("refused".into()).is_transient());
        assert!(DbError::PoolExhausted { waited_ms: 5000 }.is_transient());
    }

    #[test]
    fn test_permanent_errors_are_not_retried() {
        assert!(!DbError::Authentication("denied".into()).is_transient());
        assert!(!DbError::Configuration("no db".into()).is_transient());
        assert!(!DbError::InvalidRequest("empty".into()).is_transient());
        assert!(!DbError::Query("syntax".into()).is_transient());
    }

    #[test]
    fn test_io_error_maps_to_transport() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = DbError::from(sqlx::Error::Io(io));
        assert!(matches!(err, DbError::Transport(_)));
        assert!(err.is_transient());
    }

    #[test]
    fn test_connection_error_message_carries_attempts() {
        let err = DbError::Connection {
            attempts: 4,
            source: Box::new(DbError::Transport("refused".into())),
        };
        assert!(err.to_string().contains("4 attempt(s)"));
        assert!(!err.is_transient());
    }
}
