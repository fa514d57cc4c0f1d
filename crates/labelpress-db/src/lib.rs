//! # labelpress-db: Database Layer
//!
//! Everything that talks to the upstream MySQL product database.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        labelpress-db                                    │
//! │                                                                         │
//! │  ┌──────────────┐   acquire()   ┌───────────────────┐                  │
//! │  │ LabelFetcher │ ────────────► │ ConnectionManager │                  │
//! │  │ (queries +   │               │ (policy, retry,   │                  │
//! │  │  row mapping)│ ◄──────────── │  pooling)         │                  │
//! │  └──────────────┘    handle     └────────┬──────────┘                  │
//! │                                          │ Connector trait             │
//! │                                          ▼                              │
//! │                                 ┌────────────────┐                      │
//! │                                 │ MySqlConnector │  (sqlx)              │
//! │                                 └────────────────┘                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The connection policy machinery never names the driver; it goes through
//! the [`Connector`] trait, so the retry/pool/release behavior is covered
//! by tests that never open a socket.

pub mod config;
pub mod connector;
pub mod error;
pub mod fetcher;
pub mod manager;

pub use config::{ConnectionPolicy, DatabaseConfig};
pub use connector::{Connector, MySqlConnector};
pub use error::{DbError, DbResult, ErrorClass};
pub use fetcher::{FetchCriteria, FetchOutcome, LabelFetcher, MAX_QUERY_PARAMS};
pub use manager::{ConnectionHandle, ConnectionManager, RetrySettings};
