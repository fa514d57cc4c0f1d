//! # Connection Manager
//!
//! Hands out database connections under one of three policies, with
//! retry-on-transient-failure baked into every path.
//!
//! ## Acquisition Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        acquire()                                        │
//! │                            │                                            │
//! │              ┌─────────────┼──────────────┐                             │
//! │              ▼             ▼              ▼                             │
//! │         PerRequest    Persistent      Pooled(n)                         │
//! │              │             │              │                             │
//! │              │        wait for the   wait for a permit                  │
//! │              │        single permit  (acquire_timeout,                  │
//! │              │        (no timeout)    else PoolExhausted)               │
//! │              │             │              │                             │
//! │              │        idle conn? ── ping ok? ── reuse                   │
//! │              │             │ no / stale       │                         │
//! │              ▼             ▼                  │                         │
//! │        connect with retry + exponential backoff                         │
//! │              │                                                          │
//! │              ▼                                                          │
//! │        ConnectionHandle (returns the conn on drop/release)              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Retry Semantics
//! `max_retries = R` means up to R retries *after* the first failure, so
//! at most R + 1 attempts total. Only transient errors are retried;
//! authentication and configuration errors fail immediately with the
//! typed error so the operator sees the real cause instead of a timeout.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::config::{ConnectionPolicy, DatabaseConfig};
use crate::connector::{Connector, MySqlConnector};
use crate::error::{DbError, DbResult};

// =============================================================================
// Retry Settings
// =============================================================================

/// Retry and backoff parameters for connection attempts.
#[derive(Debug, Clone)]
pub struct RetrySettings {
    /// Retries after the first failed attempt.
    pub max_retries: u32,
    /// Delay before the first retry. Doubles per attempt.
    pub initial_backoff: Duration,
    /// Delay ceiling.
    pub max_backoff: Duration,
}

impl Default for RetrySettings {
    fn default() -> Self {
        // Mirrors the DatabaseConfig defaults: one attempt, 200 ms doubling
        // up to 5 s when retries are enabled.
        RetrySettings {
            max_retries: 0,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(5),
        }
    }
}

impl RetrySettings {
    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: self.initial_backoff,
            max_interval: self.max_backoff,
            multiplier: 2.0,
            max_elapsed_time: None, // Attempt count is the only limit
            ..Default::default()
        }
    }
}

// =============================================================================
// Connection Manager
// =============================================================================

struct Inner<C: Connector> {
    connector: C,
    policy: ConnectionPolicy,
    retry: RetrySettings,
    acquire_timeout: Duration,
    /// Caps concurrently held connections. Effectively unbounded for
    /// PerRequest, 1 for Persistent, N for Pooled(N).
    semaphore: Arc<Semaphore>,
    /// Released connections awaiting reuse. Never grows past the
    /// semaphore capacity.
    idle: Mutex<Vec<C::Conn>>,
    /// Total connections opened, for diagnostics and tests.
    opened: AtomicU64,
}

impl<C: Connector> Inner<C> {
    /// A panic while holding the idle lock only loses pooled connections,
    /// never corrupts them, so a poisoned lock is safe to enter.
    fn idle_lock(&self) -> MutexGuard<'_, Vec<C::Conn>> {
        match self.idle.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Policy-driven connection manager. Cheap to clone; clones share the
/// same pool.
pub struct ConnectionManager<C: Connector> {
    inner: Arc<Inner<C>>,
}

impl<C: Connector> Clone for ConnectionManager<C> {
    fn clone(&self) -> Self {
        ConnectionManager {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl ConnectionManager<MySqlConnector> {
    /// Builds a manager for the configured MySQL server.
    pub fn from_config(config: &DatabaseConfig) -> Self {
        ConnectionManager::new(
            MySqlConnector::from_config(config),
            config.policy(),
            RetrySettings {
                max_retries: config.max_retries,
                initial_backoff: config.initial_backoff(),
                max_backoff: config.max_backoff(),
            },
            config.acquire_timeout(),
        )
    }
}

impl<C: Connector> ConnectionManager<C> {
    pub fn new(
        connector: C,
        policy: ConnectionPolicy,
        retry: RetrySettings,
        acquire_timeout: Duration,
    ) -> Self {
        let capacity = match policy {
            ConnectionPolicy::PerRequest => Semaphore::MAX_PERMITS,
            ConnectionPolicy::Persistent => 1,
            ConnectionPolicy::Pooled(n) => n.max(1) as usize,
        };

        ConnectionManager {
            inner: Arc::new(Inner {
                connector,
                policy,
                retry,
                acquire_timeout,
                semaphore: Arc::new(Semaphore::new(capacity)),
                idle: Mutex::new(Vec::new()),
                opened: AtomicU64::new(0),
            }),
        }
    }

    /// The active policy.
    pub fn policy(&self) -> ConnectionPolicy {
        self.inner.policy
    }

    /// Total connections opened since startup.
    pub fn connections_opened(&self) -> u64 {
        self.inner.opened.load(Ordering::Relaxed)
    }

    /// Acquires a connection under the configured policy.
    ///
    /// Persistent acquisitions wait for the single slot indefinitely
    /// (a label run is non-interactive and short); pooled acquisitions
    /// give up with [`DbError::PoolExhausted`] after the acquire timeout.
    pub async fn acquire(&self) -> DbResult<ConnectionHandle<C>> {
        let permit = match self.inner.policy {
            ConnectionPolicy::PerRequest => None,
            ConnectionPolicy::Persistent => {
                let permit = Arc::clone(&self.inner.semaphore)
                    .acquire_owned()
                    .await
                    .map_err(|_| DbError::Transport("connection manager closed".into()))?;
                Some(permit)
            }
            ConnectionPolicy::Pooled(_) => {
                let wait = self.inner.acquire_timeout;
                match timeout(wait, Arc::clone(&self.inner.semaphore).acquire_owned()).await {
                    Ok(Ok(permit)) => Some(permit),
                    Ok(Err(_)) => {
                        return Err(DbError::Transport("connection manager closed".into()))
                    }
                    Err(_) => {
                        warn!(waited_ms = wait.as_millis() as u64, "pool exhausted");
                        return Err(DbError::PoolExhausted {
                            waited_ms: wait.as_millis() as u64,
                        });
                    }
                }
            }
        };

        let reusable = self.inner.policy != ConnectionPolicy::PerRequest;

        if reusable {
            let existing = self.inner.idle_lock().pop();
            if let Some(mut conn) = existing {
                if self.inner.connector.ping(&mut conn).await {
                    debug!(policy = %self.inner.policy, "reusing idle connection");
                    return Ok(ConnectionHandle {
                        conn: Some(conn),
                        inner: Arc::clone(&self.inner),
                        _permit: permit,
                        reusable,
                    });
                }
                // Stale connection: drop it and fall through to reconnect.
                debug!("idle connection failed ping, reconnecting");
            }
        }

        let conn = self.connect_with_retry().await?;
        Ok(ConnectionHandle {
            conn: Some(conn),
            inner: Arc::clone(&self.inner),
            _permit: permit,
            reusable,
        })
    }

    /// Opens a connection, retrying transient failures with exponential
    /// backoff. Permanent failures propagate unchanged on the first
    /// attempt.
    async fn connect_with_retry(&self) -> DbResult<C::Conn> {
        let mut backoff = self.inner.retry.backoff();
        let mut attempts: u32 = 0;

        loop {
            attempts += 1;
            match self.inner.connector.connect().await {
                Ok(conn) => {
                    self.inner.opened.fetch_add(1, Ordering::Relaxed);
                    if attempts > 1 {
                        debug!(attempts, "connected after retry");
                    }
                    return Ok(conn);
                }
                Err(e) if e.is_transient() && attempts <= self.inner.retry.max_retries => {
                    let delay = backoff
                        .next_backoff()
                        .unwrap_or(self.inner.retry.max_backoff);
                    warn!(attempt = attempts, ?delay, error = %e, "connect failed, retrying");
                    tokio::time::sleep(delay).await;
                }
                Err(e) if e.is_transient() => {
                    return Err(DbError::Connection {
                        attempts,
                        source: Box::new(e),
                    });
                }
                Err(e) => return Err(e),
            }
        }
    }
}

// =============================================================================
// Connection Handle
// =============================================================================

/// An acquired connection.
///
/// Dropping the handle releases the connection: back into the pool for
/// persistent/pooled policies, closed for per-request. [`release`] does
/// the same eagerly. Consuming `self` makes double release impossible;
/// the internal path is guarded by `Option::take` so the drop after an
/// explicit release is a no-op.
///
/// [`release`]: ConnectionHandle::release
pub struct ConnectionHandle<C: Connector> {
    conn: Option<C::Conn>,
    inner: Arc<Inner<C>>,
    /// Held for the lifetime of the handle; dropping it frees the slot.
    _permit: Option<OwnedSemaphorePermit>,
    reusable: bool,
}

impl<C: Connector> ConnectionHandle<C> {
    /// The underlying connection.
    pub fn conn(&mut self) -> &mut C::Conn {
        match self.conn.as_mut() {
            Some(conn) => conn,
            // The Option is only emptied by release/drop, both of which
            // consume or end the handle.
            None => unreachable!("connection handle used after release"),
        }
    }

    /// Returns the connection to the manager.
    pub fn release(mut self) {
        self.release_inner();
    }

    fn release_inner(&mut self) {
        if let Some(conn) = self.conn.take() {
            if self.reusable {
                self.inner.idle_lock().push(conn);
                debug!(policy = %self.inner.policy, "connection returned to pool");
            }
            // Per-request connections are simply dropped (closed).
        }
        // The permit drops with the handle, freeing the slot after the
        // connection is back in the idle list.
    }
}

impl<C: Connector> Drop for ConnectionHandle<C> {
    fn drop(&mut self) {
        self.release_inner();
    }
}

// Manual impl: C::Conn has no Debug bound and its contents do not belong
// in logs anyway.
impl<C: Connector> std::fmt::Debug for ConnectionHandle<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("policy", &self.inner.policy)
            .field("reusable", &self.reusable)
            .field("held", &self.conn.is_some())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicU32};

    /// Scriptable connector: hands out numbered connections, can fail the
    /// first N connects transiently, fail permanently, or report idle
    /// connections as dead.
    struct MockConnector {
        next_id: AtomicU32,
        connect_calls: AtomicU32,
        transient_failures: AtomicU32,
        fail_permanently: bool,
        healthy: AtomicBool,
    }

    impl MockConnector {
        fn new() -> Self {
            MockConnector {
                next_id: AtomicU32::new(1),
                connect_calls: AtomicU32::new(0),
                transient_failures: AtomicU32::new(0),
                fail_permanently: false,
                healthy: AtomicBool::new(true),
            }
        }

        fn failing_transiently(count: u32) -> Self {
            let mock = MockConnector::new();
            mock.transient_failures.store(count, Ordering::SeqCst);
            mock
        }

        fn failing_permanently() -> Self {
            let mut mock = MockConnector::new();
            mock.fail_permanently = true;
            mock
        }
    }

    #[async_trait]
    impl Connector for MockConnector {
        type Conn = u32;

        async fn connect(&self) -> DbResult<u32> {
            self.connect_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_permanently {
                return Err(DbError::Authentication("access denied".into()));
            }
            if self.transient_failures.load(Ordering::SeqCst) > 0 {
                self.transient_failures.fetch_sub(1, Ordering::SeqCst);
                return Err(DbError::Transport("connection refused".into()));
            }
            Ok(self.next_id.fetch_add(1, Ordering::SeqCst))
        }

        async fn ping(&self, _conn: &mut u32) -> bool {
            self.healthy.load(Ordering::SeqCst)
        }
    }

    fn fast_retry(max_retries: u32) -> RetrySettings {
        RetrySettings {
            max_retries,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(10),
        }
    }

    fn manager(connector: MockConnector, policy: ConnectionPolicy) -> ConnectionManager<MockConnector> {
        ConnectionManager::new(connector, policy, fast_retry(3), Duration::from_millis(50))
    }

    #[tokio::test]
    async fn test_per_request_opens_fresh_connections() {
        let mgr = manager(MockConnector::new(), ConnectionPolicy::PerRequest);

        let mut a = mgr.acquire().await.unwrap();
        let id_a = *a.conn();
        a.release();

        let mut b = mgr.acquire().await.unwrap();
        let id_b = *b.conn();

        assert_ne!(id_a, id_b);
        assert_eq!(mgr.connections_opened(), 2);
    }

    #[tokio::test]
    async fn test_persistent_reuses_single_connection() {
        let mgr = manager(MockConnector::new(), ConnectionPolicy::Persistent);

        let mut a = mgr.acquire().await.unwrap();
        let id_a = *a.conn();
        drop(a);

        let mut b = mgr.acquire().await.unwrap();
        assert_eq!(*b.conn(), id_a);
        assert_eq!(mgr.connections_opened(), 1);
    }

    #[tokio::test]
    async fn test_persistent_reconnects_when_ping_fails() {
        let mgr = manager(MockConnector::new(), ConnectionPolicy::Persistent);

        let a = mgr.acquire().await.unwrap();
        drop(a);

        // The idle connection dies while nothing holds it.
        mgr.inner.connector.healthy.store(false, Ordering::SeqCst);

        let b = mgr.acquire().await.unwrap();
        drop(b);
        assert_eq!(mgr.connections_opened(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pooled_caps_concurrent_connections() {
        let mgr = manager(MockConnector::new(), ConnectionPolicy::Pooled(2));

        let a = mgr.acquire().await.unwrap();
        let _b = mgr.acquire().await.unwrap();

        // Both slots held: the third acquisition times out.
        let err = mgr.acquire().await.unwrap_err();
        assert!(matches!(err, DbError::PoolExhausted { .. }));
        assert!(err.is_transient());

        // Freeing a slot makes acquisition succeed again, reusing the
        // released connection.
        drop(a);
        let c = mgr.acquire().await.unwrap();
        drop(c);
        assert_eq!(mgr.connections_opened(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_recovers_from_transient_failures() {
        let mgr = manager(
            MockConnector::failing_transiently(3),
            ConnectionPolicy::PerRequest,
        );

        // 3 failures + 1 success = 4 attempts, within max_retries = 3.
        let handle = mgr.acquire().await.unwrap();
        drop(handle);
        assert_eq!(mgr.inner.connector.connect_calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_exhaustion_reports_attempts() {
        let mgr = manager(
            MockConnector::failing_transiently(10),
            ConnectionPolicy::PerRequest,
        );

        let err = mgr.acquire().await.unwrap_err();
        match err {
            DbError::Connection { attempts, source } => {
                assert_eq!(attempts, 4); // 1 initial + 3 retries
                assert!(matches!(*source, DbError::Transport(_)));
            }
            other => panic!("expected Connection error, got {:?}", other),
        }
        assert_eq!(mgr.inner.connector.connect_calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_permanent_failure_is_not_retried() {
        let mgr = manager(
            MockConnector::failing_permanently(),
            ConnectionPolicy::PerRequest,
        );

        let err = mgr.acquire().await.unwrap_err();
        assert!(matches!(err, DbError::Authentication(_)));
        assert_eq!(mgr.inner.connector.connect_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_release_returns_connection_once() {
        let mgr = manager(MockConnector::new(), ConnectionPolicy::Pooled(2));

        let a = mgr.acquire().await.unwrap();
        a.release(); // Drop runs afterwards; the pool must not double-count.

        assert_eq!(mgr.inner.idle_lock().len(), 1);
    }

    #[tokio::test]
    async fn test_handle_debug_never_exposes_the_connection() {
        let mgr = manager(MockConnector::new(), ConnectionPolicy::Pooled(2));
        let handle = mgr.acquire().await.unwrap();

        let debug = format!("{:?}", handle);
        assert!(debug.contains("ConnectionHandle"));
        assert!(debug.contains("held: true"));
    }

    #[tokio::test]
    async fn test_pooled_reuses_released_connections() {
        let mgr = manager(MockConnector::new(), ConnectionPolicy::Pooled(2));

        let mut a = mgr.acquire().await.unwrap();
        let id_a = *a.conn();
        a.release();

        let mut b = mgr.acquire().await.unwrap();
        assert_eq!(*b.conn(), id_a);
        assert_eq!(mgr.connections_opened(), 1);
    }
}
