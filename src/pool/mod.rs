//! Connection pool keyed by [`ConnectionSpec`].
//!
//! Each spec gets one lazily created [`PoolEntry`]. A checkout reuses the first idle
//! connection of that entry or opens a new one; a checkin marks it idle again. Statements
//! never run under the pool's mutexes: callers take the per-connection lock with
//! [`ConnectionWithLock::lock`] after checkout.
//!
//! ```rust,no_run
//! use sqlite_orm_middleware::prelude::*;
//!
//! # fn demo() -> Result<(), SqliteOrmError> {
//! let pool = ConnectionPool::current();
//! let spec = ConnectionSpec::new("app.db");
//! let conn = pool.checkout(&spec)?;
//! {
//!     let locked = conn.lock()?;
//!     locked.execute_dml("create table if not exists t (id integer)", &[])?;
//! }
//! pool.checkin(&conn);
//! # Ok(())
//! # }
//! ```

mod config;
mod entry;
mod outcome;
mod pooled;
mod spec;

pub use config::{DEFAULT_IDLE_EXPIRATION, PoolOptions, PoolOptionsBuilder};
pub use entry::PoolEntry;
pub use outcome::CheckinOutcome;
pub use pooled::{ConnectionState, PooledConnection};
pub use spec::ConnectionSpec;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock, Mutex, MutexGuard, RwLock};
use std::time::Instant;

use tracing::{debug, warn};

use crate::error::SqliteOrmError;
use crate::sqlite::ConnectionWithLock;

static CURRENT: LazyLock<RwLock<Arc<ConnectionPool>>> =
    LazyLock::new(|| RwLock::new(Arc::new(ConnectionPool::new(PoolOptions::default()))));

/// Which idle connections `reclaim_idle` closes.
#[derive(Debug, Clone, Copy)]
pub enum ReclaimScope<'a> {
    All,
    Spec(&'a ConnectionSpec),
}

/// Registry of pool entries.
#[derive(Debug)]
pub struct ConnectionPool {
    options: PoolOptions,
    entries: Mutex<HashMap<String, Arc<PoolEntry>>>,
    next_id: AtomicU64,
}

impl ConnectionPool {
    #[must_use]
    pub fn new(options: PoolOptions) -> Self {
        Self {
            options,
            entries: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn builder() -> PoolOptionsBuilder {
        PoolOptionsBuilder::new()
    }

    /// The process-wide pool, created on first use.
    #[must_use]
    pub fn current() -> Arc<ConnectionPool> {
        let guard = match CURRENT.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        Arc::clone(&guard)
    }

    /// Replace the process-wide pool with an empty one. Connections checked out from the old
    /// pool keep working until they are dropped.
    pub fn reset_current() {
        let mut guard = match CURRENT.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = Arc::new(ConnectionPool::new(PoolOptions::default()));
        debug!("reset current connection pool");
    }

    #[must_use]
    pub fn options(&self) -> &PoolOptions {
        &self.options
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, Arc<PoolEntry>>> {
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn entry_for(&self, spec: &ConnectionSpec) -> Arc<PoolEntry> {
        let mut entries = self.entries();
        Arc::clone(
            entries
                .entry(spec.key().to_string())
                .or_insert_with(|| Arc::new(PoolEntry::new(spec.clone()))),
        )
    }

    /// Entry for `spec`, if one exists.
    #[must_use]
    pub fn entry(&self, spec: &ConnectionSpec) -> Option<Arc<PoolEntry>> {
        self.entries().get(spec.key()).cloned()
    }

    /// Hand out a connection for `spec` that nobody else holds.
    ///
    /// # Errors
    /// Returns `SqliteOrmError::ConnectionError` if a new connection cannot be opened.
    pub fn checkout(&self, spec: &ConnectionSpec) -> Result<Arc<ConnectionWithLock>, SqliteOrmError> {
        let entry = self.entry_for(spec);
        if let Some(conn) = entry.take_idle()? {
            debug!(pool_id = conn.pool_id(), key = spec.key(), "reusing idle connection");
            return Ok(conn);
        }

        let raw = spec.open()?;
        if let Some(timeout) = self.options.busy_timeout {
            raw.busy_timeout(timeout)?;
        }
        let pool_id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let conn = Arc::new(ConnectionWithLock::new(pool_id, spec.key(), raw));
        entry.push_in_use(PooledConnection::new(
            Arc::clone(&conn),
            self.options.idle_expiration,
        ));
        debug!(pool_id, key = spec.key(), "opened new connection");
        Ok(conn)
    }

    /// Return a connection. One the pool no longer tracks is closed instead.
    pub fn checkin(&self, conn: &Arc<ConnectionWithLock>) -> CheckinOutcome {
        let entry = self.entries().get(conn.spec_key()).cloned();
        let found = match entry.map(|e| e.connection_finished(conn.pool_id())) {
            Some(Ok(found)) => found,
            // Connections are only closed after `drain_idle` has removed them from their
            // entry, so a closed one is never found here.
            Some(Err(err)) => {
                warn!(pool_id = conn.pool_id(), error = %err, "checkin of a closed connection");
                false
            }
            None => false,
        };

        if found {
            debug!(pool_id = conn.pool_id(), "connection returned to pool");
            CheckinOutcome::Returned
        } else {
            warn!(
                pool_id = conn.pool_id(),
                key = conn.spec_key(),
                "connection not found in pool; closing it"
            );
            conn.close();
            CheckinOutcome::ClosedOrphan
        }
    }

    /// Close every idle connection in scope and forget the affected entries. Connections still
    /// checked out are closed when they are checked in.
    ///
    /// Returns the number of connections closed.
    pub fn reclaim_idle(&self, scope: ReclaimScope<'_>) -> usize {
        let removed: Vec<Arc<PoolEntry>> = {
            let mut entries = self.entries();
            match scope {
                ReclaimScope::All => entries.drain().map(|(_, e)| e).collect(),
                ReclaimScope::Spec(spec) => entries.remove(spec.key()).into_iter().collect(),
            }
        };
        let closed = close_all(removed.iter().flat_map(|e| e.drain_idle(None)));
        debug!(closed, entries = removed.len(), "reclaimed idle connections");
        closed
    }

    /// Close idle connections whose expiry has passed. Entries stay registered.
    ///
    /// Returns the number of connections closed.
    pub fn reclaim_expired(&self) -> usize {
        let now = Instant::now();
        let entries: Vec<Arc<PoolEntry>> = self.entries().values().cloned().collect();
        let closed = close_all(entries.iter().flat_map(|e| e.drain_idle(Some(now))));
        if closed > 0 {
            debug!(closed, "closed expired idle connections");
        }
        closed
    }
}

fn close_all(connections: impl Iterator<Item = PooledConnection>) -> usize {
    let mut closed = 0;
    for mut pooled in connections {
        pooled.close();
        closed += 1;
    }
    closed
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn temp_spec(dir: &tempfile::TempDir, name: &str) -> ConnectionSpec {
        ConnectionSpec::new(dir.path().join(name).to_string_lossy().into_owned())
    }

    #[test]
    fn checkout_reuses_idle_connections() {
        let dir = tempfile::tempdir().unwrap();
        let spec = temp_spec(&dir, "a.db");
        let pool = ConnectionPool::new(PoolOptions::default());

        let first = pool.checkout(&spec).unwrap();
        let second = pool.checkout(&spec).unwrap();
        assert_ne!(first.pool_id(), second.pool_id());

        assert_eq!(pool.checkin(&first), CheckinOutcome::Returned);
        let third = pool.checkout(&spec).unwrap();
        assert_eq!(third.pool_id(), first.pool_id());
        assert_eq!(pool.entry(&spec).unwrap().len(), 2);
    }

    #[test]
    fn reclaim_orphans_in_use_connections() {
        let dir = tempfile::tempdir().unwrap();
        let spec = temp_spec(&dir, "b.db");
        let pool = ConnectionPool::new(PoolOptions::default());

        let busy = pool.checkout(&spec).unwrap();
        let idle = pool.checkout(&spec).unwrap();
        pool.checkin(&idle);

        assert_eq!(pool.reclaim_idle(ReclaimScope::Spec(&spec)), 1);
        assert!(idle.is_closed());
        assert!(!busy.is_closed());
        assert!(pool.entry(&spec).is_none());

        assert_eq!(pool.checkin(&busy), CheckinOutcome::ClosedOrphan);
        assert!(busy.is_closed());
        assert!(busy.lock().is_err());
    }

    #[test]
    fn expired_connections_are_reclaimed() {
        let dir = tempfile::tempdir().unwrap();
        let spec = temp_spec(&dir, "c.db");
        let pool = PoolOptions::builder()
            .idle_expiration(Duration::ZERO)
            .build();

        let conn = pool.checkout(&spec).unwrap();
        pool.checkin(&conn);
        assert_eq!(pool.reclaim_expired(), 1);
        assert!(conn.is_closed());
        assert!(pool.entry(&spec).unwrap().is_empty());
    }

    #[test]
    fn fresh_connections_survive_expiry_sweep() {
        let dir = tempfile::tempdir().unwrap();
        let spec = temp_spec(&dir, "d.db");
        let pool = ConnectionPool::new(PoolOptions::default());
        let conn = pool.checkout(&spec).unwrap();
        pool.checkin(&conn);
        assert_eq!(pool.reclaim_expired(), 0);
        assert_eq!(pool.entry(&spec).unwrap().idle_count(), 1);
    }
}
