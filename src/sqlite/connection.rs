use std::fmt;
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use tracing::debug;

use crate::error::SqliteOrmError;

/// A native connection plus the lock that serializes every use of it.
///
/// Shared as `Arc<ConnectionWithLock>` between the pool and its callers. Statements only run
/// through a [`LockedConnection`], so no two threads ever drive the handle at once.
pub struct ConnectionWithLock {
    pool_id: u64,
    spec_key: String,
    conn: Mutex<rusqlite::Connection>,
    closed: AtomicBool,
    pub(crate) transaction_depth: AtomicUsize,
    pub(crate) savepoint_seq: AtomicU64,
}

impl ConnectionWithLock {
    pub(crate) fn new(pool_id: u64, spec_key: impl Into<String>, conn: rusqlite::Connection) -> Self {
        Self {
            pool_id,
            spec_key: spec_key.into(),
            conn: Mutex::new(conn),
            closed: AtomicBool::new(false),
            transaction_depth: AtomicUsize::new(0),
            savepoint_seq: AtomicU64::new(0),
        }
    }

    /// Wrap a connection that is not owned by any pool.
    #[must_use]
    pub fn standalone(conn: rusqlite::Connection) -> Self {
        Self::new(0, String::new(), conn)
    }

    /// Id assigned by the owning pool; `0` for standalone connections.
    #[must_use]
    pub fn pool_id(&self) -> u64 {
        self.pool_id
    }

    #[must_use]
    pub fn spec_key(&self) -> &str {
        &self.spec_key
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Refuse any further locks. The native handle is released with the last reference.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            debug!(pool_id = self.pool_id, key = %self.spec_key, "closing sqlite connection");
        }
    }

    /// Block until this connection is free, then hold it until the guard drops.
    ///
    /// # Errors
    /// Returns `SqliteOrmError::ConnectionClosed` if the connection was closed before or while
    /// waiting for the lock.
    pub fn lock(&self) -> Result<LockedConnection<'_>, SqliteOrmError> {
        self.ensure_open()?;
        let guard = match self.conn.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        self.ensure_open()?;
        Ok(LockedConnection { guard, owner: self })
    }

    fn ensure_open(&self) -> Result<(), SqliteOrmError> {
        if self.is_closed() {
            Err(SqliteOrmError::ConnectionClosed(format!(
                "connection {} ({}) has been closed",
                self.pool_id, self.spec_key
            )))
        } else {
            Ok(())
        }
    }
}

impl fmt::Debug for ConnectionWithLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionWithLock")
            .field("pool_id", &self.pool_id)
            .field("spec_key", &self.spec_key)
            .field("closed", &self.is_closed())
            .field("transaction_depth", &self.transaction_depth.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

/// Exclusive access to a [`ConnectionWithLock`]; the lock is released on drop.
pub struct LockedConnection<'a> {
    guard: MutexGuard<'a, rusqlite::Connection>,
    pub(crate) owner: &'a ConnectionWithLock,
}

impl LockedConnection<'_> {
    #[must_use]
    pub fn pool_id(&self) -> u64 {
        self.owner.pool_id
    }
}

impl Deref for LockedConnection<'_> {
    type Target = rusqlite::Connection;

    fn deref(&self) -> &Self::Target {
        &self.guard
    }
}

impl fmt::Debug for LockedConnection<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockedConnection")
            .field("owner", self.owner)
            .finish_non_exhaustive()
    }
}
