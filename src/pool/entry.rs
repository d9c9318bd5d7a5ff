use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use super::pooled::{ConnectionState, PooledConnection};
use super::spec::ConnectionSpec;
use crate::error::SqliteOrmError;
use crate::sqlite::ConnectionWithLock;

/// All pooled connections for one [`ConnectionSpec`].
///
/// The mutex guards bookkeeping only; no connection is opened, locked or closed while it is
/// held.
#[derive(Debug)]
pub struct PoolEntry {
    spec: ConnectionSpec,
    connections: Mutex<Vec<PooledConnection>>,
}

impl PoolEntry {
    #[must_use]
    pub fn new(spec: ConnectionSpec) -> Self {
        Self {
            spec,
            connections: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn spec(&self) -> &ConnectionSpec {
        &self.spec
    }

    fn connections(&self) -> MutexGuard<'_, Vec<PooledConnection>> {
        match self.connections.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Mark the first idle connection in use and return it.
    ///
    /// # Errors
    /// Returns `SqliteOrmError::InvariantViolation` if the bookkeeping is inconsistent.
    pub fn take_idle(&self) -> Result<Option<Arc<ConnectionWithLock>>, SqliteOrmError> {
        let mut connections = self.connections();
        match connections
            .iter_mut()
            .find(|c| c.state() == ConnectionState::Idle)
        {
            Some(pooled) => {
                pooled.set_as_in_use()?;
                Ok(Some(Arc::clone(pooled.connection())))
            }
            None => Ok(None),
        }
    }

    pub(crate) fn push_in_use(&self, pooled: PooledConnection) {
        self.connections().push(pooled);
    }

    /// Mark the connection with `pool_id` idle. Returns `false` if this entry does not own it.
    ///
    /// # Errors
    /// Returns `SqliteOrmError::InvariantViolation` if the connection was already closed.
    pub fn connection_finished(&self, pool_id: u64) -> Result<bool, SqliteOrmError> {
        let mut connections = self.connections();
        match connections.iter_mut().find(|c| c.pool_id() == pool_id) {
            Some(pooled) => {
                pooled.set_idle()?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Remove idle connections (only those expired before `cutoff`, if given). The caller
    /// closes them after the entry lock is released.
    pub(crate) fn drain_idle(&self, cutoff: Option<Instant>) -> Vec<PooledConnection> {
        let mut connections = self.connections();
        let (drained, kept): (Vec<_>, Vec<_>) = connections.drain(..).partition(|c| {
            c.state() == ConnectionState::Idle && cutoff.is_none_or(|t| c.expires_at() <= t)
        });
        *connections = kept;
        drained
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.connections().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.connections().is_empty()
    }

    #[must_use]
    pub fn idle_count(&self) -> usize {
        self.connections()
            .iter()
            .filter(|c| c.state() == ConnectionState::Idle)
            .count()
    }
}
