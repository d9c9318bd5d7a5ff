use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::SqliteOrmError;
use crate::sqlite::ConnectionWithLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    InUse,
    /// Removed from its entry and closed.
    Closed,
}

/// Bookkeeping for one connection owned by a pool entry.
#[derive(Debug)]
pub struct PooledConnection {
    pool_id: u64,
    connection: Arc<ConnectionWithLock>,
    state: ConnectionState,
    expires_at: Instant,
    idle_expiration: Duration,
}

impl PooledConnection {
    /// Wrap a freshly opened connection; it starts `InUse`.
    #[must_use]
    pub fn new(connection: Arc<ConnectionWithLock>, idle_expiration: Duration) -> Self {
        Self {
            pool_id: connection.pool_id(),
            connection,
            state: ConnectionState::InUse,
            expires_at: Instant::now() + idle_expiration,
            idle_expiration,
        }
    }

    #[must_use]
    pub fn pool_id(&self) -> u64 {
        self.pool_id
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    #[must_use]
    pub fn connection(&self) -> &Arc<ConnectionWithLock> {
        &self.connection
    }

    #[must_use]
    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }

    /// # Errors
    /// Returns `SqliteOrmError::InvariantViolation` for a closed connection.
    pub fn set_idle(&mut self) -> Result<(), SqliteOrmError> {
        match self.state {
            ConnectionState::Idle | ConnectionState::InUse => {
                self.state = ConnectionState::Idle;
                Ok(())
            }
            ConnectionState::Closed => Err(self.illegal("Idle")),
        }
    }

    /// Hand the connection out again and push its expiry forward.
    ///
    /// # Errors
    /// Returns `SqliteOrmError::InvariantViolation` unless the connection is `Idle`.
    pub fn set_as_in_use(&mut self) -> Result<(), SqliteOrmError> {
        if self.state != ConnectionState::Idle {
            return Err(self.illegal("InUse"));
        }
        self.state = ConnectionState::InUse;
        self.expires_at = Instant::now() + self.idle_expiration;
        Ok(())
    }

    /// Close the connection; no further transitions are allowed.
    pub(crate) fn close(&mut self) {
        self.state = ConnectionState::Closed;
        self.connection.close();
    }

    fn illegal(&self, target: &str) -> SqliteOrmError {
        SqliteOrmError::InvariantViolation(format!(
            "connection {} cannot move from {:?} to {target}",
            self.pool_id, self.state
        ))
    }
}
