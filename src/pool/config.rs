use std::time::Duration;

use super::ConnectionPool;

/// Default time an idle connection may sit in the pool before `reclaim_expired` closes it.
pub const DEFAULT_IDLE_EXPIRATION: Duration = Duration::from_secs(120 * 60);

/// Options for a [`ConnectionPool`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolOptions {
    pub idle_expiration: Duration,
    /// Applied to every newly opened connection.
    pub busy_timeout: Option<Duration>,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            idle_expiration: DEFAULT_IDLE_EXPIRATION,
            busy_timeout: None,
        }
    }
}

impl PoolOptions {
    #[must_use]
    pub fn builder() -> PoolOptionsBuilder {
        PoolOptionsBuilder::new()
    }
}

/// Fluent builder for pool options.
#[derive(Debug, Clone, Default)]
pub struct PoolOptionsBuilder {
    opts: PoolOptions,
}

impl PoolOptionsBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn idle_expiration(mut self, idle_expiration: Duration) -> Self {
        self.opts.idle_expiration = idle_expiration;
        self
    }

    #[must_use]
    pub fn busy_timeout(mut self, busy_timeout: Duration) -> Self {
        self.opts.busy_timeout = Some(busy_timeout);
        self
    }

    #[must_use]
    pub fn finish(self) -> PoolOptions {
        self.opts
    }

    /// Build a standalone pool with these options.
    #[must_use]
    pub fn build(self) -> ConnectionPool {
        ConnectionPool::new(self.finish())
    }
}
