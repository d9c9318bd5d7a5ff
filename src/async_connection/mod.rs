//! Async facade over the pool.
//!
//! Every call checks a connection out, moves to tokio's blocking pool, takes the
//! connection lock, runs the work and checks the connection back in. Cancellation is only
//! observed right before and right after the lock is acquired; once the work has started it
//! runs to completion.

mod table_query;

pub use table_query::AsyncTableQuery;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::SqliteOrmError;
use crate::mapping::Record;
use crate::pool::{ConnectionPool, ConnectionSpec};
use crate::results::ResultSet;
use crate::sqlite::{ConnectionWithLock, LockedConnection, RecordStore, StatementEngine};
use crate::types::SqlValue;

/// A database handle for async code. Cheap to clone.
#[derive(Debug, Clone)]
pub struct AsyncConnection {
    pool: Arc<ConnectionPool>,
    spec: ConnectionSpec,
}

impl AsyncConnection {
    /// Use the process-wide pool.
    #[must_use]
    pub fn new(spec: ConnectionSpec) -> Self {
        Self::with_pool(ConnectionPool::current(), spec)
    }

    /// Shorthand for `new(ConnectionSpec::for_async(path))`.
    #[must_use]
    pub fn open(path: impl Into<String>) -> Self {
        Self::new(ConnectionSpec::for_async(path))
    }

    #[must_use]
    pub fn with_pool(pool: Arc<ConnectionPool>, spec: ConnectionSpec) -> Self {
        Self { pool, spec }
    }

    #[must_use]
    pub fn spec(&self) -> &ConnectionSpec {
        &self.spec
    }

    #[must_use]
    pub fn pool(&self) -> &Arc<ConnectionPool> {
        &self.pool
    }

    /// Run `func` with exclusive use of a pooled connection.
    ///
    /// # Errors
    /// Returns the checkout/lock error, `SqliteOrmError::ExecutionError` if the blocking task
    /// fails, or whatever `func` returns.
    pub async fn run<F, R>(&self, func: F) -> Result<R, SqliteOrmError>
    where
        F: FnOnce(&LockedConnection<'_>) -> Result<R, SqliteOrmError> + Send + 'static,
        R: Send + 'static,
    {
        self.run_cancellable(&CancellationToken::new(), func).await
    }

    /// Like [`Self::run`], giving up with `SqliteOrmError::Cancelled` if `token` fires before
    /// the connection lock is held.
    ///
    /// # Errors
    /// Returns `SqliteOrmError::Cancelled`, the checkout/lock error, a blocking task failure, or
    /// whatever `func` returns.
    pub async fn run_cancellable<F, R>(
        &self,
        token: &CancellationToken,
        func: F,
    ) -> Result<R, SqliteOrmError>
    where
        F: FnOnce(&LockedConnection<'_>) -> Result<R, SqliteOrmError> + Send + 'static,
        R: Send + 'static,
    {
        let pool = Arc::clone(&self.pool);
        let spec = self.spec.clone();
        let token = token.clone();
        tokio::task::spawn_blocking(move || {
            ensure_not_cancelled(&token)?;
            let checked_out = CheckedOut {
                conn: pool.checkout(&spec)?,
                pool: &pool,
            };
            run_locked(&checked_out.conn, &token, func)
        })
        .await?
    }

    /// # Errors
    /// Returns the engine error.
    pub async fn execute(
        &self,
        sql: impl Into<String>,
        args: Vec<SqlValue>,
    ) -> Result<usize, SqliteOrmError> {
        let sql = sql.into();
        self.run(move |conn| conn.execute_dml(&sql, &args)).await
    }

    /// # Errors
    /// Returns the engine error.
    pub async fn query(
        &self,
        sql: impl Into<String>,
        args: Vec<SqlValue>,
    ) -> Result<ResultSet, SqliteOrmError> {
        let sql = sql.into();
        self.run(move |conn| conn.execute_select(&sql, &args)).await
    }

    /// # Errors
    /// Returns the engine error.
    pub async fn query_scalar(
        &self,
        sql: impl Into<String>,
        args: Vec<SqlValue>,
    ) -> Result<SqlValue, SqliteOrmError> {
        let sql = sql.into();
        self.run(move |conn| conn.query_scalar(&sql, &args)).await
    }

    /// Start a query over `T`'s table.
    #[must_use]
    pub fn table<T: Record + Send + 'static>(&self) -> AsyncTableQuery<T> {
        AsyncTableQuery::new(self.clone())
    }

    /// # Errors
    /// Returns the engine error.
    pub async fn insert<T>(&self, record: T) -> Result<i64, SqliteOrmError>
    where
        T: Record + Send + 'static,
    {
        self.run(move |conn| conn.insert(&record)).await
    }

    /// Insert every record inside one transaction; returns how many were inserted.
    ///
    /// # Errors
    /// Returns the first insert error; nothing is kept in that case.
    pub async fn insert_all<T>(&self, records: Vec<T>) -> Result<usize, SqliteOrmError>
    where
        T: Record + Send + 'static,
    {
        self.run(move |conn| {
            conn.run_in_transaction(|tx| {
                for record in &records {
                    tx.insert(record)?;
                }
                Ok(records.len())
            })
        })
        .await
    }

    /// # Errors
    /// Returns `SqliteOrmError::Unsupported` without a primary key, or the engine error.
    pub async fn update<T>(&self, record: T) -> Result<usize, SqliteOrmError>
    where
        T: Record + Send + 'static,
    {
        self.run(move |conn| conn.update(&record)).await
    }

    /// # Errors
    /// Returns `SqliteOrmError::Unsupported` without a primary key, or the engine error.
    pub async fn delete_record<T>(&self, record: T) -> Result<usize, SqliteOrmError>
    where
        T: Record + Send + 'static,
    {
        self.run(move |conn| conn.delete_record(&record)).await
    }

    /// # Errors
    /// Returns `SqliteOrmError::Unsupported` without a primary key, or the query error.
    pub async fn find<T>(&self, key: impl Into<SqlValue>) -> Result<Option<T>, SqliteOrmError>
    where
        T: Record + Send + 'static,
    {
        let key = key.into();
        self.run(move |conn| conn.find::<T>(key)).await
    }

    /// # Errors
    /// Returns `SqliteOrmError::NotFound` when no row has this key.
    pub async fn get<T>(&self, key: impl Into<SqlValue>) -> Result<T, SqliteOrmError>
    where
        T: Record + Send + 'static,
    {
        let key = key.into();
        self.run(move |conn| conn.get::<T>(key)).await
    }

    /// Run `action` in a savepoint on one locked connection; any error rolls everything back.
    ///
    /// # Errors
    /// Returns the error produced by `action`, or by the transaction statements.
    pub async fn run_in_transaction<F, R>(&self, action: F) -> Result<R, SqliteOrmError>
    where
        F: FnOnce(&LockedConnection<'_>) -> Result<R, SqliteOrmError> + Send + 'static,
        R: Send + 'static,
    {
        self.run(move |conn| conn.run_in_transaction(action)).await
    }
}

/// Checks the connection back in when dropped, including while unwinding from a panic in
/// the caller's closure.
struct CheckedOut<'pool> {
    pool: &'pool ConnectionPool,
    conn: Arc<ConnectionWithLock>,
}

impl Drop for CheckedOut<'_> {
    fn drop(&mut self) {
        self.pool.checkin(&self.conn);
    }
}

fn ensure_not_cancelled(token: &CancellationToken) -> Result<(), SqliteOrmError> {
    if token.is_cancelled() {
        debug!("operation cancelled before acquiring the connection lock");
        Err(SqliteOrmError::Cancelled)
    } else {
        Ok(())
    }
}

fn run_locked<F, R>(
    conn: &ConnectionWithLock,
    token: &CancellationToken,
    func: F,
) -> Result<R, SqliteOrmError>
where
    F: FnOnce(&LockedConnection<'_>) -> Result<R, SqliteOrmError>,
{
    ensure_not_cancelled(token)?;
    let locked = conn.lock()?;
    ensure_not_cancelled(token)?;
    func(&locked)
}
