use std::fmt;

use super::AsyncConnection;
use crate::error::SqliteOrmError;
use crate::expr::Expr;
use crate::mapping::Record;
use crate::query_builder::TableQuery;

/// [`TableQuery`] bound to an [`AsyncConnection`]; terminal calls run on the blocking pool.
pub struct AsyncTableQuery<T> {
    conn: AsyncConnection,
    query: TableQuery<T>,
}

impl<T> Clone for AsyncTableQuery<T> {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
            query: self.query.clone(),
        }
    }
}

impl<T> fmt::Debug for AsyncTableQuery<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncTableQuery")
            .field("spec", self.conn.spec())
            .field("query", &self.query)
            .finish()
    }
}

impl<T: Record + Send + 'static> AsyncTableQuery<T> {
    pub(crate) fn new(conn: AsyncConnection) -> Self {
        Self {
            conn,
            query: TableQuery::new(),
        }
    }

    fn with_query(&self, query: TableQuery<T>) -> Self {
        Self {
            conn: self.conn.clone(),
            query,
        }
    }

    /// The underlying query state.
    #[must_use]
    pub fn query(&self) -> &TableQuery<T> {
        &self.query
    }

    /// # Errors
    /// Returns `SqliteOrmError::Unsupported` after a skip or a take.
    pub fn filter(&self, predicate: Expr) -> Result<Self, SqliteOrmError> {
        Ok(self.with_query(self.query.filter(predicate)?))
    }

    #[must_use]
    pub fn skip(&self, n: u64) -> Self {
        self.with_query(self.query.skip(n))
    }

    #[must_use]
    pub fn take(&self, n: u64) -> Self {
        self.with_query(self.query.take(n))
    }

    /// # Errors
    /// Returns `SqliteOrmError::CompileError` unless `key` is a plain field reference.
    pub fn order_by(&self, key: Expr) -> Result<Self, SqliteOrmError> {
        Ok(self.with_query(self.query.order_by(key)?))
    }

    /// # Errors
    /// Returns `SqliteOrmError::CompileError` unless `key` is a plain field reference.
    pub fn order_by_descending(&self, key: Expr) -> Result<Self, SqliteOrmError> {
        Ok(self.with_query(self.query.order_by_descending(key)?))
    }

    /// # Errors
    /// Returns `SqliteOrmError::CompileError` unless `key` is a plain field reference.
    pub fn then_by(&self, key: Expr) -> Result<Self, SqliteOrmError> {
        Ok(self.with_query(self.query.then_by(key)?))
    }

    /// # Errors
    /// Returns `SqliteOrmError::CompileError` unless `key` is a plain field reference.
    pub fn then_by_descending(&self, key: Expr) -> Result<Self, SqliteOrmError> {
        Ok(self.with_query(self.query.then_by_descending(key)?))
    }

    /// # Errors
    /// Returns compile, engine or decoding errors.
    pub async fn to_list(&self) -> Result<Vec<T>, SqliteOrmError> {
        let query = self.query.clone();
        self.conn.run(move |conn| query.to_list(conn)).await
    }

    /// # Errors
    /// Returns compile or engine errors.
    pub async fn count(&self) -> Result<i64, SqliteOrmError> {
        let query = self.query.clone();
        self.conn.run(move |conn| query.count(conn)).await
    }

    /// # Errors
    /// Returns `SqliteOrmError::Unsupported` on a paged query, or compile and engine errors.
    pub async fn count_where(&self, predicate: Expr) -> Result<i64, SqliteOrmError> {
        self.filter(predicate)?.count().await
    }

    /// # Errors
    /// Returns `SqliteOrmError::NotFound` when nothing matches.
    pub async fn first(&self) -> Result<T, SqliteOrmError> {
        let query = self.query.clone();
        self.conn.run(move |conn| query.first(conn)).await
    }

    /// # Errors
    /// Returns compile, engine or decoding errors.
    pub async fn first_or_default(&self) -> Result<Option<T>, SqliteOrmError> {
        let query = self.query.clone();
        self.conn.run(move |conn| query.first_or_default(conn)).await
    }

    /// # Errors
    /// Returns `SqliteOrmError::NotFound` when fewer than `index + 1` rows match.
    pub async fn element_at(&self, index: u64) -> Result<T, SqliteOrmError> {
        let query = self.query.clone();
        self.conn.run(move |conn| query.element_at(conn, index)).await
    }

    /// # Errors
    /// Same rules as [`TableQuery::delete`].
    pub async fn delete(&self, predicate: Option<Expr>) -> Result<usize, SqliteOrmError> {
        let query = self.query.clone();
        self.conn.run(move |conn| query.delete(conn, predicate)).await
    }
}
