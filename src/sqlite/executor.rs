use super::connection::LockedConnection;
use super::params::Params;
use super::query::build_result_set;
use crate::error::SqliteOrmError;
use crate::results::ResultSet;
use crate::types::SqlValue;

/// Runs SQL with positional arguments.
///
/// Query builders and record helpers only talk to this trait, so they work the same on a
/// bare `rusqlite::Connection` and on a [`LockedConnection`] from the pool.
pub trait StatementEngine {
    /// Execute a DML statement and return the number of affected rows.
    ///
    /// # Errors
    /// Returns `SqliteOrmError::SqliteError` if preparing or running the statement fails.
    fn execute_dml(&self, sql: &str, args: &[SqlValue]) -> Result<usize, SqliteOrmError>;

    /// Run a query and collect its rows.
    ///
    /// # Errors
    /// Returns `SqliteOrmError::SqliteError` if preparing or running the statement fails.
    fn execute_select(&self, sql: &str, args: &[SqlValue]) -> Result<ResultSet, SqliteOrmError>;

    /// Rowid of the most recent successful insert on this connection.
    fn last_insert_rowid(&self) -> i64;

    /// First column of the first row, or `Null` when the query returns nothing.
    ///
    /// # Errors
    /// Returns `SqliteOrmError::SqliteError` if preparing or running the statement fails.
    fn query_scalar(&self, sql: &str, args: &[SqlValue]) -> Result<SqlValue, SqliteOrmError> {
        let rs = self.execute_select(sql, args)?;
        Ok(rs
            .results
            .first()
            .and_then(|row| row.get_by_index(0))
            .cloned()
            .unwrap_or(SqlValue::Null))
    }
}

impl StatementEngine for rusqlite::Connection {
    fn execute_dml(&self, sql: &str, args: &[SqlValue]) -> Result<usize, SqliteOrmError> {
        let params = Params::convert(args);
        let mut stmt = self.prepare_cached(sql)?;
        let rows = stmt.execute(&params.as_refs()[..])?;
        Ok(rows)
    }

    fn execute_select(&self, sql: &str, args: &[SqlValue]) -> Result<ResultSet, SqliteOrmError> {
        let params = Params::convert(args);
        let mut stmt = self.prepare_cached(sql)?;
        build_result_set(&mut stmt, params.as_values())
    }

    fn last_insert_rowid(&self) -> i64 {
        rusqlite::Connection::last_insert_rowid(self)
    }
}

impl StatementEngine for LockedConnection<'_> {
    fn execute_dml(&self, sql: &str, args: &[SqlValue]) -> Result<usize, SqliteOrmError> {
        (**self).execute_dml(sql, args)
    }

    fn execute_select(&self, sql: &str, args: &[SqlValue]) -> Result<ResultSet, SqliteOrmError> {
        (**self).execute_select(sql, args)
    }

    fn last_insert_rowid(&self) -> i64 {
        rusqlite::Connection::last_insert_rowid(self)
    }
}
