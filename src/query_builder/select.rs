use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use super::TableQuery;
use crate::error::SqliteOrmError;
use crate::expr::Expr;
use crate::mapping::Record;
use crate::results::{DbRow, build_column_index};
use crate::sqlite::StatementEngine;
use crate::sqlite::params::Params;
use crate::sqlite::query::{extract_row, statement_column_names};
use crate::types::SqlValue;

impl<T: Record> TableQuery<T> {
    /// Number of matching rows.
    ///
    /// The limit and offset are rendered as for a select, so an offset past the single
    /// `count(*)` row yields `0`.
    ///
    /// # Errors
    /// Returns `SqliteOrmError::CompileError` for an uncompilable predicate, or the engine error.
    pub fn count<E: StatementEngine + ?Sized>(&self, engine: &E) -> Result<i64, SqliteOrmError> {
        let (sql, args) = self.render("count(*)")?;
        match engine.query_scalar(&sql, &args)? {
            SqlValue::Null => Ok(0),
            value => value.as_int().ok_or_else(|| {
                SqliteOrmError::ConversionError(format!("count(*) returned {value:?}"))
            }),
        }
    }

    /// Number of rows matching this query and `predicate`.
    ///
    /// # Errors
    /// Returns `SqliteOrmError::Unsupported` on a paged query, `SqliteOrmError::CompileError`
    /// for an uncompilable predicate, or the engine error.
    pub fn count_where<E: StatementEngine + ?Sized>(
        &self,
        engine: &E,
        predicate: Expr,
    ) -> Result<i64, SqliteOrmError> {
        self.filter(predicate)?.count(engine)
    }

    /// Every matching record.
    ///
    /// # Errors
    /// Returns `SqliteOrmError::CompileError` for an uncompilable predicate, the engine error,
    /// or the record's decoding error.
    pub fn to_list<E: StatementEngine + ?Sized>(&self, engine: &E) -> Result<Vec<T>, SqliteOrmError> {
        let (sql, args) = self.to_sql()?;
        engine
            .execute_select(&sql, &args)?
            .results
            .iter()
            .map(T::from_row)
            .collect()
    }

    /// The first matching record.
    ///
    /// # Errors
    /// Returns `SqliteOrmError::NotFound` when nothing matches.
    pub fn first<E: StatementEngine + ?Sized>(&self, engine: &E) -> Result<T, SqliteOrmError> {
        self.first_or_default(engine)?.ok_or_else(|| {
            SqliteOrmError::NotFound(format!("no {} row matched", T::mapping().table_name))
        })
    }

    /// The first matching record, or `None`.
    ///
    /// # Errors
    /// Returns `SqliteOrmError::CompileError` for an uncompilable predicate, or the engine error.
    pub fn first_or_default<E: StatementEngine + ?Sized>(
        &self,
        engine: &E,
    ) -> Result<Option<T>, SqliteOrmError> {
        let limit = self.limit.map_or(1, |n| n.min(1));
        Ok(self.take(limit).to_list(engine)?.into_iter().next())
    }

    /// The record at zero-based position `index`.
    ///
    /// # Errors
    /// Returns `SqliteOrmError::NotFound` when fewer than `index + 1` rows match.
    pub fn element_at<E: StatementEngine + ?Sized>(
        &self,
        engine: &E,
        index: u64,
    ) -> Result<T, SqliteOrmError> {
        self.skip(index).take(1).first(engine)
    }

    /// Prepare this query for row-by-row enumeration on `conn`.
    ///
    /// # Errors
    /// Returns `SqliteOrmError::CompileError` for an uncompilable predicate, or the engine error
    /// from preparing the statement.
    pub fn prepare<'conn>(
        &self,
        conn: &'conn rusqlite::Connection,
    ) -> Result<PreparedQuery<'conn, T>, SqliteOrmError> {
        let (sql, args) = self.to_sql()?;
        let stmt = conn.prepare(&sql)?;
        Ok(PreparedQuery {
            column_names: statement_column_names(&stmt),
            stmt,
            params: Params::convert(&args),
            eager: self.eager,
            _record: PhantomData,
        })
    }
}

/// A compiled `select` bound to one connection.
pub struct PreparedQuery<'conn, T> {
    stmt: rusqlite::Statement<'conn>,
    params: Params,
    column_names: Arc<Vec<String>>,
    eager: bool,
    _record: PhantomData<fn() -> T>,
}

impl<T: Record> PreparedQuery<'_, T> {
    /// Start enumerating. The statement is re-run on each call.
    ///
    /// # Errors
    /// Returns the engine error from starting the query; for eager queries also any error
    /// hit while reading ahead.
    pub fn iter(&mut self) -> Result<RecordIter<'_, T>, SqliteOrmError> {
        let rows = self
            .stmt
            .query(rusqlite::params_from_iter(self.params.as_values().iter()))?;
        let lazy = RecordIter::Lazy {
            rows,
            column_names: Arc::clone(&self.column_names),
            column_index: Arc::new(build_column_index(&self.column_names)),
            done: false,
        };
        if self.eager {
            let records = lazy.collect::<Result<Vec<T>, _>>()?;
            Ok(RecordIter::Eager(records.into_iter()))
        } else {
            Ok(lazy)
        }
    }

    /// Arguments bound to the statement.
    #[must_use]
    pub fn args(&self) -> &[rusqlite::types::Value] {
        self.params.as_values()
    }
}

/// Records produced by a [`PreparedQuery`].
pub enum RecordIter<'stmt, T> {
    /// Steps the statement once per `next`.
    Lazy {
        rows: rusqlite::Rows<'stmt>,
        column_names: Arc<Vec<String>>,
        column_index: Arc<HashMap<String, usize>>,
        done: bool,
    },
    /// Already read in full.
    Eager(std::vec::IntoIter<T>),
}

impl<T: Record> Iterator for RecordIter<'_, T> {
    type Item = Result<T, SqliteOrmError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            RecordIter::Eager(records) => records.next().map(Ok),
            RecordIter::Lazy {
                rows,
                column_names,
                column_index,
                done,
            } => {
                if *done {
                    return None;
                }
                match rows.next() {
                    Ok(Some(row)) => Some(
                        extract_row(row, column_names.len())
                            .map(|values| {
                                DbRow::with_index(
                                    Arc::clone(column_names),
                                    Arc::clone(column_index),
                                    values,
                                )
                            })
                            .and_then(|row| T::from_row(&row)),
                    ),
                    Ok(None) => {
                        *done = true;
                        None
                    }
                    Err(err) => {
                        *done = true;
                        Some(Err(err.into()))
                    }
                }
            }
        }
    }
}
