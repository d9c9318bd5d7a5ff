//! Immutable, fluent queries over one record type.
//!
//! Every builder call returns a new [`TableQuery`]; the receiver is never changed, so a
//! partially built query can be shared and extended in different directions.
//!
//! ```rust
//! # use sqlite_orm_middleware::prelude::*;
//! # fn demo<T: Record>(conn: &rusqlite::Connection) -> Result<(), SqliteOrmError> {
//! let adults = TableQuery::<T>::new().filter(field("age").ge(18))?;
//! let oldest_first = adults.order_by_descending(field("age"))?.take(10);
//! let rows = oldest_first.to_list(conn)?;
//! # let _ = rows;
//! # Ok(())
//! # }
//! ```

mod dml;
mod select;

pub use select::{PreparedQuery, RecordIter};

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use tracing::trace;

use crate::compiler::{compile, compile_ordering};
use crate::error::SqliteOrmError;
use crate::expr::Expr;
use crate::mapping::{Record, quote_ident};
use crate::types::SqlValue;

/// One `order by` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ordering {
    pub column: String,
    pub ascending: bool,
}

/// Query state for records of type `T`.
pub struct TableQuery<T> {
    predicate: Option<Arc<Expr>>,
    orderings: Arc<[Ordering]>,
    limit: Option<u64>,
    offset: Option<u64>,
    eager: bool,
    _record: PhantomData<fn() -> T>,
}

impl<T> Clone for TableQuery<T> {
    fn clone(&self) -> Self {
        Self {
            predicate: self.predicate.clone(),
            orderings: Arc::clone(&self.orderings),
            limit: self.limit,
            offset: self.offset,
            eager: self.eager,
            _record: PhantomData,
        }
    }
}

impl<T> fmt::Debug for TableQuery<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableQuery")
            .field("predicate", &self.predicate)
            .field("orderings", &self.orderings)
            .field("limit", &self.limit)
            .field("offset", &self.offset)
            .field("eager", &self.eager)
            .finish()
    }
}

impl<T: Record> Default for TableQuery<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Record> TableQuery<T> {
    /// An unfiltered query over the whole table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            predicate: None,
            orderings: Arc::from(Vec::new()),
            limit: None,
            offset: None,
            eager: false,
            _record: PhantomData,
        }
    }

    /// Add a condition; combined with any existing one using `and`.
    ///
    /// # Errors
    /// Returns `SqliteOrmError::Unsupported` once a limit or offset is set, since the
    /// rendered `where` would run before the paging.
    pub fn filter(&self, predicate: Expr) -> Result<Self, SqliteOrmError> {
        if self.limit.is_some() || self.offset.is_some() {
            return Err(SqliteOrmError::Unsupported(format!(
                "cannot filter {} after a skip or a take",
                T::mapping().table_name
            )));
        }
        let combined = match &self.predicate {
            Some(existing) => existing.as_ref().clone().and(predicate),
            None => predicate,
        };
        Ok(Self {
            predicate: Some(Arc::new(combined)),
            ..self.clone()
        })
    }

    /// Skip the first `n` rows.
    #[must_use]
    pub fn skip(&self, n: u64) -> Self {
        Self {
            offset: Some(n),
            ..self.clone()
        }
    }

    /// Return at most `n` rows.
    #[must_use]
    pub fn take(&self, n: u64) -> Self {
        Self {
            limit: Some(n),
            ..self.clone()
        }
    }

    /// Sort ascending by a field.
    ///
    /// # Errors
    /// Returns `SqliteOrmError::CompileError` unless `key` is a plain field reference.
    pub fn order_by(&self, key: Expr) -> Result<Self, SqliteOrmError> {
        self.push_ordering(&key, true)
    }

    /// # Errors
    /// Returns `SqliteOrmError::CompileError` unless `key` is a plain field reference.
    pub fn order_by_descending(&self, key: Expr) -> Result<Self, SqliteOrmError> {
        self.push_ordering(&key, false)
    }

    /// Secondary ascending sort, applied after the existing orderings.
    ///
    /// # Errors
    /// Returns `SqliteOrmError::CompileError` unless `key` is a plain field reference.
    pub fn then_by(&self, key: Expr) -> Result<Self, SqliteOrmError> {
        self.push_ordering(&key, true)
    }

    /// # Errors
    /// Returns `SqliteOrmError::CompileError` unless `key` is a plain field reference.
    pub fn then_by_descending(&self, key: Expr) -> Result<Self, SqliteOrmError> {
        self.push_ordering(&key, false)
    }

    /// Materialize every row before the first one is yielded by [`PreparedQuery::iter`].
    #[must_use]
    pub fn eager(&self) -> Self {
        Self {
            eager: true,
            ..self.clone()
        }
    }

    /// Step the statement once per yielded row (the default).
    #[must_use]
    pub fn deferred(&self) -> Self {
        Self {
            eager: false,
            ..self.clone()
        }
    }

    /// Relational joins are not supported.
    ///
    /// # Errors
    /// Always returns `SqliteOrmError::Unsupported`.
    pub fn join<U: Record>(&self, _inner: &TableQuery<U>) -> Result<Self, SqliteOrmError> {
        Err(SqliteOrmError::Unsupported(format!(
            "joining {} with {} is not supported",
            T::mapping().table_name,
            U::mapping().table_name
        )))
    }

    #[must_use]
    pub fn predicate(&self) -> Option<&Expr> {
        self.predicate.as_deref()
    }

    #[must_use]
    pub fn orderings(&self) -> &[Ordering] {
        &self.orderings
    }

    #[must_use]
    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    #[must_use]
    pub fn offset(&self) -> Option<u64> {
        self.offset
    }

    #[must_use]
    pub fn is_eager(&self) -> bool {
        self.eager
    }

    /// Render the `select` statement for this query and its arguments.
    ///
    /// # Errors
    /// Returns `SqliteOrmError::CompileError` if the predicate cannot be compiled.
    pub fn to_sql(&self) -> Result<(String, Vec<SqlValue>), SqliteOrmError> {
        self.render(&T::mapping().select_list())
    }

    fn push_ordering(&self, key: &Expr, ascending: bool) -> Result<Self, SqliteOrmError> {
        let column = compile_ordering(key, T::mapping())?;
        let mut orderings = self.orderings.to_vec();
        orderings.push(Ordering { column, ascending });
        Ok(Self {
            orderings: Arc::from(orderings),
            ..self.clone()
        })
    }

    pub(crate) fn render(
        &self,
        select_list: &str,
    ) -> Result<(String, Vec<SqlValue>), SqliteOrmError> {
        let mapping = T::mapping();
        let mut args = Vec::new();
        let mut sql = format!(
            "select {select_list} from {}",
            quote_ident(&mapping.table_name)
        );

        if let Some(predicate) = &self.predicate {
            let compiled = compile(predicate, mapping, &mut args)?;
            sql.push_str(" where ");
            sql.push_str(&compiled.text);
        }

        if !self.orderings.is_empty() {
            let order = self
                .orderings
                .iter()
                .map(|o| {
                    let column = quote_ident(&o.column);
                    if o.ascending {
                        column
                    } else {
                        format!("{column} desc")
                    }
                })
                .collect::<Vec<_>>()
                .join(", ");
            sql.push_str(" order by ");
            sql.push_str(&order);
        }

        match (self.limit, self.offset) {
            (Some(limit), offset) => {
                sql.push_str(&format!(" limit {limit}"));
                if let Some(offset) = offset {
                    sql.push_str(&format!(" offset {offset}"));
                }
            }
            (None, Some(offset)) => sql.push_str(&format!(" limit -1 offset {offset}")),
            (None, None) => {}
        }

        trace!(sql = %sql, args = args.len(), "compiled query");
        Ok((sql, args))
    }
}
