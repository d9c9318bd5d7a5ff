//! Convenient imports for common functionality.
//!
//! This module re-exports the most commonly used types and functions
//! to make it easier to get started with the library.

pub use crate::async_connection::{AsyncConnection, AsyncTableQuery};
pub use crate::compiler::{Compiled, compile, compile_ordering};
pub use crate::error::SqliteOrmError;
pub use crate::expr::{BinaryOp, Captured, Expr, Method, StringComparison, field, list, value};
pub use crate::mapping::{ColumnMapping, Record, TableMapping};
pub use crate::pool::{
    CheckinOutcome, ConnectionPool, ConnectionSpec, PoolOptions, PoolOptionsBuilder,
    ReclaimScope,
};
pub use crate::query_builder::{Ordering, PreparedQuery, RecordIter, TableQuery};
pub use crate::results::{DbRow, ResultSet};
pub use crate::sqlite::{ConnectionWithLock, LockedConnection, RecordStore, StatementEngine};
pub use crate::types::{SqlType, SqlValue};

pub use tokio_util::sync::CancellationToken;
