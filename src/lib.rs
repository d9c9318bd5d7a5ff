//! Typed predicates, immutable query builders and a locking connection pool over `rusqlite`.
//!
//! Records describe their table through [`mapping::Record`]. Queries are built from
//! [`expr::Expr`] trees and compiled to parameterized SQL by [`compiler::compile`]. Connections
//! come from a [`pool::ConnectionPool`] keyed by [`pool::ConnectionSpec`], and every statement
//! runs while holding that connection's lock, so one native handle is never driven by two
//! threads at once.
//!
//! ```rust
//! use sqlite_orm_middleware::prelude::*;
//!
//! let pred = field("name").starts_with("A").and(field("age").is_not_null());
//! # let _ = pred;
//! ```

pub mod async_connection;
pub mod compiler;
pub mod error;
pub mod expr;
pub mod mapping;
pub mod pool;
pub mod prelude;
pub mod query_builder;
pub mod results;
pub mod sqlite;
pub mod types;

pub use async_connection::{AsyncConnection, AsyncTableQuery};
pub use error::SqliteOrmError;
pub use pool::{CheckinOutcome, ConnectionPool, ConnectionSpec, PoolOptions};
pub use query_builder::TableQuery;
pub use types::{SqlType, SqlValue};
