use std::sync::Arc;

use rusqlite::Statement;
use rusqlite::types::Value;

use crate::error::SqliteOrmError;
use crate::results::ResultSet;
use crate::types::SqlValue;

/// Extract a `SqlValue` from a `SQLite` row.
///
/// # Errors
/// Returns `SqliteOrmError::SqliteError` if the column cannot be read.
pub fn sqlite_extract_value_sync(
    row: &rusqlite::Row,
    idx: usize,
) -> Result<SqlValue, SqliteOrmError> {
    let value: Value = row.get(idx)?;
    Ok(match value {
        Value::Null => SqlValue::Null,
        Value::Integer(i) => SqlValue::Int(i),
        Value::Real(f) => SqlValue::Float(f),
        Value::Text(s) => SqlValue::Text(s),
        Value::Blob(b) => SqlValue::Blob(b),
    })
}

/// Read every column of the current row.
///
/// # Errors
/// Returns `SqliteOrmError::SqliteError` if a column cannot be read.
pub fn extract_row(row: &rusqlite::Row, col_count: usize) -> Result<Vec<SqlValue>, SqliteOrmError> {
    (0..col_count)
        .map(|i| sqlite_extract_value_sync(row, i))
        .collect()
}

/// Column names of a prepared statement, shared by all rows it yields.
#[must_use]
pub fn statement_column_names(stmt: &Statement) -> Arc<Vec<String>> {
    Arc::new(
        stmt.column_names()
            .iter()
            .map(std::string::ToString::to_string)
            .collect(),
    )
}

/// Run a prepared query and collect every row.
///
/// # Errors
/// Returns `SqliteOrmError::SqliteError` if stepping the statement or reading a row fails.
pub fn build_result_set(stmt: &mut Statement, params: &[Value]) -> Result<ResultSet, SqliteOrmError> {
    let column_names = statement_column_names(stmt);
    let col_count = column_names.len();

    let mut result_set = ResultSet::with_capacity(10);
    result_set.set_column_names(column_names);

    let mut rows_iter = stmt.query(rusqlite::params_from_iter(params.iter()))?;
    while let Some(row) = rows_iter.next()? {
        result_set.add_row_values(extract_row(row, col_count)?);
    }

    Ok(result_set)
}
