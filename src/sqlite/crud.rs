use super::executor::StatementEngine;
use crate::error::SqliteOrmError;
use crate::expr::{Expr, field, value};
use crate::mapping::{ColumnMapping, Record, TableMapping, quote_ident};
use crate::query_builder::TableQuery;
use crate::types::SqlValue;

/// Single-record helpers keyed by the mapped primary key.
///
/// Implemented for every [`StatementEngine`].
pub trait RecordStore: StatementEngine {
    /// Look a record up by primary key.
    ///
    /// # Errors
    /// Returns `SqliteOrmError::Unsupported` if `T` has no primary key, or the query error.
    fn find<T: Record>(&self, key: impl Into<SqlValue>) -> Result<Option<T>, SqliteOrmError> {
        let pk = require_pk(T::mapping(), "find")?;
        TableQuery::<T>::new()
            .filter(key_predicate(pk, key.into()))?
            .first_or_default(self)
    }

    /// Like [`RecordStore::find`], but a missing row is an error.
    ///
    /// # Errors
    /// Returns `SqliteOrmError::NotFound` when no row has this key.
    fn get<T: Record>(&self, key: impl Into<SqlValue>) -> Result<T, SqliteOrmError> {
        let key = key.into();
        self.find(key.clone())?.ok_or_else(|| {
            SqliteOrmError::NotFound(format!(
                "no {} row with key {key:?}",
                T::mapping().table_name
            ))
        })
    }

    /// Insert a record and return its rowid. An auto-increment key is left to the database.
    ///
    /// # Errors
    /// Returns the engine error, e.g. a constraint violation.
    fn insert<T: Record>(&self, record: &T) -> Result<i64, SqliteOrmError> {
        let mapping = T::mapping();
        let values = record_values(mapping, record)?;
        let (names, args): (Vec<String>, Vec<SqlValue>) = mapping
            .insert_columns()
            .map(|(idx, col)| (quote_ident(&col.name), values[idx].clone()))
            .unzip();
        let sql = if names.is_empty() {
            format!("insert into {} default values", quote_ident(&mapping.table_name))
        } else {
            format!(
                "insert into {} ({}) values ({})",
                quote_ident(&mapping.table_name),
                names.join(", "),
                vec!["?"; names.len()].join(", ")
            )
        };
        self.execute_dml(&sql, &args)?;
        Ok(self.last_insert_rowid())
    }

    /// Overwrite every non-key column of the row identified by the record's key, with the
    /// record's values.
    ///
    /// # Errors
    /// Returns `SqliteOrmError::Unsupported` if `T` has no primary key, or the engine error.
    fn update<T: Record>(&self, record: &T) -> Result<usize, SqliteOrmError> {
        let mapping = T::mapping();
        let pk = require_pk(mapping, "update")?;
        let values = record_values(mapping, record)?;

        let mut assignments = Vec::new();
        let mut args = Vec::new();
        let mut key = SqlValue::Null;
        for (col, v) in mapping.columns.iter().zip(values) {
            if col.primary_key {
                key = v;
            } else {
                assignments.push(format!("{} = ?", quote_ident(&col.name)));
                args.push(v);
            }
        }
        if assignments.is_empty() {
            return Ok(0);
        }
        args.push(key);

        let sql = format!(
            "update {} set {} where {} = ?",
            quote_ident(&mapping.table_name),
            assignments.join(", "),
            quote_ident(&pk.name)
        );
        self.execute_dml(&sql, &args)
    }

    /// Delete the row with this record's key.
    ///
    /// # Errors
    /// Returns `SqliteOrmError::Unsupported` if `T` has no primary key, or the engine error.
    fn delete_record<T: Record>(&self, record: &T) -> Result<usize, SqliteOrmError> {
        let mapping = T::mapping();
        let pk = require_pk(mapping, "delete")?;
        let values = record_values(mapping, record)?;
        let key = mapping
            .columns
            .iter()
            .zip(values)
            .find_map(|(col, v)| col.primary_key.then_some(v))
            .unwrap_or(SqlValue::Null);
        TableQuery::<T>::new().delete(self, Some(key_predicate(pk, key)))
    }

    /// Delete every row of `T`'s table.
    ///
    /// # Errors
    /// Returns the engine error.
    fn delete_all<T: Record>(&self) -> Result<usize, SqliteOrmError> {
        let sql = format!("delete from {}", quote_ident(&T::mapping().table_name));
        self.execute_dml(&sql, &[])
    }
}

impl<E: StatementEngine + ?Sized> RecordStore for E {}

fn require_pk<'m>(mapping: &'m TableMapping, action: &str) -> Result<&'m ColumnMapping, SqliteOrmError> {
    mapping.primary_key().ok_or_else(|| {
        SqliteOrmError::Unsupported(format!(
            "cannot {action} {}: it has no primary key",
            mapping.table_name
        ))
    })
}

fn key_predicate(pk: &ColumnMapping, key: SqlValue) -> Expr {
    field(pk.property.clone()).eq(value(key))
}

fn record_values<T: Record>(mapping: &TableMapping, record: &T) -> Result<Vec<SqlValue>, SqliteOrmError> {
    let values = record.to_values();
    if values.len() == mapping.columns.len() {
        Ok(values)
    } else {
        Err(SqliteOrmError::ConversionError(format!(
            "{} maps {} columns but the record produced {} values",
            mapping.table_name,
            mapping.columns.len(),
            values.len()
        )))
    }
}
