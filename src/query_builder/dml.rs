use tracing::debug;

use super::TableQuery;
use crate::compiler::compile;
use crate::error::SqliteOrmError;
use crate::expr::Expr;
use crate::mapping::{Record, quote_ident};
use crate::sqlite::StatementEngine;

impl<T: Record> TableQuery<T> {
    /// Delete the rows matching this query's predicate and `predicate`, right away.
    ///
    /// Returns the number of deleted rows.
    ///
    /// # Errors
    /// Returns `SqliteOrmError::Unsupported` when a limit or offset is set, or when there is no
    /// predicate at all; otherwise compile or engine errors.
    pub fn delete<E: StatementEngine + ?Sized>(
        &self,
        engine: &E,
        predicate: Option<Expr>,
    ) -> Result<usize, SqliteOrmError> {
        let mapping = T::mapping();
        if self.limit.is_some() || self.offset.is_some() {
            return Err(SqliteOrmError::Unsupported(format!(
                "cannot delete from {} with a limit or offset",
                mapping.table_name
            )));
        }

        let scoped = match predicate {
            Some(p) => self.filter(p)?,
            None => self.clone(),
        };
        let Some(condition) = scoped.predicate() else {
            return Err(SqliteOrmError::Unsupported(format!(
                "delete from {} requires a predicate; use delete_all to clear the table",
                mapping.table_name
            )));
        };

        let mut args = Vec::new();
        let compiled = compile(condition, mapping, &mut args)?;
        let sql = format!(
            "delete from {} where {}",
            quote_ident(&mapping.table_name),
            compiled.text
        );
        let deleted = engine.execute_dml(&sql, &args)?;
        debug!(table = %mapping.table_name, deleted, "deleted rows");
        Ok(deleted)
    }
}
