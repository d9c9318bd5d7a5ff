use crate::error::SqliteOrmError;
use crate::expr::Expr;
use crate::mapping::TableMapping;

/// Resolve an ordering key to its column name.
///
/// Only a direct field reference is accepted, optionally wrapped in one conversion.
///
/// # Errors
/// Returns `SqliteOrmError::CompileError` for any other shape or an unmapped field.
pub fn compile_ordering(expr: &Expr, mapping: &TableMapping) -> Result<String, SqliteOrmError> {
    let target = match expr {
        Expr::Convert { operand, .. } => operand.as_ref(),
        other => other,
    };
    let Expr::Member { receiver, field } = target else {
        return Err(not_simple(expr));
    };
    if !matches!(receiver.as_ref(), Expr::Parameter) {
        return Err(not_simple(expr));
    }
    mapping
        .find_column_with_property_name(field)
        .map(|c| c.name.clone())
        .ok_or_else(|| {
            SqliteOrmError::compile(format!(
                "{} has no mapped field named {field}",
                mapping.table_name
            ))
        })
}

fn not_simple(expr: &Expr) -> SqliteOrmError {
    SqliteOrmError::compile(format!(
        "order by must be a simple field reference, got {expr:?}"
    ))
}
