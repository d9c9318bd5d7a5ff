//! Translate [`Expr`] trees into SQL text plus positional arguments.
//!
//! Every `?` in the produced text has exactly one matching entry in the argument list, in
//! the order the placeholders appear.

mod call;
mod ordering;

pub use ordering::compile_ordering;

use crate::error::SqliteOrmError;
use crate::expr::{BinaryOp, Captured, Expr};
use crate::mapping::{TableMapping, quote_ident};
use crate::types::{SqlType, SqlValue};

/// A compiled fragment.
#[derive(Debug, Clone, PartialEq)]
pub struct Compiled {
    pub text: String,
    /// Concrete value behind the fragment, when there is one (constants, captured members,
    /// conversions of those).
    pub value: Option<Captured>,
}

impl Compiled {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            value: None,
        }
    }

    /// A lone placeholder bound to `null`.
    #[must_use]
    pub fn is_null_placeholder(&self) -> bool {
        self.text == "?" && self.value.as_ref().is_none_or(Captured::is_null)
    }
}

/// Compile `expr` against `mapping`, appending bound values to `args`.
///
/// # Errors
/// Returns `SqliteOrmError::CompileError` for any construct without a SQL translation, and
/// `SqliteOrmError::ConversionError` when a `Convert` node cannot coerce its value.
pub fn compile(
    expr: &Expr,
    mapping: &TableMapping,
    args: &mut Vec<SqlValue>,
) -> Result<Compiled, SqliteOrmError> {
    match expr {
        Expr::Binary { op, left, right } => compile_binary(*op, left, right, mapping, args),
        Expr::Not(operand) => {
            let inner = compile(operand, mapping, args)?;
            let value = match inner.value {
                Some(Captured::Scalar(SqlValue::Bool(b))) => {
                    Some(Captured::Scalar(SqlValue::Bool(!b)))
                }
                other => other,
            };
            Ok(Compiled {
                text: format!("NOT({})", inner.text),
                value,
            })
        }
        Expr::Call {
            method,
            receiver,
            args: call_args,
        } => call::compile_call(method, receiver.as_deref(), call_args, mapping, args),
        Expr::Constant(captured) => bind_captured(captured.clone(), args),
        Expr::Convert { target, operand } => compile_convert(*target, operand, mapping, args),
        Expr::Member { receiver, field } => {
            if matches!(receiver.as_ref(), Expr::Parameter) {
                let column = mapping.find_column_with_property_name(field).ok_or_else(|| {
                    SqliteOrmError::compile(format!(
                        "{} has no mapped field named {field}",
                        mapping.table_name
                    ))
                })?;
                return Ok(Compiled::text(quote_ident(&column.name)));
            }
            let owner = evaluate(receiver)?;
            let value = read_field(&owner, field)?;
            bind_captured(value, args)
        }
        Expr::Parameter => Err(SqliteOrmError::compile(
            "the record parameter can only be used through one of its fields",
        )),
    }
}

fn compile_binary(
    op: BinaryOp,
    left: &Expr,
    right: &Expr,
    mapping: &TableMapping,
    args: &mut Vec<SqlValue>,
) -> Result<Compiled, SqliteOrmError> {
    let left = compile(left, mapping, args)?;
    let right = compile(right, mapping, args)?;

    let text = if left.is_null_placeholder() {
        compile_null_comparison(op, &right)?
    } else if right.is_null_placeholder() {
        compile_null_comparison(op, &left)?
    } else {
        let sql = op
            .sql()
            .ok_or_else(|| SqliteOrmError::compile(format!("unsupported operator {op:?}")))?;
        format!("({} {sql} {})", left.text, right.text)
    };
    Ok(Compiled::text(text))
}

fn compile_null_comparison(op: BinaryOp, other: &Compiled) -> Result<String, SqliteOrmError> {
    match op {
        BinaryOp::Eq => Ok(format!("({} is ?)", other.text)),
        BinaryOp::Ne => Ok(format!("({} is not ?)", other.text)),
        _ => Err(SqliteOrmError::compile(format!(
            "cannot compare with null using {op:?}"
        ))),
    }
}

fn compile_convert(
    target: SqlType,
    operand: &Expr,
    mapping: &TableMapping,
    args: &mut Vec<SqlValue>,
) -> Result<Compiled, SqliteOrmError> {
    let start = args.len();
    let inner = compile(operand, mapping, args)?;
    let Some(value) = inner.value else {
        return Ok(inner);
    };
    let converted = coerce_captured(&value, target)?;

    // A wrapped operand such as `NOT(?)` computes its result from the original argument in
    // SQL, so only bare placeholders are rebound.
    if !is_bare_placeholder(&inner.text) {
        return Ok(Compiled {
            text: inner.text,
            value: Some(converted),
        });
    }
    let bound = &mut args[start..];
    match &converted {
        Captured::Scalar(v) if bound.len() == 1 => bound[0] = v.clone(),
        Captured::List(items) if bound.len() == items.len() => {
            for (slot, item) in bound.iter_mut().zip(items) {
                if let Captured::Scalar(v) = item {
                    *slot = v.clone();
                }
            }
        }
        _ => {}
    }

    Ok(Compiled {
        text: inner.text,
        value: Some(converted),
    })
}

/// `?` or `(?,?,...)`, exactly as [`bind_captured`] renders them.
fn is_bare_placeholder(text: &str) -> bool {
    text == "?"
        || text
            .strip_prefix('(')
            .and_then(|t| t.strip_suffix(')'))
            .is_some_and(|list| list.is_empty() || list.split(',').all(|p| p == "?"))
}

/// Bind a concrete value: scalars become `?`, lists become `(?,?,...)`.
fn bind_captured(value: Captured, args: &mut Vec<SqlValue>) -> Result<Compiled, SqliteOrmError> {
    let text = match &value {
        Captured::Scalar(v) => {
            args.push(v.clone());
            "?".to_string()
        }
        Captured::List(items) => {
            let mut placeholders = Vec::with_capacity(items.len());
            for item in items {
                let Captured::Scalar(v) = item else {
                    return Err(SqliteOrmError::compile(
                        "only lists of scalar values can be bound",
                    ));
                };
                args.push(v.clone());
                placeholders.push("?");
            }
            format!("({})", placeholders.join(","))
        }
        Captured::Object(_) => {
            return Err(SqliteOrmError::compile(
                "a captured object must be read through one of its fields",
            ));
        }
    };
    Ok(Compiled {
        text,
        value: Some(value),
    })
}

/// Resolve a captured receiver to its value without binding anything.
fn evaluate(expr: &Expr) -> Result<Captured, SqliteOrmError> {
    match expr {
        Expr::Constant(captured) => Ok(captured.clone()),
        Expr::Member { receiver, field } if !matches!(receiver.as_ref(), Expr::Parameter) => {
            let owner = evaluate(receiver)?;
            read_field(&owner, field)
        }
        Expr::Convert { target, operand } => coerce_captured(&evaluate(operand)?, *target),
        other => Err(SqliteOrmError::compile(format!(
            "member access on {} is not supported",
            describe(other)
        ))),
    }
}

fn read_field(owner: &Captured, field: &str) -> Result<Captured, SqliteOrmError> {
    match owner {
        Captured::Object(_) => owner
            .field(field)
            .cloned()
            .ok_or_else(|| SqliteOrmError::compile(format!("captured value has no field {field}"))),
        _ => Err(SqliteOrmError::compile(format!(
            "cannot read field {field} of a non-object value"
        ))),
    }
}

fn coerce_captured(value: &Captured, target: SqlType) -> Result<Captured, SqliteOrmError> {
    match value {
        Captured::Scalar(v) => Ok(Captured::Scalar(v.coerce(target)?)),
        Captured::List(items) => items
            .iter()
            .map(|item| coerce_captured(item, target))
            .collect::<Result<Vec<_>, _>>()
            .map(Captured::List),
        Captured::Object(_) => Err(SqliteOrmError::ConversionError(format!(
            "cannot convert an object to {target:?}"
        ))),
    }
}

fn describe(expr: &Expr) -> &'static str {
    match expr {
        Expr::Binary { .. } => "a binary expression",
        Expr::Not(_) => "a negation",
        Expr::Call { .. } => "a method call",
        Expr::Constant(_) => "a constant",
        Expr::Convert { .. } => "a conversion",
        Expr::Member { .. } => "a member access",
        Expr::Parameter => "the record parameter",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{field, value};
    use crate::mapping::ColumnMapping;

    fn mapping() -> TableMapping {
        TableMapping::new(
            "Person",
            vec![
                ColumnMapping::new("id", SqlType::Integer).column("Id").primary_key(),
                ColumnMapping::new("name", SqlType::Text).column("Name"),
                ColumnMapping::new("age", SqlType::Integer).column("Age"),
            ],
        )
    }

    fn run(expr: &Expr) -> Result<(String, Vec<SqlValue>), SqliteOrmError> {
        let mut args = Vec::new();
        let c = compile(expr, &mapping(), &mut args)?;
        assert_eq!(c.text.matches('?').count(), args.len(), "{}", c.text);
        Ok((c.text, args))
    }

    #[test]
    fn comparison_binds_constant() {
        let (sql, args) = run(&field("age").gt(3)).unwrap();
        assert_eq!(sql, "(\"Age\" > ?)");
        assert_eq!(args, vec![SqlValue::Int(3)]);
    }

    #[test]
    fn null_comparisons_use_is() {
        let (sql, args) = run(&field("name").eq(SqlValue::Null)).unwrap();
        assert_eq!(sql, "(\"Name\" is ?)");
        assert_eq!(args, vec![SqlValue::Null]);

        let (sql, _) = run(&value(SqlValue::Null).ne(field("name"))).unwrap();
        assert_eq!(sql, "(\"Name\" is not ?)");

        assert!(run(&field("name").gt(SqlValue::Null)).is_err());
    }

    #[test]
    fn not_negates_boolean_literal() {
        let mut args = Vec::new();
        let c = compile(&value(true).not(), &mapping(), &mut args).unwrap();
        assert_eq!(c.text, "NOT(?)");
        assert_eq!(c.value, Some(Captured::Scalar(SqlValue::Bool(false))));
        assert_eq!(args, vec![SqlValue::Bool(true)]);
    }

    #[test]
    fn rejected_operators_name_the_operator() {
        let err = run(&field("age").op(BinaryOp::Multiply, 2)).unwrap_err();
        assert!(err.to_string().contains("Multiply"));
    }

    #[test]
    fn unknown_field_and_bare_parameter_fail() {
        assert!(matches!(
            run(&field("missing").eq(1)),
            Err(SqliteOrmError::CompileError(_))
        ));
        assert!(run(&Expr::Parameter).is_err());
    }

    #[test]
    fn convert_rebinds_placeholder() {
        let (sql, args) = run(&field("age").eq(value("42").convert(SqlType::Integer))).unwrap();
        assert_eq!(sql, "(\"Age\" = ?)");
        assert_eq!(args, vec![SqlValue::Int(42)]);

        let (_, args) = run(&field("age").eq(value(SqlValue::Null).convert(SqlType::Integer)))
            .unwrap();
        assert_eq!(args, vec![SqlValue::Null]);
    }

    #[test]
    fn convert_keeps_arguments_of_wrapped_operands() {
        let mut args = Vec::new();
        let c = compile(
            &value(true).not().convert(SqlType::Integer),
            &mapping(),
            &mut args,
        )
        .unwrap();
        assert_eq!(c.text, "NOT(?)");
        assert_eq!(args, vec![SqlValue::Bool(true)]);
        assert_eq!(c.value, Some(Captured::Scalar(SqlValue::Int(0))));

        let (sql, args) = run(&field("id").is_in(value(vec![1, 2]).convert(SqlType::Text))).unwrap();
        assert_eq!(sql, "(\"Id\" in (?,?))");
        assert_eq!(args, vec![SqlValue::Text("1".into()), SqlValue::Text("2".into())]);
    }

    #[test]
    fn placeholder_shapes() {
        assert!(is_bare_placeholder("?"));
        assert!(is_bare_placeholder("(?,?,?)"));
        assert!(is_bare_placeholder("()"));
        assert!(!is_bare_placeholder("NOT(?)"));
        assert!(!is_bare_placeholder("(? + ?)"));
        assert!(!is_bare_placeholder("(\"Age\" > ?)"));
    }

    #[test]
    fn captured_member_access_binds_field_value() {
        let outer = Captured::from_json(serde_json::json!({
            "limits": { "min": 18 },
            "ids": [1, 2, 3]
        }));
        let (sql, args) =
            run(&field("age").ge(value(outer.clone()).member("limits").member("min"))).unwrap();
        assert_eq!(sql, "(\"Age\" >= ?)");
        assert_eq!(args, vec![SqlValue::Int(18)]);

        let (sql, args) = run(&field("id").is_in(value(outer.clone()).member("ids"))).unwrap();
        assert_eq!(sql, "(\"Id\" in (?,?,?))");
        assert_eq!(args.len(), 3);

        assert!(run(&field("age").eq(value(outer.clone()).member("nope"))).is_err());
        assert!(run(&field("age").eq(value(outer))).is_err());
    }

    #[test]
    fn member_of_column_is_rejected() {
        assert!(run(&field("name").member("len").eq(1)).is_err());
    }
}
