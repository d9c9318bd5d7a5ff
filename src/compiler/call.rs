use super::{Compiled, compile};
use crate::error::SqliteOrmError;
use crate::expr::{Captured, Expr, Method, StringComparison};
use crate::mapping::TableMapping;
use crate::types::SqlValue;

/// A compiled sub-expression with the arguments it bound, spliced later in text order.
struct Part {
    compiled: Compiled,
    args: Vec<SqlValue>,
}

impl Part {
    fn new(expr: &Expr, mapping: &TableMapping) -> Result<Self, SqliteOrmError> {
        let mut args = Vec::new();
        let compiled = compile(expr, mapping, &mut args)?;
        Ok(Self { compiled, args })
    }

    fn sql(&self) -> &str {
        &self.compiled.text
    }

    fn is_list(&self) -> bool {
        matches!(self.compiled.value, Some(Captured::List(_)))
    }
}

fn emit(text: String, parts: &[&Part], args: &mut Vec<SqlValue>) -> Compiled {
    for part in parts {
        args.extend(part.args.iter().cloned());
    }
    Compiled { text, value: None }
}

fn arity(method: &Method, expected: &str) -> SqliteOrmError {
    SqliteOrmError::compile(format!("{method:?} expects {expected}"))
}

pub(super) fn compile_call(
    method: &Method,
    receiver: Option<&Expr>,
    call_args: &[Expr],
    mapping: &TableMapping,
    args: &mut Vec<SqlValue>,
) -> Result<Compiled, SqliteOrmError> {
    let receiver = receiver.map(|r| Part::new(r, mapping)).transpose()?;
    let parts = call_args
        .iter()
        .map(|a| Part::new(a, mapping))
        .collect::<Result<Vec<_>, _>>()?;

    match (method, receiver.as_ref(), parts.as_slice()) {
        (Method::Like, None, [subject, pattern]) | (Method::Like, Some(subject), [pattern]) => {
            let text = format!("({} like {})", subject.sql(), pattern.sql());
            Ok(emit(text, &[subject, pattern], args))
        }
        (Method::Like, ..) => Err(arity(method, "a subject and a pattern")),

        (Method::Contains, None, [collection, item]) => {
            let text = format!("({} in {})", item.sql(), collection.sql());
            Ok(emit(text, &[item, collection], args))
        }
        (Method::Contains, Some(recv), [item]) if recv.is_list() => {
            let text = format!("({} in {})", item.sql(), recv.sql());
            Ok(emit(text, &[item, recv], args))
        }
        (Method::Contains, Some(recv), [needle]) => {
            let text = format!("(instr({}, {}) > 0)", recv.sql(), needle.sql());
            Ok(emit(text, &[recv, needle], args))
        }
        (Method::Contains, ..) => Err(arity(method, "a receiver and one argument, or two arguments")),

        (Method::StartsWith(cmp), Some(recv), [prefix]) => {
            let text = if cmp.ignores_case() {
                format!("({} like ({} || '%'))", recv.sql(), prefix.sql())
            } else {
                let len = text_length(prefix, *cmp)?;
                format!("(substr({}, 1, {len}) = {})", recv.sql(), prefix.sql())
            };
            Ok(emit(text, &[recv, prefix], args))
        }
        (Method::EndsWith(cmp), Some(recv), [suffix]) => {
            let text = if cmp.ignores_case() {
                format!("({} like ('%' || {}))", recv.sql(), suffix.sql())
            } else {
                let len = text_length(suffix, *cmp)?;
                format!("(substr({}, -{len}, {len}) = {})", recv.sql(), suffix.sql())
            };
            Ok(emit(text, &[recv, suffix], args))
        }
        (Method::StartsWith(_) | Method::EndsWith(_), ..) => {
            Err(arity(method, "a receiver and one argument"))
        }

        (Method::Equals, Some(recv), [other]) => {
            let text = format!("({} = ({}))", recv.sql(), other.sql());
            Ok(emit(text, &[recv, other], args))
        }
        (Method::Equals, ..) => Err(arity(method, "a receiver and one argument")),

        (Method::ToLower, Some(recv), []) => {
            Ok(emit(format!("(lower({}))", recv.sql()), &[recv], args))
        }
        (Method::ToUpper, Some(recv), []) => {
            Ok(emit(format!("(upper({}))", recv.sql()), &[recv], args))
        }
        (Method::ToLower | Method::ToUpper, ..) => Err(arity(method, "a receiver only")),

        (Method::Replace, Some(recv), [from, to]) => {
            let text = format!("(replace({}, {}, {}))", recv.sql(), from.sql(), to.sql());
            Ok(emit(text, &[recv, from, to], args))
        }
        (Method::Replace, ..) => Err(arity(method, "a receiver and two arguments")),

        (Method::Other(name), recv, rest) => {
            let ordered: Vec<&Part> = recv.into_iter().chain(rest.iter()).collect();
            let list = ordered.iter().map(|p| p.sql()).collect::<Vec<_>>().join(",");
            let text = format!("{}({list})", name.to_lowercase());
            Ok(emit(text, &ordered, args))
        }
    }
}

/// Length operand for the `substr` forms of prefix/suffix tests.
fn text_length(part: &Part, cmp: StringComparison) -> Result<String, SqliteOrmError> {
    match &part.compiled.value {
        Some(Captured::Scalar(SqlValue::Text(s))) => Ok(s.chars().count().to_string()),
        None if !part.sql().contains('?') => Ok(format!("length({})", part.sql())),
        _ => Err(SqliteOrmError::compile(format!(
            "{cmp:?} prefix/suffix tests need a text value"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use crate::compiler::compile;
    use crate::error::SqliteOrmError;
    use crate::expr::{Expr, Method, StringComparison, field, list, value};
    use crate::mapping::{ColumnMapping, TableMapping};
    use crate::types::{SqlType, SqlValue};

    fn mapping() -> TableMapping {
        TableMapping::new(
            "Person",
            vec![
                ColumnMapping::new("id", SqlType::Integer).column("Id"),
                ColumnMapping::new("name", SqlType::Text).column("Name"),
                ColumnMapping::new("nick", SqlType::Text).column("Nick"),
            ],
        )
    }

    fn run(expr: &Expr) -> Result<(String, Vec<SqlValue>), SqliteOrmError> {
        let mut args = Vec::new();
        let c = compile(expr, &mapping(), &mut args)?;
        Ok((c.text, args))
    }

    #[test]
    fn like_and_equals() {
        let (sql, args) = run(&field("name").like("A%")).unwrap();
        assert_eq!(sql, "(\"Name\" like ?)");
        assert_eq!(args, vec![SqlValue::Text("A%".into())]);

        let (sql, _) = run(&field("name").equals("bob")).unwrap();
        assert_eq!(sql, "(\"Name\" = (?))");
    }

    #[test]
    fn contains_on_text_and_lists() {
        let (sql, _) = run(&field("name").contains("ob")).unwrap();
        assert_eq!(sql, "(instr(\"Name\", ?) > 0)");

        let (sql, args) = run(&list([1, 2]).contains(field("id"))).unwrap();
        assert_eq!(sql, "(\"Id\" in (?,?))");
        assert_eq!(args, vec![SqlValue::Int(1), SqlValue::Int(2)]);
    }

    #[test]
    fn membership_binds_in_placeholder_order() {
        let (sql, args) = run(&value(7).is_in(list([1, 2]))).unwrap();
        assert_eq!(sql, "(? in (?,?))");
        assert_eq!(
            args,
            vec![SqlValue::Int(7), SqlValue::Int(1), SqlValue::Int(2)]
        );
    }

    #[test]
    fn starts_and_ends_with_modes() {
        let (sql, _) = run(&field("name").starts_with("Ab")).unwrap();
        assert_eq!(sql, "(substr(\"Name\", 1, 2) = ?)");

        let (sql, _) = run(
            &field("name").starts_with_cmp("ab", StringComparison::OrdinalIgnoreCase),
        )
        .unwrap();
        assert_eq!(sql, "(\"Name\" like (? || '%'))");

        let (sql, _) = run(&field("name").ends_with("xyz")).unwrap();
        assert_eq!(sql, "(substr(\"Name\", -3, 3) = ?)");

        let (sql, _) = run(
            &field("name").ends_with_cmp("z", StringComparison::InvariantCultureIgnoreCase),
        )
        .unwrap();
        assert_eq!(sql, "(\"Name\" like ('%' || ?))");

        let (sql, args) = run(&field("name").starts_with(field("nick"))).unwrap();
        assert_eq!(sql, "(substr(\"Name\", 1, length(\"Nick\")) = \"Nick\")");
        assert!(args.is_empty());

        assert!(run(&field("name").starts_with(5)).is_err());
    }

    #[test]
    fn string_functions_and_fallback() {
        let (sql, _) = run(&field("name").to_lower().eq("bob")).unwrap();
        assert_eq!(sql, "((lower(\"Name\")) = ?)");

        let (sql, args) = run(&field("name").replace("a", "b")).unwrap();
        assert_eq!(sql, "(replace(\"Name\", ?, ?))");
        assert_eq!(args.len(), 2);

        let (sql, _) = run(&field("name").call("Trim", vec![value(" ")])).unwrap();
        assert_eq!(sql, "trim(\"Name\",?)");
    }

    #[test]
    fn wrong_arity_is_a_compile_error() {
        let bad = Expr::Call {
            method: Method::Replace,
            receiver: Some(Box::new(field("name"))),
            args: vec![value("a")],
        };
        assert!(matches!(run(&bad), Err(SqliteOrmError::CompileError(_))));

        let no_receiver = Expr::Call {
            method: Method::ToUpper,
            receiver: None,
            args: vec![],
        };
        assert!(run(&no_receiver).is_err());
    }
}
