use chrono::NaiveDateTime;

use super::{BinaryOp, Captured, Expr, Method, StringComparison};
use crate::types::{SqlType, SqlValue};

/// Reference a field of the queried record.
#[must_use]
pub fn field(name: impl Into<String>) -> Expr {
    Expr::Member {
        receiver: Box::new(Expr::Parameter),
        field: name.into(),
    }
}

/// A literal or captured value.
#[must_use]
pub fn value(v: impl Into<Captured>) -> Expr {
    Expr::Constant(v.into())
}

/// A captured list, e.g. the collection side of `is_in`.
#[must_use]
pub fn list<T: Into<Captured>>(items: impl IntoIterator<Item = T>) -> Expr {
    Expr::Constant(Captured::List(items.into_iter().map(Into::into).collect()))
}

#[allow(clippy::should_implement_trait)]
impl Expr {
    fn binary(self, op: BinaryOp, other: impl Into<Expr>) -> Self {
        Expr::Binary {
            op,
            left: Box::new(self),
            right: Box::new(other.into()),
        }
    }

    fn method(self, method: Method, args: Vec<Expr>) -> Self {
        Expr::Call {
            method,
            receiver: Some(Box::new(self)),
            args,
        }
    }

    #[must_use]
    pub fn eq(self, other: impl Into<Expr>) -> Self {
        self.binary(BinaryOp::Eq, other)
    }

    #[must_use]
    pub fn ne(self, other: impl Into<Expr>) -> Self {
        self.binary(BinaryOp::Ne, other)
    }

    #[must_use]
    pub fn lt(self, other: impl Into<Expr>) -> Self {
        self.binary(BinaryOp::Lt, other)
    }

    #[must_use]
    pub fn le(self, other: impl Into<Expr>) -> Self {
        self.binary(BinaryOp::Le, other)
    }

    #[must_use]
    pub fn gt(self, other: impl Into<Expr>) -> Self {
        self.binary(BinaryOp::Gt, other)
    }

    #[must_use]
    pub fn ge(self, other: impl Into<Expr>) -> Self {
        self.binary(BinaryOp::Ge, other)
    }

    #[must_use]
    pub fn and(self, other: impl Into<Expr>) -> Self {
        self.binary(BinaryOp::And, other)
    }

    #[must_use]
    pub fn or(self, other: impl Into<Expr>) -> Self {
        self.binary(BinaryOp::Or, other)
    }

    #[must_use]
    pub fn bit_and(self, other: impl Into<Expr>) -> Self {
        self.binary(BinaryOp::BitAnd, other)
    }

    #[must_use]
    pub fn bit_or(self, other: impl Into<Expr>) -> Self {
        self.binary(BinaryOp::BitOr, other)
    }

    #[must_use]
    pub fn add(self, other: impl Into<Expr>) -> Self {
        self.binary(BinaryOp::Add, other)
    }

    #[must_use]
    pub fn subtract(self, other: impl Into<Expr>) -> Self {
        self.binary(BinaryOp::Subtract, other)
    }

    #[must_use]
    pub fn concat(self, other: impl Into<Expr>) -> Self {
        self.binary(BinaryOp::Concat, other)
    }

    /// Build any binary node, including operators that will not compile.
    #[must_use]
    pub fn op(self, op: BinaryOp, other: impl Into<Expr>) -> Self {
        self.binary(op, other)
    }

    #[must_use]
    pub fn not(self) -> Self {
        Expr::Not(Box::new(self))
    }

    /// Compare against `null`; compiles to `is ?`.
    #[must_use]
    pub fn is_null(self) -> Self {
        self.eq(SqlValue::Null)
    }

    #[must_use]
    pub fn is_not_null(self) -> Self {
        self.ne(SqlValue::Null)
    }

    /// `like` with a pattern expression.
    #[must_use]
    pub fn like(self, pattern: impl Into<Expr>) -> Self {
        Expr::Call {
            method: Method::Like,
            receiver: None,
            args: vec![self, pattern.into()],
        }
    }

    /// Substring test on text, or membership when `self` is a captured list.
    #[must_use]
    pub fn contains(self, item: impl Into<Expr>) -> Self {
        self.method(Method::Contains, vec![item.into()])
    }

    /// Membership of `self` in `collection`.
    #[must_use]
    pub fn is_in(self, collection: impl Into<Expr>) -> Self {
        Expr::Call {
            method: Method::Contains,
            receiver: None,
            args: vec![collection.into(), self],
        }
    }

    #[must_use]
    pub fn starts_with(self, prefix: impl Into<Expr>) -> Self {
        self.starts_with_cmp(prefix, StringComparison::default())
    }

    #[must_use]
    pub fn starts_with_cmp(self, prefix: impl Into<Expr>, cmp: StringComparison) -> Self {
        self.method(Method::StartsWith(cmp), vec![prefix.into()])
    }

    #[must_use]
    pub fn ends_with(self, suffix: impl Into<Expr>) -> Self {
        self.ends_with_cmp(suffix, StringComparison::default())
    }

    #[must_use]
    pub fn ends_with_cmp(self, suffix: impl Into<Expr>, cmp: StringComparison) -> Self {
        self.method(Method::EndsWith(cmp), vec![suffix.into()])
    }

    #[must_use]
    pub fn equals(self, other: impl Into<Expr>) -> Self {
        self.method(Method::Equals, vec![other.into()])
    }

    #[must_use]
    pub fn to_lower(self) -> Self {
        self.method(Method::ToLower, Vec::new())
    }

    #[must_use]
    pub fn to_upper(self) -> Self {
        self.method(Method::ToUpper, Vec::new())
    }

    #[must_use]
    pub fn replace(self, from: impl Into<Expr>, to: impl Into<Expr>) -> Self {
        self.method(Method::Replace, vec![from.into(), to.into()])
    }

    /// Call an arbitrary SQL function with `self` as the first argument.
    #[must_use]
    pub fn call(self, name: impl Into<String>, args: Vec<Expr>) -> Self {
        self.method(Method::Other(name.into()), args)
    }

    /// Read a field of a captured value.
    #[must_use]
    pub fn member(self, field: impl Into<String>) -> Self {
        Expr::Member {
            receiver: Box::new(self),
            field: field.into(),
        }
    }

    #[must_use]
    pub fn convert(self, target: SqlType) -> Self {
        Expr::Convert {
            target,
            operand: Box::new(self),
        }
    }
}

impl From<Captured> for Expr {
    fn from(value: Captured) -> Self {
        Expr::Constant(value)
    }
}

macro_rules! expr_constant_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Expr {
                fn from(v: $ty) -> Self {
                    Expr::Constant(Captured::from(v))
                }
            }
        )*
    };
}

expr_constant_from!(SqlValue, i64, i32, f64, bool, &str, String, NaiveDateTime);
