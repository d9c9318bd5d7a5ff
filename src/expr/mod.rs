//! Predicate and ordering expressions.
//!
//! An [`Expr`] is an immutable tree describing a condition over one record type. Field
//! references point at the query's own record ([`Expr::Parameter`]); everything else is a
//! value captured from outside the query.
//!
//! ```rust
//! use sqlite_orm_middleware::prelude::*;
//!
//! // age >= 18 and name.starts_with("A")
//! let pred = field("age").ge(18).and(field("name").starts_with("A"));
//! # let _ = pred;
//! ```

mod builder;
mod captured;

pub use builder::{field, list, value};
pub use captured::Captured;

use crate::types::SqlType;

/// Binary operators accepted in predicates.
///
/// `Multiply`, `Divide`, `Modulo` and `Coalesce` can be expressed but do not compile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Gt,
    Ge,
    Lt,
    Le,
    BitAnd,
    And,
    BitOr,
    Or,
    Eq,
    Ne,
    Add,
    Subtract,
    /// String concatenation (`||`)
    Concat,
    Multiply,
    Divide,
    Modulo,
    Coalesce,
}

impl BinaryOp {
    /// SQL spelling, or `None` for operators the compiler rejects.
    #[must_use]
    pub fn sql(self) -> Option<&'static str> {
        match self {
            BinaryOp::Gt => Some(">"),
            BinaryOp::Ge => Some(">="),
            BinaryOp::Lt => Some("<"),
            BinaryOp::Le => Some("<="),
            BinaryOp::BitAnd => Some("&"),
            BinaryOp::And => Some("and"),
            BinaryOp::BitOr => Some("|"),
            BinaryOp::Or => Some("or"),
            BinaryOp::Eq => Some("="),
            BinaryOp::Ne => Some("!="),
            BinaryOp::Add => Some("+"),
            BinaryOp::Subtract => Some("-"),
            BinaryOp::Concat => Some("||"),
            BinaryOp::Multiply | BinaryOp::Divide | BinaryOp::Modulo | BinaryOp::Coalesce => None,
        }
    }
}

/// How `starts_with`/`ends_with` compare text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StringComparison {
    Ordinal,
    OrdinalIgnoreCase,
    #[default]
    CurrentCulture,
    CurrentCultureIgnoreCase,
    InvariantCulture,
    InvariantCultureIgnoreCase,
}

impl StringComparison {
    #[must_use]
    pub fn ignores_case(self) -> bool {
        matches!(
            self,
            StringComparison::OrdinalIgnoreCase
                | StringComparison::CurrentCultureIgnoreCase
                | StringComparison::InvariantCultureIgnoreCase
        )
    }
}

/// Methods callable inside a predicate.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Method {
    Like,
    Contains,
    StartsWith(StringComparison),
    EndsWith(StringComparison),
    Equals,
    ToLower,
    ToUpper,
    Replace,
    /// Any other function; compiled as a lower-cased SQL function call.
    Other(String),
}

/// Predicate/ordering AST node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Not(Box<Expr>),
    Call {
        method: Method,
        receiver: Option<Box<Expr>>,
        args: Vec<Expr>,
    },
    Constant(Captured),
    Convert {
        target: SqlType,
        operand: Box<Expr>,
    },
    Member {
        receiver: Box<Expr>,
        field: String,
    },
    /// The record the query is over.
    Parameter,
}
