use chrono::NaiveDateTime;
use serde_json::Value as JsonValue;

use crate::error::SqliteOrmError;

/// Values that can be bound as query arguments or read back from a row.
///
/// ```rust
/// use sqlite_orm_middleware::prelude::*;
///
/// let args = vec![
///     SqlValue::Int(1),
///     SqlValue::Text("alice".into()),
///     SqlValue::Bool(true),
/// ];
/// # let _ = args;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Text/string value
    Text(String),
    /// Boolean value, stored as 0/1
    Bool(bool),
    /// Timestamp value, stored as `YYYY-MM-DD HH:MM:SS[.fff]` text
    Timestamp(NaiveDateTime),
    /// NULL value
    Null,
    /// JSON value, stored as text
    Json(JsonValue),
    /// Binary data
    Blob(Vec<u8>),
}

impl SqlValue {
    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            SqlValue::Int(value) => Some(*value),
            SqlValue::Bool(value) => Some(i64::from(*value)),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let SqlValue::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SqlValue::Bool(value) => Some(*value),
            SqlValue::Int(1) => Some(true),
            SqlValue::Int(0) => Some(false),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            SqlValue::Float(value) => Some(*value),
            #[allow(clippy::cast_precision_loss)]
            SqlValue::Int(value) => Some(*value as f64),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            SqlValue::Timestamp(value) => Some(*value),
            SqlValue::Text(s) => parse_timestamp(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_blob(&self) -> Option<&[u8]> {
        if let SqlValue::Blob(bytes) = self {
            Some(bytes)
        } else {
            None
        }
    }

    /// Coerce this value into `target`.
    ///
    /// `Null` passes through unchanged regardless of the target.
    ///
    /// # Errors
    /// Returns `SqliteOrmError::ConversionError` when the value has no representation in the
    /// target type (for example non-numeric text to `Integer`).
    pub fn coerce(&self, target: SqlType) -> Result<SqlValue, SqliteOrmError> {
        if self.is_null() {
            return Ok(SqlValue::Null);
        }
        let converted = match (target, self) {
            (SqlType::Integer, SqlValue::Int(_)) => Some(self.clone()),
            (SqlType::Integer, SqlValue::Bool(b)) => Some(SqlValue::Int(i64::from(*b))),
            #[allow(clippy::cast_possible_truncation)]
            (SqlType::Integer, SqlValue::Float(f)) => Some(SqlValue::Int(f.round_ties_even() as i64)),
            (SqlType::Integer, SqlValue::Text(s)) => s.trim().parse().ok().map(SqlValue::Int),
            (SqlType::Real, _) => match self {
                SqlValue::Text(s) => s.trim().parse().ok().map(SqlValue::Float),
                SqlValue::Bool(b) => Some(SqlValue::Float(if *b { 1.0 } else { 0.0 })),
                other => other.as_float().map(SqlValue::Float),
            },
            (SqlType::Bool, SqlValue::Bool(_)) => Some(self.clone()),
            (SqlType::Bool, SqlValue::Int(i)) => Some(SqlValue::Bool(*i != 0)),
            (SqlType::Bool, SqlValue::Float(f)) => Some(SqlValue::Bool(*f != 0.0)),
            (SqlType::Bool, SqlValue::Text(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" => Some(SqlValue::Bool(true)),
                "false" => Some(SqlValue::Bool(false)),
                _ => None,
            },
            (SqlType::Text, SqlValue::Text(_)) => Some(self.clone()),
            (SqlType::Text, SqlValue::Int(i)) => Some(SqlValue::Text(i.to_string())),
            (SqlType::Text, SqlValue::Float(f)) => Some(SqlValue::Text(f.to_string())),
            (SqlType::Text, SqlValue::Bool(b)) => Some(SqlValue::Text(b.to_string())),
            (SqlType::Text, SqlValue::Timestamp(dt)) => {
                Some(SqlValue::Text(dt.format("%F %T%.f").to_string()))
            }
            (SqlType::Text, SqlValue::Json(j)) => Some(SqlValue::Text(j.to_string())),
            (SqlType::Timestamp, _) => self.as_timestamp().map(SqlValue::Timestamp),
            (SqlType::Blob, SqlValue::Blob(_)) => Some(self.clone()),
            (SqlType::Blob, SqlValue::Text(s)) => Some(SqlValue::Blob(s.as_bytes().to_vec())),
            _ => None,
        };
        converted.ok_or_else(|| {
            SqliteOrmError::ConversionError(format!("cannot convert {self:?} to {target:?}"))
        })
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Int(value)
    }
}

impl From<i32> for SqlValue {
    fn from(value: i32) -> Self {
        SqlValue::Int(i64::from(value))
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        SqlValue::Float(value)
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        SqlValue::Bool(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<NaiveDateTime> for SqlValue {
    fn from(value: NaiveDateTime) -> Self {
        SqlValue::Timestamp(value)
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(value: Vec<u8>) -> Self {
        SqlValue::Blob(value)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(SqlValue::Null, Into::into)
    }
}

/// Storage type of a mapped column, also the target of a `Convert` node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlType {
    Integer,
    Real,
    Text,
    Bool,
    Timestamp,
    Blob,
}

fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    // Try "YYYY-MM-DD HH:MM:SS"
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(dt);
    }
    // Try "YYYY-MM-DD HH:MM:SS.SSS"
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coerce_keeps_null_for_every_target() {
        for target in [
            SqlType::Integer,
            SqlType::Real,
            SqlType::Text,
            SqlType::Bool,
            SqlType::Timestamp,
            SqlType::Blob,
        ] {
            assert_eq!(SqlValue::Null.coerce(target).unwrap(), SqlValue::Null);
        }
    }

    #[test]
    fn coerce_numeric_and_bool() {
        assert_eq!(SqlValue::Int(3).coerce(SqlType::Real).unwrap(), SqlValue::Float(3.0));
        assert_eq!(SqlValue::Float(2.5).coerce(SqlType::Integer).unwrap(), SqlValue::Int(2));
        assert_eq!(SqlValue::Int(0).coerce(SqlType::Bool).unwrap(), SqlValue::Bool(false));
        assert_eq!(
            SqlValue::Text(" 42 ".into()).coerce(SqlType::Integer).unwrap(),
            SqlValue::Int(42)
        );
    }

    #[test]
    fn coerce_rejects_unrepresentable_values() {
        let err = SqlValue::Text("abc".into()).coerce(SqlType::Integer).unwrap_err();
        assert!(matches!(err, SqliteOrmError::ConversionError(_)));
    }

    #[test]
    fn timestamps_parse_from_text() {
        let v = SqlValue::Text("2024-01-02 03:04:05.250".into());
        let ts = v.as_timestamp().unwrap();
        assert_eq!(ts.format("%F %T%.3f").to_string(), "2024-01-02 03:04:05.250");
    }
}
