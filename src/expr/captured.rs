use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::error::SqliteOrmError;
use crate::types::SqlValue;

/// A value captured from outside the query, read by field name during compilation.
///
/// Structs are captured through `serde` (see [`Captured::from_serialize`]), which gives
/// member access on outer variables without runtime reflection.
#[derive(Debug, Clone, PartialEq)]
pub enum Captured {
    Scalar(SqlValue),
    List(Vec<Captured>),
    Object(BTreeMap<String, Captured>),
}

impl Captured {
    /// Capture any serializable value.
    ///
    /// # Errors
    /// Returns `SqliteOrmError::ConversionError` if `serde_json` cannot represent the value.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Self, SqliteOrmError> {
        let json = serde_json::to_value(value)
            .map_err(|e| SqliteOrmError::ConversionError(format!("cannot capture value: {e}")))?;
        Ok(Self::from_json(json))
    }

    #[must_use]
    pub fn from_json(value: JsonValue) -> Self {
        match value {
            JsonValue::Null => Captured::Scalar(SqlValue::Null),
            JsonValue::Bool(b) => Captured::Scalar(SqlValue::Bool(b)),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => Captured::Scalar(SqlValue::Int(i)),
                None => Captured::Scalar(n.as_f64().map_or(SqlValue::Null, SqlValue::Float)),
            },
            JsonValue::String(s) => Captured::Scalar(SqlValue::Text(s)),
            JsonValue::Array(items) => {
                Captured::List(items.into_iter().map(Self::from_json).collect())
            }
            JsonValue::Object(fields) => Captured::Object(
                fields
                    .into_iter()
                    .map(|(k, v)| (k, Self::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Read a named field of an object.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Captured> {
        match self {
            Captured::Object(fields) => fields.get(name),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_scalar(&self) -> Option<&SqlValue> {
        match self {
            Captured::Scalar(v) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Captured::Scalar(SqlValue::Null))
    }
}

impl From<SqlValue> for Captured {
    fn from(value: SqlValue) -> Self {
        Captured::Scalar(value)
    }
}

macro_rules! captured_scalar_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Captured {
                fn from(value: $ty) -> Self {
                    Captured::Scalar(SqlValue::from(value))
                }
            }
        )*
    };
}

captured_scalar_from!(i64, i32, f64, bool, &str, String, NaiveDateTime);

impl<T: Into<Captured>> From<Vec<T>> for Captured {
    fn from(items: Vec<T>) -> Self {
        Captured::List(items.into_iter().map(Into::into).collect())
    }
}
