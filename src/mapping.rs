//! Table and column metadata for record types.
//!
//! Mappings are declared by hand through [`Record::mapping`]; nothing here inspects types at
//! runtime.

use crate::error::SqliteOrmError;
use crate::results::DbRow;
use crate::types::{SqlType, SqlValue};

/// One mapped column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMapping {
    /// Field name on the record type, as used in predicates.
    pub property: String,
    /// Column name in the table.
    pub name: String,
    pub sql_type: SqlType,
    pub nullable: bool,
    pub primary_key: bool,
    pub auto_increment: bool,
}

impl ColumnMapping {
    /// A nullable, non-key column whose name equals the property name.
    #[must_use]
    pub fn new(property: impl Into<String>, sql_type: SqlType) -> Self {
        let property = property.into();
        Self {
            name: property.clone(),
            property,
            sql_type,
            nullable: true,
            primary_key: false,
            auto_increment: false,
        }
    }

    /// Store this property under a different column name.
    #[must_use]
    pub fn column(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Mark as primary key; implies `not_null`.
    #[must_use]
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    #[must_use]
    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }
}

/// Table metadata for one record type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableMapping {
    pub table_name: String,
    pub columns: Vec<ColumnMapping>,
}

impl TableMapping {
    #[must_use]
    pub fn new(table_name: impl Into<String>, columns: Vec<ColumnMapping>) -> Self {
        Self {
            table_name: table_name.into(),
            columns,
        }
    }

    /// Look up the column backing a record field.
    #[must_use]
    pub fn find_column_with_property_name(&self, property: &str) -> Option<&ColumnMapping> {
        self.columns.iter().find(|c| c.property == property)
    }

    #[must_use]
    pub fn find_column(&self, name: &str) -> Option<&ColumnMapping> {
        self.columns.iter().find(|c| c.name == name)
    }

    #[must_use]
    pub fn primary_key(&self) -> Option<&ColumnMapping> {
        self.columns.iter().find(|c| c.primary_key)
    }

    /// Columns written by an insert (everything except an auto-increment key).
    pub fn insert_columns(&self) -> impl Iterator<Item = (usize, &ColumnMapping)> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, c)| !(c.primary_key && c.auto_increment))
    }

    /// `"Col1", "Col2"` in declaration order.
    #[must_use]
    pub fn select_list(&self) -> String {
        self.columns
            .iter()
            .map(|c| quote_ident(&c.name))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// A record type stored in one table.
///
/// ```rust
/// use std::sync::LazyLock;
/// use sqlite_orm_middleware::prelude::*;
///
/// struct Tag {
///     id: i64,
///     label: String,
/// }
///
/// static TAG: LazyLock<TableMapping> = LazyLock::new(|| {
///     TableMapping::new(
///         "Tag",
///         vec![
///             ColumnMapping::new("id", SqlType::Integer).column("Id").primary_key().auto_increment(),
///             ColumnMapping::new("label", SqlType::Text).column("Label").not_null(),
///         ],
///     )
/// });
///
/// impl Record for Tag {
///     fn mapping() -> &'static TableMapping {
///         &TAG
///     }
///     fn from_row(row: &DbRow) -> Result<Self, SqliteOrmError> {
///         Ok(Tag {
///             id: row.require("Id")?.as_int().unwrap_or_default(),
///             label: row.require("Label")?.as_text().unwrap_or_default().to_string(),
///         })
///     }
///     fn to_values(&self) -> Vec<SqlValue> {
///         vec![SqlValue::Int(self.id), SqlValue::Text(self.label.clone())]
///     }
/// }
/// ```
pub trait Record: Sized {
    fn mapping() -> &'static TableMapping;

    /// Build a record from a selected row.
    ///
    /// # Errors
    /// Returns `SqliteOrmError::ConversionError` when a column is missing or has the wrong type.
    fn from_row(row: &DbRow) -> Result<Self, SqliteOrmError>;

    /// Values in the same order as `mapping().columns`.
    fn to_values(&self) -> Vec<SqlValue>;
}

pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping() -> TableMapping {
        TableMapping::new(
            "Person",
            vec![
                ColumnMapping::new("id", SqlType::Integer)
                    .column("Id")
                    .primary_key()
                    .auto_increment(),
                ColumnMapping::new("name", SqlType::Text).column("Name").not_null(),
                ColumnMapping::new("age", SqlType::Integer).column("Age"),
            ],
        )
    }

    #[test]
    fn lookups_by_property_and_key() {
        let m = mapping();
        assert_eq!(m.find_column_with_property_name("name").unwrap().name, "Name");
        assert!(m.find_column_with_property_name("Name").is_none());
        assert_eq!(m.primary_key().unwrap().name, "Id");
        assert_eq!(m.insert_columns().count(), 2);
    }

    #[test]
    fn select_list_quotes_columns_in_order() {
        assert_eq!(mapping().select_list(), "\"Id\", \"Name\", \"Age\"");
    }
}
