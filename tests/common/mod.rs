#![allow(dead_code)]

use std::sync::LazyLock;

use sqlite_orm_middleware::prelude::*;

#[derive(Debug, Clone, PartialEq)]
pub struct Person {
    pub id: i64,
    pub name: String,
    pub age: Option<i64>,
    pub email: Option<String>,
}

impl Person {
    pub fn new(name: &str, age: Option<i64>) -> Self {
        Self {
            id: 0,
            name: name.to_string(),
            age,
            email: None,
        }
    }
}

static PERSON: LazyLock<TableMapping> = LazyLock::new(|| {
    TableMapping::new(
        "Person",
        vec![
            ColumnMapping::new("id", SqlType::Integer)
                .column("Id")
                .primary_key()
                .auto_increment(),
            ColumnMapping::new("name", SqlType::Text).column("Name").not_null(),
            ColumnMapping::new("age", SqlType::Integer).column("Age"),
            ColumnMapping::new("email", SqlType::Text).column("Email"),
        ],
    )
});

impl Record for Person {
    fn mapping() -> &'static TableMapping {
        &PERSON
    }

    fn from_row(row: &DbRow) -> Result<Self, SqliteOrmError> {
        let id = row.require("Id")?.as_int().ok_or_else(|| {
            SqliteOrmError::ConversionError("Id is not an integer".into())
        })?;
        let name = row
            .require("Name")?
            .as_text()
            .ok_or_else(|| SqliteOrmError::ConversionError("Name is not text".into()))?
            .to_string();
        Ok(Person {
            id,
            name,
            age: row.require("Age")?.as_int(),
            email: row.require("Email")?.as_text().map(str::to_string),
        })
    }

    fn to_values(&self) -> Vec<SqlValue> {
        vec![
            SqlValue::Int(self.id),
            SqlValue::Text(self.name.clone()),
            self.age.into(),
            self.email.clone().into(),
        ]
    }
}

pub const CREATE_PERSON: &str = "create table if not exists \"Person\" (
    \"Id\" integer primary key autoincrement,
    \"Name\" text not null,
    \"Age\" integer,
    \"Email\" text
)";

/// In-memory database with the `Person` table and a few rows.
pub fn seeded_memory_db() -> rusqlite::Connection {
    let conn = rusqlite::Connection::open_in_memory().expect("open in-memory db");
    conn.execute_batch(CREATE_PERSON).expect("create table");
    for person in sample_people() {
        conn.insert(&person).expect("seed row");
    }
    conn
}

pub fn sample_people() -> Vec<Person> {
    vec![
        Person::new("alice", Some(31)),
        Person::new("bob", Some(17)),
        Person::new("carol", Some(45)),
        Person::new("dave", None),
        Person::new("Eve", Some(22)),
    ]
}

/// A spec for a fresh file database in `dir`, with the `Person` table created.
pub fn file_spec(dir: &tempfile::TempDir, name: &str) -> ConnectionSpec {
    let path = dir.path().join(name).to_string_lossy().into_owned();
    let conn = rusqlite::Connection::open(&path).expect("open file db");
    conn.execute_batch(CREATE_PERSON).expect("create table");
    ConnectionSpec::new(path)
}
