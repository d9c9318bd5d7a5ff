mod common;

use common::{CREATE_PERSON, Person};
use sqlite_orm_middleware::prelude::*;

fn standalone() -> ConnectionWithLock {
    let conn = rusqlite::Connection::open_in_memory().expect("open in-memory db");
    conn.execute_batch(CREATE_PERSON).expect("create table");
    ConnectionWithLock::standalone(conn)
}

fn count(conn: &LockedConnection<'_>) -> Result<i64, SqliteOrmError> {
    TableQuery::<Person>::new().count(conn)
}

#[test]
fn begin_commit_and_rollback() -> Result<(), SqliteOrmError> {
    let owner = standalone();
    let conn = owner.lock()?;

    conn.begin_transaction()?;
    assert!(conn.is_in_transaction());
    conn.insert(&Person::new("kept", None))?;
    conn.commit()?;
    assert!(!conn.is_in_transaction());

    conn.begin_transaction()?;
    conn.insert(&Person::new("dropped", None))?;
    conn.rollback()?;
    assert!(!conn.is_in_transaction());
    assert_eq!(count(&conn)?, 1);

    // Both are no-ops outside a transaction.
    conn.commit()?;
    conn.rollback()?;
    Ok(())
}

#[test]
fn nested_begin_is_rejected() -> Result<(), SqliteOrmError> {
    let owner = standalone();
    let conn = owner.lock()?;
    conn.begin_transaction()?;
    assert!(matches!(
        conn.begin_transaction(),
        Err(SqliteOrmError::TransactionError(_))
    ));
    assert!(conn.is_in_transaction());
    conn.rollback()?;

    conn.save_transaction_point()?;
    assert!(matches!(
        conn.begin_transaction(),
        Err(SqliteOrmError::TransactionError(_))
    ));
    conn.rollback()?;
    Ok(())
}

#[test]
fn savepoints_nest_and_roll_back_independently() -> Result<(), SqliteOrmError> {
    let owner = standalone();
    let conn = owner.lock()?;

    let outer = conn.save_transaction_point()?;
    assert!(outer.starts_with('S') && outer.ends_with("D0"), "{outer}");
    conn.insert(&Person::new("outer", None))?;

    let inner = conn.save_transaction_point()?;
    assert!(inner.ends_with("D1"), "{inner}");
    conn.insert(&Person::new("inner", None))?;
    conn.rollback_to(&inner)?;
    assert_eq!(count(&conn)?, 1);

    // The inner name is no longer valid once rolled back to.
    assert!(matches!(
        conn.release(&inner),
        Err(SqliteOrmError::TransactionError(_))
    ));

    conn.release(&outer)?;
    assert!(!conn.is_in_transaction());
    assert_eq!(count(&conn)?, 1);
    Ok(())
}

#[test]
fn malformed_savepoint_names_are_rejected() -> Result<(), SqliteOrmError> {
    let owner = standalone();
    let conn = owner.lock()?;
    let sp = conn.save_transaction_point()?;
    for bad in ["", "D0", "X", "S1Dx", "S1D7"] {
        assert!(
            matches!(conn.release(bad), Err(SqliteOrmError::TransactionError(_))),
            "{bad} accepted"
        );
    }
    conn.release(&sp)?;
    Ok(())
}

#[test]
fn run_in_transaction_commits_or_rolls_back_everything() -> Result<(), SqliteOrmError> {
    let owner = standalone();
    let conn = owner.lock()?;

    let inserted = conn.run_in_transaction(|tx| {
        tx.insert(&Person::new("a", Some(1)))?;
        tx.insert(&Person::new("b", Some(2)))?;
        Ok(2)
    })?;
    assert_eq!(inserted, 2);
    assert_eq!(count(&conn)?, 2);

    conn.begin_transaction()?;
    conn.insert(&Person::new("outer", None))?;
    let failed: Result<(), SqliteOrmError> = conn.run_in_transaction(|tx| {
        tx.insert(&Person::new("c", Some(3)))?;
        Err(SqliteOrmError::ExecutionError("boom".into()))
    });
    assert!(matches!(failed, Err(SqliteOrmError::ExecutionError(msg)) if msg == "boom"));

    // The failure unwinds the enclosing transaction too.
    assert!(!conn.is_in_transaction());
    assert_eq!(count(&conn)?, 2);
    Ok(())
}

#[test]
fn transaction_state_belongs_to_the_connection() -> Result<(), SqliteOrmError> {
    let owner = standalone();
    {
        let conn = owner.lock()?;
        conn.begin_transaction()?;
        conn.insert(&Person::new("pending", None))?;
    }
    let conn = owner.lock()?;
    assert!(conn.is_in_transaction());
    conn.commit()?;
    assert_eq!(count(&conn)?, 1);
    Ok(())
}
