mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use common::{Person, file_spec, sample_people};
use sqlite_orm_middleware::prelude::*;

fn async_conn(dir: &tempfile::TempDir, name: &str) -> AsyncConnection {
    let spec = file_spec(dir, name);
    AsyncConnection::with_pool(
        Arc::new(ConnectionPool::new(PoolOptions::default())),
        ConnectionSpec::for_async(spec.path()),
    )
}

#[tokio::test(flavor = "multi_thread")]
async fn records_round_trip_through_the_facade() -> Result<(), SqliteOrmError> {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = async_conn(&dir, "facade.db");

    let id = db.insert(Person::new("alice", Some(31))).await?;
    let mut alice: Person = db.get(id).await?;
    assert_eq!(alice.name, "alice");

    alice.email = Some("a@example.com".into());
    assert_eq!(db.update(alice.clone()).await?, 1);
    assert_eq!(db.find::<Person>(id).await?, Some(alice.clone()));

    assert_eq!(db.delete_record(alice).await?, 1);
    assert!(db.find::<Person>(id).await?.is_none());
    assert!(matches!(
        db.get::<Person>(id).await,
        Err(SqliteOrmError::NotFound(_))
    ));
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn table_queries_run_on_the_blocking_pool() -> Result<(), SqliteOrmError> {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = async_conn(&dir, "queries.db");
    assert_eq!(db.insert_all(sample_people()).await?, 5);

    let people = db.table::<Person>();
    assert_eq!(people.count().await?, 5);
    assert_eq!(people.count_where(field("age").ge(30)).await?, 2);

    let youngest = people
        .filter(field("age").is_not_null())?
        .order_by(field("age"))?
        .first()
        .await?;
    assert_eq!(youngest.name, "bob");

    let second = people.order_by(field("id"))?.element_at(1).await?;
    assert_eq!(second.name, "bob");

    let page = people.order_by(field("id"))?.skip(3).take(5).to_list().await?;
    assert_eq!(page.len(), 2);

    assert!(
        people
            .filter(field("name").eq("nobody"))?
            .first_or_default()
            .await?
            .is_none()
    );

    assert_eq!(people.delete(Some(field("age").is_null())).await?, 1);
    assert!(matches!(
        people.take(1).delete(Some(field("age").gt(0))).await,
        Err(SqliteOrmError::Unsupported(_))
    ));
    assert_eq!(people.count().await?, 4);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_transactions_keep_nothing() -> Result<(), SqliteOrmError> {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = async_conn(&dir, "atomic.db");
    let first = db.insert(Person::new("first", None)).await?;

    let batch = sample_people();
    let failed = db
        .run_in_transaction(move |conn| {
            for person in &batch {
                conn.insert(person)?;
            }
            conn.execute_dml(
                "insert into \"Person\" (\"Id\", \"Name\") values (?, ?)",
                &[SqlValue::Int(first), SqlValue::Text("clash".into())],
            )?;
            Ok(())
        })
        .await;
    assert!(matches!(failed, Err(SqliteOrmError::SqliteError(_))));
    assert_eq!(db.table::<Person>().count().await?, 1);

    assert_eq!(db.insert_all(sample_people()).await?, 5);
    assert_eq!(db.table::<Person>().count().await?, 6);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn raw_statements_and_scalars() -> Result<(), SqliteOrmError> {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = async_conn(&dir, "raw.db");

    let changed = db
        .execute(
            "insert into \"Person\" (\"Name\", \"Age\") values (?, ?), (?, ?)",
            vec!["x".into(), SqlValue::Int(1), "y".into(), SqlValue::Null],
        )
        .await?;
    assert_eq!(changed, 2);

    let rs = db
        .query("select \"Name\" from \"Person\" order by \"Id\"", vec![])
        .await?;
    assert_eq!(rs.len(), 2);
    assert_eq!(rs.results[1].get("Name"), Some(&SqlValue::Text("y".into())));

    let max_age = db
        .query_scalar("select max(\"Age\") from \"Person\"", vec![])
        .await?;
    assert_eq!(max_age, SqlValue::Int(1));
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn cancelled_work_never_runs() -> Result<(), SqliteOrmError> {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = async_conn(&dir, "cancel.db");

    let token = CancellationToken::new();
    token.cancel();
    let ran = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&ran);
    let result = db
        .run_cancellable(&token, move |_conn| {
            flag.store(true, Ordering::SeqCst);
            Ok(())
        })
        .await;
    assert!(matches!(result, Err(SqliteOrmError::Cancelled)));
    assert!(!ran.load(Ordering::SeqCst));

    let live = CancellationToken::new();
    let n = db
        .run_cancellable(&live, |conn| TableQuery::<Person>::new().count(conn))
        .await?;
    assert_eq!(n, 0);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_tasks_share_one_database() -> Result<(), SqliteOrmError> {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = async_conn(&dir, "concurrent.db");

    let tasks: Vec<_> = (0..16)
        .map(|i| {
            let db = db.clone();
            tokio::spawn(async move { db.insert(Person::new(&format!("p{i}"), Some(i))).await })
        })
        .collect();
    for task in tasks {
        task.await??;
    }

    assert_eq!(db.table::<Person>().count().await?, 16);
    let entry = db.pool().entry(db.spec()).expect("entry exists");
    assert_eq!(entry.idle_count(), entry.len());
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn panicking_work_still_returns_the_connection() -> Result<(), SqliteOrmError> {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = async_conn(&dir, "panic.db");

    let result = db
        .run(|_conn| -> Result<(), SqliteOrmError> { panic!("work failed halfway") })
        .await;
    assert!(matches!(result, Err(SqliteOrmError::ExecutionError(_))));

    let entry = db.pool().entry(db.spec()).expect("entry exists");
    assert_eq!(entry.len(), 1);
    assert_eq!(entry.idle_count(), 1);

    let one = db.query_scalar("select 1", Vec::new()).await?;
    assert_eq!(one.as_int(), Some(1));
    assert_eq!(entry.len(), 1);
    assert_eq!(entry.idle_count(), 1);
    Ok(())
}
