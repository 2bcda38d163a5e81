//! PostgreSQL smoke test.
//!
//! Runs only when TEST_POSTGRES_URL points at a database the test may
//! create and drop tables in.

use std::sync::Arc;

use sql_boxcar::boxcar::Boxcar;
use sql_boxcar::db::{run_script, DatabaseClient, PostgresClient, Value};
use sql_boxcar::llm::MockLlmClient;

async fn get_test_client() -> Option<Arc<PostgresClient>> {
    let url = std::env::var("TEST_POSTGRES_URL").ok()?;
    PostgresClient::connect(&url).await.ok().map(Arc::new)
}

async fn count_open(db: &PostgresClient, table: &str) -> i64 {
    let result = db
        .execute_query(&format!(
            "SELECT COUNT(*) FROM {table} WHERE status = 'open'"
        ))
        .await
        .unwrap();
    match result.rows[0][0] {
        Value::Int(n) => n,
        ref other => panic!("expected an integer, got {other:?}"),
    }
}

#[tokio::test]
async fn test_postgres_commit_and_rollback() {
    let Some(db) = get_test_client().await else {
        eprintln!("Skipping test: TEST_POSTGRES_URL not set");
        return;
    };

    let table = format!("boxcar_tickets_{}", std::process::id());
    run_script(
        db.as_ref(),
        &format!(
            "DROP TABLE IF EXISTS {table};
             CREATE TABLE {table} (id SERIAL PRIMARY KEY, title TEXT NOT NULL, status TEXT NOT NULL DEFAULT 'open');
             INSERT INTO {table} (title) VALUES ('First ticket'), ('Second ticket'), ('Third ticket');"
        ),
    )
    .await
    .unwrap();

    let llm = MockLlmClient::new()
        .with_response(
            "close",
            format!("UPDATE {table} SET status = 'closed' WHERE id = 1"),
        )
        .with_response(
            "break",
            format!("UPDATE {table} SET status = 'closed'; SELECT * FROM pg_catalog.pg_user"),
        )
        .with_response(
            "xml",
            "SELECT query_to_xml('SELECT usename FROM pg_catalog.pg_user', true, false, '')",
        );
    let boxcar = Boxcar::builder()
        .requested_entities([table.clone()])
        .build(db.clone(), Arc::new(llm))
        .unwrap();

    let err = boxcar.run("break everything").await.unwrap_err();
    assert!(err.is_access_violation());
    assert_eq!(count_open(&db, &table).await, 3);

    let err = boxcar.run("users as xml").await.unwrap_err();
    assert!(err.is_access_violation());
    assert!(err.to_string().contains("query_to_xml"));

    let output = boxcar.run("close the first ticket").await.unwrap();
    assert_eq!(output.as_int(), Some(1));
    assert_eq!(count_open(&db, &table).await, 2);

    run_script(db.as_ref(), &format!("DROP TABLE {table}"))
        .await
        .unwrap();
    db.close().await.unwrap();
}
