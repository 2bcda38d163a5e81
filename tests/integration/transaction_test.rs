//! Atomicity of generated actions against a real SQLite database.

use pretty_assertions::assert_eq;

use sql_boxcar::boxcar::Boxcar;
use sql_boxcar::error::BoxcarError;
use sql_boxcar::llm::MockLlmClient;

use super::common::{boxcar, helpdesk_db, open_tickets, scalar};

fn answering(sql: &str) -> MockLlmClient {
    MockLlmClient::new().with_response("do it", sql)
}

#[tokio::test]
async fn test_access_violation_rolls_back_earlier_statements() {
    let db = helpdesk_db().await;
    let boxcar = boxcar(
        Boxcar::builder().requested_entities(["tickets"]),
        &db,
        &answering("UPDATE tickets SET status = 'closed'; SELECT COUNT(*) FROM comments"),
    );

    let err = boxcar.run("do it").await.unwrap_err();

    assert!(err.is_access_violation());
    assert!(err.to_string().contains("statement 2"));
    assert_eq!(open_tickets(&db).await, 3);
}

#[tokio::test]
async fn test_database_error_rolls_back_earlier_statements() {
    let db = helpdesk_db().await;
    let boxcar = boxcar(
        Boxcar::builder(),
        &db,
        &answering(
            "UPDATE tickets SET status = 'closed';\n\
             INSERT INTO tickets (id, title) VALUES (1, 'Duplicate ticket');",
        ),
    );

    let err = boxcar.run("do it").await.unwrap_err();

    assert!(matches!(err, BoxcarError::Execution(_)));
    assert!(err.to_string().contains("statement 2"));
    assert_eq!(open_tickets(&db).await, 3);
    assert_eq!(scalar(&db, "SELECT COUNT(*) FROM tickets").await, 3);
}

#[tokio::test]
async fn test_failing_first_statement_runs_nothing_else() {
    let db = helpdesk_db().await;
    let boxcar = boxcar(
        Boxcar::builder(),
        &db,
        &answering("UPDATE missing_table SET x = 1; DELETE FROM comments"),
    );

    let err = boxcar.run("do it").await.unwrap_err();

    assert!(err.is_access_violation());
    assert_eq!(scalar(&db, "SELECT COUNT(*) FROM comments").await, 4);
}

#[tokio::test]
async fn test_ddl_is_rejected() {
    let db = helpdesk_db().await;
    let boxcar = boxcar(Boxcar::builder(), &db, &answering("DROP TABLE comments"));

    let err = boxcar.run("do it").await.unwrap_err();

    assert!(err.is_access_violation());
    assert_eq!(scalar(&db, "SELECT COUNT(*) FROM comments").await, 4);
}

#[tokio::test]
async fn test_successful_mutations_commit_together() {
    let db = helpdesk_db().await;
    let boxcar = boxcar(
        Boxcar::builder(),
        &db,
        &answering(
            "DELETE FROM comments WHERE ticket_id = 3; \
             UPDATE tickets SET status = 'closed' WHERE id = 3",
        ),
    );

    let output = boxcar.run("do it").await.unwrap();

    assert_eq!(output.to_json(), serde_json::json!([2, 1]));
    assert_eq!(scalar(&db, "SELECT COUNT(*) FROM comments").await, 2);
    assert_eq!(open_tickets(&db).await, 2);
}

#[tokio::test]
async fn test_unparseable_code_touches_nothing() {
    let db = helpdesk_db().await;
    let boxcar = boxcar(
        Boxcar::builder(),
        &db,
        &answering("Sorry, I cannot help with that."),
    );

    let err = boxcar.run("do it").await.unwrap_err();

    assert!(matches!(err, BoxcarError::Execution(_)));
    assert!(err.to_string().contains("SQL parse error"));
}

#[tokio::test]
async fn test_boxcar_recovers_after_rollback() {
    let db = helpdesk_db().await;
    let llm = MockLlmClient::new().with_response(
        "break",
        "UPDATE tickets SET status = 'closed'; SELECT * FROM nowhere",
    );
    let boxcar = boxcar(Boxcar::builder(), &db, &llm);

    assert!(boxcar.run("break it").await.is_err());
    assert_eq!(
        boxcar.run("update all open tickets to closed").await.unwrap().as_int(),
        Some(3)
    );
}
