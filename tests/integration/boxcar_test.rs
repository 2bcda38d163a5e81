//! End-to-end runs over the whole helpdesk database.

use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;

use sql_boxcar::boxcar::{Boxcar, RejectAll};
use sql_boxcar::db::Value;
use sql_boxcar::llm::MockLlmClient;
use sql_boxcar::query::{Output, OutputFormat};

use super::common::{boxcar, helpdesk_db, open_tickets, scalar};

#[tokio::test]
async fn test_count_of_tickets() {
    let db = helpdesk_db().await;
    let boxcar = boxcar(Boxcar::builder(), &db, &MockLlmClient::new());

    let output = boxcar.run("count of tickets?").await.unwrap();

    assert_eq!(output, Output::Scalar(Value::Int(3)));
}

#[tokio::test]
async fn test_count_of_comments() {
    let db = helpdesk_db().await;
    let boxcar = boxcar(Boxcar::builder(), &db, &MockLlmClient::new());

    assert_eq!(boxcar.run("count of comments?").await.unwrap().as_int(), Some(4));
    assert_eq!(
        boxcar
            .run("count of comments on the first ticket?")
            .await
            .unwrap()
            .as_int(),
        Some(2)
    );
}

#[tokio::test]
async fn test_text_answer() {
    let db = helpdesk_db().await;
    let boxcar = boxcar(Boxcar::builder(), &db, &MockLlmClient::new());

    let output = boxcar.run("what is the first ticket?").await.unwrap();

    assert_eq!(output, Output::Scalar(Value::String("First ticket".into())));
}

#[tokio::test]
async fn test_rows_answer() {
    let db = helpdesk_db().await;
    let boxcar = boxcar(Boxcar::builder(), &db, &MockLlmClient::new());

    let output = boxcar
        .run("contents of the comments on the third ticket")
        .await
        .unwrap();

    let rows = output.rows().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(
        rows[1].get("content"),
        Some(&Value::String("This is yet another bingo comment".into()))
    );
}

#[tokio::test]
async fn test_update_commits_and_returns_row_count() {
    let db = helpdesk_db().await;
    let boxcar = boxcar(Boxcar::builder(), &db, &MockLlmClient::new());

    let output = boxcar.run("update all open tickets to closed").await.unwrap();

    assert_eq!(output.as_int(), Some(3));
    assert_eq!(open_tickets(&db).await, 0);
    assert_eq!(
        scalar(&db, "SELECT COUNT(*) FROM tickets WHERE status = 'closed'").await,
        3
    );
}

#[tokio::test]
async fn test_multiple_questions() {
    let db = helpdesk_db().await;
    let boxcar = boxcar(Boxcar::builder(), &db, &MockLlmClient::new());

    let output = boxcar.run("count of tickets?; count of comments?").await.unwrap();

    assert_eq!(
        output,
        Output::Multi(vec![
            Output::Scalar(Value::Int(3)),
            Output::Scalar(Value::Int(4)),
        ])
    );
    assert_eq!(OutputFormat::Text.render(&output), "[1] 3\n[2] 4");
    assert_eq!(output.to_json(), json!([3, 4]));
}

#[tokio::test]
async fn test_code_only_leaves_database_untouched() {
    let db = helpdesk_db().await;
    let boxcar = boxcar(Boxcar::builder().code_only(true), &db, &MockLlmClient::new());

    let output = boxcar.run("update all open tickets to closed").await.unwrap();

    match output {
        Output::Code(code) => assert!(code.starts_with("UPDATE tickets")),
        other => panic!("expected code, got {other:?}"),
    }
    assert_eq!(open_tickets(&db).await, 3);
}

#[tokio::test]
async fn test_veto_leaves_database_untouched() {
    let db = helpdesk_db().await;
    let boxcar = boxcar(
        Boxcar::builder().approval(Arc::new(RejectAll)),
        &db,
        &MockLlmClient::new(),
    );

    let output = boxcar.run("update all open tickets to closed").await.unwrap();

    assert!(output.is_nil());
    assert_eq!(OutputFormat::Text.render(&output), "nil");
    assert_eq!(open_tickets(&db).await, 3);
}

#[tokio::test]
async fn test_concurrent_runs_on_one_boxcar() {
    let db = helpdesk_db().await;
    let boxcar = Arc::new(boxcar(Boxcar::builder(), &db, &MockLlmClient::new()));

    let first = {
        let boxcar = Arc::clone(&boxcar);
        tokio::spawn(async move { boxcar.run("count of tickets?").await })
    };
    let second = {
        let boxcar = Arc::clone(&boxcar);
        tokio::spawn(async move { boxcar.run("update all open tickets to closed").await })
    };

    let count = first.await.unwrap().unwrap();
    let updated = second.await.unwrap().unwrap();

    assert_eq!(count.as_int(), Some(3));
    assert_eq!(updated.as_int(), Some(3));
    assert_eq!(open_tickets(&db).await, 0);
}
