//! Boxcars restricted to part of the helpdesk.

use pretty_assertions::assert_eq;

use sql_boxcar::boxcar::Boxcar;
use sql_boxcar::error::BoxcarError;
use sql_boxcar::llm::MockLlmClient;
use sql_boxcar::policy::DenyList;

use super::common::{boxcar, helpdesk_db, scalar};

#[tokio::test]
async fn test_requested_entity_is_usable() {
    let db = helpdesk_db().await;
    let boxcar = boxcar(
        Boxcar::builder().requested_entities(["tickets"]),
        &db,
        &MockLlmClient::new(),
    );

    assert_eq!(boxcar.run("count of tickets?").await.unwrap().as_int(), Some(3));
}

#[tokio::test]
async fn test_unrequested_entity_is_access_violation() {
    let db = helpdesk_db().await;
    let boxcar = boxcar(
        Boxcar::builder().requested_entities(["tickets"]),
        &db,
        &MockLlmClient::new(),
    );

    let err = boxcar.run("count of comments?").await.unwrap_err();

    assert!(err.is_access_violation());
    assert!(err.to_string().contains("comments"));
}

#[tokio::test]
async fn test_excepted_entity_is_access_violation() {
    let db = helpdesk_db().await;
    let boxcar = boxcar(
        Boxcar::builder().except_entities(["comments"]),
        &db,
        &MockLlmClient::new(),
    );

    assert_eq!(boxcar.run("count of users").await.unwrap().as_int(), Some(2));
    assert!(boxcar
        .run("count of comments?")
        .await
        .unwrap_err()
        .is_access_violation());
}

#[tokio::test]
async fn test_system_deny_list_beats_request() {
    let db = helpdesk_db().await;
    let boxcar = boxcar(
        Boxcar::builder()
            .requested_entities(["tickets", "users"])
            .system_deny_list(DenyList::new(["USERS"])),
        &db,
        &MockLlmClient::new(),
    );

    assert_eq!(
        boxcar.visible_entities().await.unwrap().names(),
        ["tickets".to_string()]
    );
    assert!(boxcar
        .run("count of users")
        .await
        .unwrap_err()
        .is_access_violation());
}

#[tokio::test]
async fn test_prompt_only_describes_visible_entities() {
    let db = helpdesk_db().await;
    let llm = MockLlmClient::new();
    let boxcar = boxcar(
        Boxcar::builder().requested_entities(["tickets", "users"]),
        &db,
        &llm,
    );

    boxcar.run("count of tickets?").await.unwrap();

    let system = &llm.requests()[0][0].content;
    assert!(system.contains("I need a Data using tickets, users."));
    assert!(system.contains("Table: tickets"));
    assert!(!system.contains("Table: comments"));
    assert!(!system.contains("comments.ticket_id"));
}

#[tokio::test]
async fn test_unknown_requested_entity() {
    let db = helpdesk_db().await;
    let llm = MockLlmClient::new();
    let boxcar = boxcar(
        Boxcar::builder().requested_entities(["tickets", "invoices"]),
        &db,
        &llm,
    );

    let err = boxcar.run("count of tickets?").await.unwrap_err();

    assert!(matches!(err, BoxcarError::Config(_)));
    assert!(err.to_string().contains("invoices"));
    assert_eq!(llm.call_count(), 0);
}

#[tokio::test]
async fn test_catalog_tables_hidden_from_generated_code() {
    let db = helpdesk_db().await;
    let llm = MockLlmClient::new().with_response("schema", "SELECT COUNT(*) FROM sqlite_master");
    let boxcar = boxcar(Boxcar::builder(), &db, &llm);

    let err = boxcar.run("how big is the schema?").await.unwrap_err();

    assert!(err.is_access_violation());
    assert_eq!(scalar(&db, "SELECT COUNT(*) FROM tickets").await, 3);
}

#[tokio::test]
async fn test_schema_qualified_hidden_entity() {
    let db = helpdesk_db().await;
    let llm = MockLlmClient::new().with_response("names", "SELECT name FROM main.users");
    let boxcar = boxcar(
        Boxcar::builder().requested_entities(["tickets"]),
        &db,
        &llm,
    );

    let err = boxcar.run("user names").await.unwrap_err();

    assert!(err.is_access_violation());
}

#[tokio::test]
async fn test_hidden_entity_behind_function_call() {
    let db = helpdesk_db().await;
    let llm = MockLlmClient::new().with_response(
        "as xml",
        "SELECT query_to_xml('SELECT * FROM comments', true, false, '')",
    );
    let boxcar = boxcar(
        Boxcar::builder().requested_entities(["tickets"]),
        &db,
        &llm,
    );

    let err = boxcar.run("comments as xml").await.unwrap_err();

    assert!(err.is_access_violation());
    assert!(err.to_string().contains("query_to_xml"));
}

#[tokio::test]
async fn test_extension_loading_is_rejected() {
    let db = helpdesk_db().await;
    let llm = MockLlmClient::new().with_response("extension", "SELECT load_extension('x.so')");
    let boxcar = boxcar(Boxcar::builder(), &db, &llm);

    let err = boxcar.run("load the extension").await.unwrap_err();

    assert!(err.is_access_violation());
}
