//! Shared fixtures: an in-memory SQLite copy of the helpdesk application.

use std::sync::Arc;

use sql_boxcar::boxcar::{Boxcar, BoxcarBuilder};
use sql_boxcar::db::{run_script, DatabaseClient, SqliteClient, Value};
use sql_boxcar::llm::MockLlmClient;

pub const HELPDESK_SCRIPT: &str = r#"
CREATE TABLE users (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL
);
CREATE TABLE tickets (
    id INTEGER PRIMARY KEY,
    title TEXT NOT NULL,
    user_id INTEGER REFERENCES users(id),
    status TEXT NOT NULL DEFAULT 'open',
    body TEXT
);
CREATE TABLE comments (
    id INTEGER PRIMARY KEY,
    content TEXT,
    user_id INTEGER REFERENCES users(id),
    ticket_id INTEGER REFERENCES tickets(id)
);

INSERT INTO users (id, name) VALUES (1, 'John'), (2, 'Sally');

INSERT INTO tickets (id, title, user_id, body) VALUES
    (1, 'First ticket', 1, 'This is the first ticket'),
    (2, 'Second ticket', 2, NULL),
    (3, 'Third ticket', 2, NULL);

INSERT INTO comments (id, content, user_id, ticket_id) VALUES
    (1, 'This is a comment', 1, 1),
    (2, 'This is johns second comment', 1, 1),
    (3, 'This is another comment', 2, 3),
    (4, 'This is yet another bingo comment', 2, 3);
"#;

/// A fresh, seeded helpdesk database. Every call is a separate database.
pub async fn helpdesk_db() -> Arc<SqliteClient> {
    let client = SqliteClient::connect("sqlite::memory:").await.unwrap();
    run_script(&client, HELPDESK_SCRIPT).await.unwrap();
    Arc::new(client)
}

/// Builds a boxcar over `db` answering through `llm`.
pub fn boxcar(builder: BoxcarBuilder, db: &Arc<SqliteClient>, llm: &MockLlmClient) -> Boxcar {
    builder
        .build(db.clone(), Arc::new(llm.clone()))
        .unwrap()
}

/// Runs a single-value query directly, outside any boxcar.
pub async fn scalar(db: &SqliteClient, sql: &str) -> i64 {
    let result = db.execute_query(sql).await.unwrap();
    match &result.rows[0][0] {
        Value::Int(n) => *n,
        other => panic!("expected an integer from {sql}, got {other:?}"),
    }
}

pub async fn open_tickets(db: &SqliteClient) -> i64 {
    scalar(db, "SELECT COUNT(*) FROM tickets WHERE status = 'open'").await
}
