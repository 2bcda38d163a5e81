//! Mock database client for testing.
//!
//! Records every transaction event so tests can assert exactly when
//! transactions were opened, committed or rolled back.

use super::{
    Column, ColumnInfo, DatabaseBackend, DatabaseClient, ForeignKey, QueryResult, Schema, Table,
    Transaction, Value,
};
use crate::error::{BoxcarError, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// A transaction lifecycle event recorded by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionEvent {
    Begin,
    Execute(String),
    Commit,
    Rollback,
}

/// Returns the schema of the sample helpdesk application
/// (users, tickets, comments).
pub fn helpdesk_schema() -> Schema {
    Schema {
        tables: vec![
            Table::new("comments")
                .with_column(Column::new("id", "INTEGER"))
                .with_column(Column::new("content", "TEXT"))
                .with_column(Column::new("user_id", "INTEGER"))
                .with_column(Column::new("ticket_id", "INTEGER"))
                .with_primary_key(&["id"]),
            Table::new("tickets")
                .with_column(Column::new("id", "INTEGER"))
                .with_column(Column::new("title", "TEXT").nullable(false))
                .with_column(Column::new("user_id", "INTEGER"))
                .with_column(Column::new("status", "TEXT").with_default("'open'"))
                .with_column(Column::new("body", "TEXT"))
                .with_primary_key(&["id"]),
            Table::new("users")
                .with_column(Column::new("id", "INTEGER"))
                .with_column(Column::new("name", "TEXT"))
                .with_primary_key(&["id"]),
        ],
        foreign_keys: vec![
            ForeignKey::new(
                "comments",
                vec!["ticket_id".to_string()],
                "tickets",
                vec!["id".to_string()],
            ),
            ForeignKey::new(
                "comments",
                vec!["user_id".to_string()],
                "users",
                vec!["id".to_string()],
            ),
            ForeignKey::new(
                "tickets",
                vec!["user_id".to_string()],
                "users",
                vec!["id".to_string()],
            ),
        ],
    }
}

#[derive(Debug, Default)]
struct MockState {
    events: Vec<TransactionEvent>,
    executed: Vec<String>,
}

fn lock(state: &Mutex<MockState>) -> MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A mock database client that returns predefined results.
#[derive(Debug, Clone)]
pub struct MockDatabaseClient {
    schema: Schema,
    backend: DatabaseBackend,
    responses: Vec<(String, QueryResult)>,
    fail_on: Option<String>,
    state: Arc<Mutex<MockState>>,
}

impl MockDatabaseClient {
    /// Creates a new mock database client with an empty schema.
    pub fn new() -> Self {
        Self {
            schema: Schema::default(),
            backend: DatabaseBackend::Sqlite,
            responses: Vec::new(),
            fail_on: None,
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// Creates a new mock database client with the given schema.
    pub fn with_schema(schema: Schema) -> Self {
        Self {
            schema,
            ..Self::new()
        }
    }

    /// Creates a mock holding the helpdesk schema.
    pub fn helpdesk() -> Self {
        Self::with_schema(helpdesk_schema())
    }

    /// Returns `result` for any statement containing `pattern`.
    pub fn with_result(mut self, pattern: impl Into<String>, result: QueryResult) -> Self {
        self.responses.push((pattern.into(), result));
        self
    }

    /// Fails any statement containing `pattern` with an execution error.
    pub fn failing_on(mut self, pattern: impl Into<String>) -> Self {
        self.fail_on = Some(pattern.into());
        self
    }

    /// Returns the transaction events recorded so far.
    pub fn events(&self) -> Vec<TransactionEvent> {
        lock(&self.state).events.clone()
    }

    /// Returns every statement executed, inside or outside a transaction.
    pub fn executed(&self) -> Vec<String> {
        lock(&self.state).executed.clone()
    }

    /// Returns how many transactions were opened.
    pub fn transactions_opened(&self) -> usize {
        lock(&self.state)
            .events
            .iter()
            .filter(|event| **event == TransactionEvent::Begin)
            .count()
    }

    fn respond(&self, sql: &str, returns_rows: bool) -> Result<QueryResult> {
        lock(&self.state).executed.push(sql.to_string());

        if let Some(pattern) = &self.fail_on {
            if sql.contains(pattern.as_str()) {
                return Err(BoxcarError::execution(format!(
                    "mock failure while running: {sql}"
                )));
            }
        }

        if let Some((_, result)) = self
            .responses
            .iter()
            .find(|(pattern, _)| sql.contains(pattern.as_str()))
        {
            return Ok(result.clone());
        }

        let result = if returns_rows {
            QueryResult::with_data(
                vec![ColumnInfo::new("result", "text")],
                vec![vec![Value::String(format!("Mock result for: {}", sql))]],
            )
        } else {
            QueryResult::affected(0)
        };

        Ok(result.with_execution_time(Duration::from_millis(1)))
    }
}

impl Default for MockDatabaseClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DatabaseClient for MockDatabaseClient {
    fn backend(&self) -> DatabaseBackend {
        self.backend
    }

    async fn introspect_schema(&self) -> Result<Schema> {
        Ok(self.schema.clone())
    }

    async fn execute_query(&self, sql: &str) -> Result<QueryResult> {
        let returns_rows = sql.trim_start().to_uppercase().starts_with("SELECT");
        self.respond(sql, returns_rows)
    }

    async fn begin(&self) -> Result<Box<dyn Transaction>> {
        lock(&self.state).events.push(TransactionEvent::Begin);
        Ok(Box::new(MockTransaction {
            client: self.clone(),
            finished: false,
        }))
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Transaction handed out by [`MockDatabaseClient`].
struct MockTransaction {
    client: MockDatabaseClient,
    finished: bool,
}

impl MockTransaction {
    fn finish(&mut self, event: TransactionEvent) -> Result<()> {
        if self.finished {
            return Err(BoxcarError::internal("transaction already finished"));
        }
        self.finished = true;
        lock(&self.client.state).events.push(event);
        Ok(())
    }
}

#[async_trait]
impl Transaction for MockTransaction {
    async fn execute(&mut self, sql: &str, returns_rows: bool) -> Result<QueryResult> {
        if self.finished {
            return Err(BoxcarError::internal("transaction already finished"));
        }
        lock(&self.client.state)
            .events
            .push(TransactionEvent::Execute(sql.to_string()));
        self.client.respond(sql, returns_rows)
    }

    async fn commit(&mut self) -> Result<()> {
        self.finish(TransactionEvent::Commit)
    }

    async fn rollback(&mut self) -> Result<()> {
        self.finish(TransactionEvent::Rollback)
    }
}

impl Drop for MockTransaction {
    fn drop(&mut self) {
        if !self.finished {
            lock(&self.client.state)
                .events
                .push(TransactionEvent::Rollback);
        }
    }
}
