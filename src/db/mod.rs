//! Database abstraction layer for sql-boxcar.
//!
//! Provides a trait-based interface for database operations, allowing
//! different database backends to be used interchangeably. Every backend
//! exposes schema introspection and explicit transactions.

mod mock;
mod postgres;
mod schema;
mod sqlite;
mod types;

pub use mock::{helpdesk_schema, MockDatabaseClient, TransactionEvent};
pub use postgres::PostgresClient;
pub use schema::{Column, ForeignKey, Schema, Table};
pub use sqlite::SqliteClient;
pub use types::{ColumnInfo, QueryResult, Row, Value};

use crate::error::{BoxcarError, Result};
use async_trait::async_trait;
use sqlparser::dialect::{Dialect, PostgreSqlDialect, SQLiteDialect};
use sqlparser::parser::Parser;
use tracing::debug;

/// Maximum rows to return from a query.
pub(crate) const MAX_ROWS: usize = 1000;

/// Supported database backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    #[default]
    Sqlite,
    Postgres,
}

impl DatabaseBackend {
    /// Returns the backend as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::Postgres => "postgres",
        }
    }

    /// Determines the backend from a connection URL's scheme.
    pub fn from_url(url: &str) -> Result<Self> {
        let scheme = url
            .split_once(':')
            .map(|(scheme, _)| scheme.to_lowercase())
            .ok_or_else(|| BoxcarError::config(format!("Invalid database URL: {url}")))?;

        match scheme.as_str() {
            "sqlite" => Ok(Self::Sqlite),
            "postgres" | "postgresql" => Ok(Self::Postgres),
            other => Err(BoxcarError::config(format!(
                "Unsupported database scheme '{other}'. Expected 'sqlite' or 'postgres'"
            ))),
        }
    }

    /// Returns the SQL dialect used to parse generated code for this backend.
    pub fn dialect(&self) -> Box<dyn Dialect + Send + Sync> {
        match self {
            Self::Sqlite => Box::new(SQLiteDialect {}),
            Self::Postgres => Box::new(PostgreSqlDialect {}),
        }
    }

    /// Returns the human-readable dialect name used in prompts.
    pub fn dialect_name(&self) -> &'static str {
        match self {
            Self::Sqlite => "SQLite",
            Self::Postgres => "PostgreSQL",
        }
    }
}

impl std::fmt::Display for DatabaseBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Creates a database client for the given connection URL.
///
/// This is the central factory function for database connections.
pub async fn connect(url: &str) -> Result<Box<dyn DatabaseClient>> {
    match DatabaseBackend::from_url(url)? {
        DatabaseBackend::Sqlite => Ok(Box::new(SqliteClient::connect(url).await?)),
        DatabaseBackend::Postgres => Ok(Box::new(PostgresClient::connect(url).await?)),
    }
}

/// Returns a URL safe to print (password removed).
pub fn redact_url(raw: &str) -> String {
    match url::Url::parse(raw) {
        Ok(mut parsed) if parsed.password().is_some() => {
            let _ = parsed.set_password(Some("****"));
            parsed.to_string()
        }
        _ => raw.to_string(),
    }
}

/// Splits a SQL script into statements and executes them one by one,
/// outside of any transaction. Returns the number of statements run.
pub async fn run_script(db: &dyn DatabaseClient, script: &str) -> Result<usize> {
    let dialect = db.backend().dialect();
    let statements = Parser::parse_sql(dialect.as_ref(), script)
        .map_err(|e| BoxcarError::execution(format!("SQL parse error: {e}")))?;

    for statement in &statements {
        let sql = statement.to_string();
        debug!("Running script statement: {}", sql);
        db.execute_query(&sql).await?;
    }

    Ok(statements.len())
}

/// Trait defining the interface for database clients.
///
/// All database operations are async and return Results with BoxcarError.
#[async_trait]
pub trait DatabaseClient: Send + Sync {
    /// Returns the backend this client talks to.
    fn backend(&self) -> DatabaseBackend;

    /// Introspects the database schema, returning table and relationship information.
    async fn introspect_schema(&self) -> Result<Schema>;

    /// Executes a SQL statement outside of any transaction and returns the results.
    async fn execute_query(&self, sql: &str) -> Result<QueryResult>;

    /// Opens a transaction on the default connection.
    async fn begin(&self) -> Result<Box<dyn Transaction>>;

    /// Closes the database connection.
    async fn close(&self) -> Result<()>;
}

/// An open database transaction.
///
/// Implementations must roll back when dropped without an explicit
/// `commit` or `rollback`, so that an abandoned transaction never commits.
#[async_trait]
pub trait Transaction: Send {
    /// Executes one statement inside the transaction.
    ///
    /// When `returns_rows` is false the result carries `rows_affected`
    /// instead of rows.
    async fn execute(&mut self, sql: &str, returns_rows: bool) -> Result<QueryResult>;

    /// Commits the transaction. Any further call fails.
    async fn commit(&mut self) -> Result<()>;

    /// Rolls the transaction back. Any further call fails.
    async fn rollback(&mut self) -> Result<()>;
}
