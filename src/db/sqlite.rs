//! SQLite database client implementation.
//!
//! Provides the `SqliteClient` struct that implements the `DatabaseClient` trait
//! for SQLite databases using sqlx. In-memory databases are pinned to a single
//! connection so the data lives as long as the client.

use crate::db::{
    Column, ColumnInfo, DatabaseBackend, DatabaseClient, ForeignKey, QueryResult, Row, Schema,
    Table, Transaction, Value, MAX_ROWS,
};
use crate::error::{BoxcarError, Result};
use async_trait::async_trait;
use sqlx::sqlite::{Sqlite, SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column as SqlxColumn, Row as SqlxRow, TypeInfo, ValueRef};
use std::str::FromStr;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Statement timeout in seconds.
const QUERY_TIMEOUT_SECS: u64 = 30;

/// SQLite database client.
#[derive(Debug, Clone)]
pub struct SqliteClient {
    pool: SqlitePool,
}

impl SqliteClient {
    /// Connects to the database at `url` (e.g. `sqlite::memory:` or
    /// `sqlite://helpdesk.db`).
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| BoxcarError::config(format!("Invalid SQLite URL: {e}")))?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool_options = SqlitePoolOptions::new().acquire_timeout(Duration::from_secs(10));
        let pool_options = if is_memory_url(url) {
            // Every in-memory connection is a separate database.
            pool_options
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>)
        } else {
            pool_options.max_connections(5)
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| BoxcarError::connection(format!("Cannot open SQLite database: {e}")))?;

        debug!("Opened SQLite database");
        Ok(Self { pool })
    }

    /// Creates a client from an existing connection pool.
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn fetch_tables(&self) -> Result<Vec<Table>> {
        let table_names: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT name
            FROM sqlite_master
            WHERE type IN ('table', 'view') AND name NOT LIKE 'sqlite_%'
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| BoxcarError::execution(format!("Failed to fetch tables: {e}")))?;

        let mut tables = Vec::with_capacity(table_names.len());
        for name in table_names {
            tables.push(self.fetch_table(name).await?);
        }
        Ok(tables)
    }

    async fn fetch_table(&self, name: String) -> Result<Table> {
        let rows: Vec<(String, String, i64, Option<String>, i64)> = sqlx::query_as(
            r#"
            SELECT name, type, "notnull", dflt_value, pk
            FROM pragma_table_info(?1)
            ORDER BY cid
            "#,
        )
        .bind(&name)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| BoxcarError::execution(format!("Failed to fetch columns for {name}: {e}")))?;

        let mut primary_key: Vec<(i64, String)> = rows
            .iter()
            .filter(|(_, _, _, _, pk)| *pk > 0)
            .map(|(column, _, _, _, pk)| (*pk, column.clone()))
            .collect();
        primary_key.sort();

        let columns = rows
            .into_iter()
            .map(|(column, data_type, not_null, default, _)| Column {
                name: column,
                data_type,
                is_nullable: not_null == 0,
                default,
            })
            .collect();

        Ok(Table {
            name,
            columns,
            primary_key: primary_key.into_iter().map(|(_, column)| column).collect(),
        })
    }

    async fn fetch_foreign_keys(&self, tables: &[Table]) -> Result<Vec<ForeignKey>> {
        let mut foreign_keys = Vec::new();

        for table in tables {
            let rows: Vec<(i64, String, String, Option<String>)> = sqlx::query_as(
                r#"
                SELECT id, "table", "from", "to"
                FROM pragma_foreign_key_list(?1)
                ORDER BY id, seq
                "#,
            )
            .bind(&table.name)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                BoxcarError::execution(format!(
                    "Failed to fetch foreign keys for {}: {e}",
                    table.name
                ))
            })?;

            let mut current: Option<(i64, ForeignKey)> = None;
            for (id, to_table, from_column, to_column) in rows {
                // A missing target column means the target's primary key.
                let to_column = to_column.unwrap_or_else(|| {
                    tables
                        .iter()
                        .find(|t| t.name == to_table)
                        .and_then(|t| t.primary_key.first().cloned())
                        .unwrap_or_default()
                });

                match current.as_mut() {
                    Some((current_id, fk)) if *current_id == id => {
                        fk.from_columns.push(from_column);
                        fk.to_columns.push(to_column);
                    }
                    _ => {
                        if let Some((_, fk)) = current.take() {
                            foreign_keys.push(fk);
                        }
                        current = Some((
                            id,
                            ForeignKey::new(
                                table.name.clone(),
                                vec![from_column],
                                to_table,
                                vec![to_column],
                            ),
                        ));
                    }
                }
            }
            if let Some((_, fk)) = current {
                foreign_keys.push(fk);
            }
        }

        Ok(foreign_keys)
    }
}

#[async_trait]
impl DatabaseClient for SqliteClient {
    fn backend(&self) -> DatabaseBackend {
        DatabaseBackend::Sqlite
    }

    async fn introspect_schema(&self) -> Result<Schema> {
        let tables = self.fetch_tables().await?;
        let foreign_keys = self.fetch_foreign_keys(&tables).await?;

        Ok(Schema {
            tables,
            foreign_keys,
        })
    }

    async fn execute_query(&self, sql: &str) -> Result<QueryResult> {
        run_statement(&self.pool, sql, true).await
    }

    async fn begin(&self) -> Result<Box<dyn Transaction>> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| BoxcarError::connection(format!("Failed to begin transaction: {e}")))?;
        Ok(Box::new(SqliteTransaction { tx: Some(tx) }))
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }
}

/// An open SQLite transaction. sqlx rolls it back when dropped unfinished.
struct SqliteTransaction {
    tx: Option<sqlx::Transaction<'static, Sqlite>>,
}

#[async_trait]
impl Transaction for SqliteTransaction {
    async fn execute(&mut self, sql: &str, returns_rows: bool) -> Result<QueryResult> {
        let tx = self
            .tx
            .as_mut()
            .ok_or_else(|| BoxcarError::internal("transaction already finished"))?;
        run_statement(&mut **tx, sql, returns_rows).await
    }

    async fn commit(&mut self) -> Result<()> {
        let tx = self
            .tx
            .take()
            .ok_or_else(|| BoxcarError::internal("transaction already finished"))?;
        tx.commit()
            .await
            .map_err(|e| BoxcarError::execution(format!("Commit failed: {e}")))
    }

    async fn rollback(&mut self) -> Result<()> {
        let tx = self
            .tx
            .take()
            .ok_or_else(|| BoxcarError::internal("transaction already finished"))?;
        tx.rollback()
            .await
            .map_err(|e| BoxcarError::execution(format!("Rollback failed: {e}")))
    }
}

/// Runs one statement on any SQLite executor (pool or open transaction).
async fn run_statement<'e, E>(executor: E, sql: &'e str, returns_rows: bool) -> Result<QueryResult>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let start = Instant::now();
    let timeout = Duration::from_secs(QUERY_TIMEOUT_SECS);
    let timed_out =
        || BoxcarError::execution(format!("Query timed out after {QUERY_TIMEOUT_SECS} seconds"));

    if !returns_rows {
        let done = tokio::time::timeout(timeout, sqlx::query(sql).execute(executor))
            .await
            .map_err(|_| timed_out())?
            .map_err(|e| BoxcarError::execution(format_query_error(e)))?;
        return Ok(QueryResult::affected(done.rows_affected()).with_execution_time(start.elapsed()));
    }

    let result = tokio::time::timeout(timeout, sqlx::query(sql).fetch_all(executor))
        .await
        .map_err(|_| timed_out())?
        .map_err(|e| BoxcarError::execution(format_query_error(e)))?;
    let execution_time = start.elapsed();

    let columns: Vec<ColumnInfo> = result
        .first()
        .map(|row| {
            row.columns()
                .iter()
                .map(|col| ColumnInfo::new(col.name(), col.type_info().name()))
                .collect()
        })
        .unwrap_or_default();

    let total_rows = result.len();
    let was_truncated = total_rows > MAX_ROWS;
    if was_truncated {
        warn!(
            "Query returned {} rows, truncating to {} rows",
            total_rows, MAX_ROWS
        );
    }

    let rows: Vec<Row> = result.iter().take(MAX_ROWS).map(convert_row).collect();
    let row_count = rows.len();

    Ok(QueryResult {
        columns,
        rows,
        execution_time,
        row_count,
        total_rows: Some(total_rows),
        was_truncated,
        rows_affected: None,
    })
}

fn is_memory_url(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

fn convert_row(row: &SqliteRow) -> Row {
    (0..row.columns().len())
        .map(|index| convert_value(row, index))
        .collect()
}

/// Converts one column using the value's storage class (SQLite is dynamically typed).
fn convert_value(row: &SqliteRow, index: usize) -> Value {
    let storage_class = match row.try_get_raw(index) {
        Ok(raw) if raw.is_null() => return Value::Null,
        Ok(raw) => raw.type_info().name().to_uppercase(),
        Err(_) => return Value::Null,
    };

    match storage_class.as_str() {
        "INTEGER" | "INT" | "BIGINT" => row
            .try_get::<Option<i64>, _>(index)
            .ok()
            .flatten()
            .map(Value::Int)
            .unwrap_or(Value::Null),

        "REAL" | "FLOAT" | "DOUBLE" | "NUMERIC" => row
            .try_get::<Option<f64>, _>(index)
            .ok()
            .flatten()
            .map(Value::Float)
            .unwrap_or(Value::Null),

        "BOOLEAN" => row
            .try_get::<Option<bool>, _>(index)
            .ok()
            .flatten()
            .map(Value::Bool)
            .unwrap_or(Value::Null),

        "BLOB" => row
            .try_get::<Option<Vec<u8>>, _>(index)
            .ok()
            .flatten()
            .map(Value::Bytes)
            .unwrap_or(Value::Null),

        _ => row
            .try_get::<Option<String>, _>(index)
            .ok()
            .flatten()
            .map(Value::String)
            .unwrap_or(Value::Null),
    }
}

fn format_query_error(error: sqlx::Error) -> String {
    match error.as_database_error() {
        Some(db_error) => db_error.message().to_string(),
        None => error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_client() -> SqliteClient {
        let client = SqliteClient::connect("sqlite::memory:").await.unwrap();
        for sql in [
            "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL)",
            "CREATE TABLE notes (id INTEGER PRIMARY KEY, user_id INTEGER REFERENCES users(id), body TEXT, score REAL, data BLOB)",
            "INSERT INTO users (name) VALUES ('John'), ('Sally')",
            "INSERT INTO notes (user_id, body, score, data) VALUES (1, 'hello', 1.5, x'0102')",
        ] {
            client.execute_query(sql).await.unwrap();
        }
        client
    }

    #[test]
    fn test_is_memory_url() {
        assert!(is_memory_url("sqlite::memory:"));
        assert!(is_memory_url("sqlite://file:helpdesk?mode=memory"));
        assert!(!is_memory_url("sqlite://helpdesk.db"));
    }

    #[tokio::test]
    async fn test_memory_database_survives_between_queries() {
        let client = memory_client().await;
        let result = client
            .execute_query("SELECT COUNT(*) FROM users")
            .await
            .unwrap();
        assert_eq!(result.rows[0][0], Value::Int(2));
    }

    #[tokio::test]
    async fn test_value_conversion_by_storage_class() {
        let client = memory_client().await;
        let result = client
            .execute_query("SELECT id, body, score, data, NULL AS nothing FROM notes")
            .await
            .unwrap();

        let row = &result.rows[0];
        assert_eq!(row[0], Value::Int(1));
        assert_eq!(row[1], Value::from("hello"));
        assert_eq!(row[2], Value::Float(1.5));
        assert_eq!(row[3], Value::Bytes(vec![1, 2]));
        assert_eq!(row[4], Value::Null);
        assert_eq!(result.columns[1].name, "body");
    }

    #[tokio::test]
    async fn test_introspect_schema() {
        let client = memory_client().await;
        let schema = client.introspect_schema().await.unwrap();

        let names: Vec<_> = schema.tables.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["notes", "users"]);

        let users = schema.table("users").unwrap();
        assert_eq!(users.primary_key, vec!["id"]);
        assert!(!users.columns[1].is_nullable);

        assert_eq!(schema.foreign_keys.len(), 1);
        assert_eq!(schema.foreign_keys[0].from_table, "notes");
        assert_eq!(schema.foreign_keys[0].to_table, "users");
        assert_eq!(schema.foreign_keys[0].to_columns, vec!["id"]);
    }

    #[tokio::test]
    async fn test_transaction_rollback_discards_writes() {
        let client = memory_client().await;

        let mut tx = client.begin().await.unwrap();
        let result = tx
            .execute("UPDATE users SET name = 'Nobody'", false)
            .await
            .unwrap();
        assert_eq!(result.rows_affected, Some(2));
        tx.rollback().await.unwrap();

        let result = client
            .execute_query("SELECT COUNT(*) FROM users WHERE name = 'Nobody'")
            .await
            .unwrap();
        assert_eq!(result.rows[0][0], Value::Int(0));
    }

    #[tokio::test]
    async fn test_dropped_transaction_rolls_back() {
        let client = memory_client().await;
        {
            let mut tx = client.begin().await.unwrap();
            tx.execute("DELETE FROM notes", false).await.unwrap();
        }

        let result = client
            .execute_query("SELECT COUNT(*) FROM notes")
            .await
            .unwrap();
        assert_eq!(result.rows[0][0], Value::Int(1));
    }

    #[tokio::test]
    async fn test_transaction_commit_persists() {
        let client = memory_client().await;

        let mut tx = client.begin().await.unwrap();
        tx.execute("INSERT INTO users (name) VALUES ('Ann')", false)
            .await
            .unwrap();
        tx.commit().await.unwrap();
        assert!(tx.commit().await.is_err());

        let result = client
            .execute_query("SELECT COUNT(*) FROM users")
            .await
            .unwrap();
        assert_eq!(result.rows[0][0], Value::Int(3));
    }

    #[tokio::test]
    async fn test_query_error_is_execution_error() {
        let client = memory_client().await;
        let err = client
            .execute_query("SELECT missing FROM users")
            .await
            .unwrap_err();
        assert!(matches!(err, BoxcarError::Execution(_)));
        assert!(err.to_string().contains("missing"));
    }
}
