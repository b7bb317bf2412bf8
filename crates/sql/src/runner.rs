//! Executing generated SQL.

use crate::table::TabularResult;
use askdb_core::config::DatabaseTarget;
use askdb_core::{AppError, AppResult};
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use std::time::Duration;

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

/// Runs read-only SQL and returns the rows.
#[async_trait::async_trait]
pub trait SqlRunner: Send + Sync {
    /// Dialect named in generation prompts.
    fn dialect(&self) -> &str;

    async fn run_sql(&self, sql: &str) -> AppResult<TabularResult>;
}

/// PostgreSQL runner over a sqlx pool.
///
/// Arbitrary result shapes are read by wrapping the query in
/// `row_to_json`, so every row arrives as one JSON object in column order.
#[derive(Debug, Clone)]
pub struct PostgresRunner {
    pool: PgPool,
}

impl PostgresRunner {
    pub async fn connect(target: &DatabaseTarget, max_connections: u32) -> AppResult<Self> {
        let options = PgConnectOptions::new()
            .host(&target.host)
            .port(target.port)
            .database(&target.name)
            .username(&target.user)
            .password(&target.password);

        let pool = PgPoolOptions::new()
            .max_connections(max_connections.max(1))
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect_with(options)
            .await
            .map_err(|e| {
                AppError::Database(format!(
                    "Failed to connect to PostgreSQL at {}:{}/{}: {}",
                    target.host, target.port, target.name, e
                ))
            })?;

        tracing::info!(
            host = %target.host,
            port = target.port,
            database = %target.name,
            "Connected to PostgreSQL"
        );
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Close every pooled connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait::async_trait]
impl SqlRunner for PostgresRunner {
    fn dialect(&self) -> &str {
        "PostgreSQL"
    }

    async fn run_sql(&self, sql: &str) -> AppResult<TabularResult> {
        let wrapped = wrap_as_json(sql);
        tracing::debug!(sql = %sql, "Running SQL");

        let rows: Vec<String> = sqlx::query_scalar(&wrapped)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::Database(format!("Query failed: {}", e)))?;

        let pairs = rows
            .iter()
            .map(|row| parse_row(row))
            .collect::<AppResult<Vec<_>>>()?;

        let table = TabularResult::from_pairs(pairs);
        tracing::debug!(rows = table.row_count(), "Query returned");
        Ok(table)
    }
}

/// Wrap a statement so each row comes back as JSON text of
/// `[[column, value], ...]` in select-list order.
///
/// `json` (not `jsonb`) keeps repeated column names, and `WITH ORDINALITY`
/// keeps their order. The trailing `;` is dropped and the inner query sits on
/// its own lines so a trailing `--` comment cannot swallow the closing
/// parenthesis.
fn wrap_as_json(sql: &str) -> String {
    let inner = sql.trim().trim_end_matches(';').trim_end();
    format!(
        "SELECT COALESCE((SELECT json_agg(json_build_array(e.key, e.value) ORDER BY e.ord) \
         FROM json_each(row_to_json(t)) WITH ORDINALITY AS e(key, value, ord)), '[]'::json)::text \
         FROM (\n{}\n) AS t",
        inner
    )
}

fn parse_row(row: &str) -> AppResult<Vec<(String, serde_json::Value)>> {
    serde_json::from_str(row)
        .map_err(|e| AppError::Database(format!("Unreadable row from PostgreSQL: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_as_json() {
        let wrapped = wrap_as_json("SELECT COUNT(*) FROM film;\n");
        assert!(wrapped.starts_with("SELECT COALESCE((SELECT json_agg("));
        assert!(wrapped.contains("WITH ORDINALITY"));
        assert!(wrapped.ends_with("FROM (\nSELECT COUNT(*) FROM film\n) AS t"));
    }

    #[test]
    fn test_wrap_keeps_trailing_comment_inside() {
        let wrapped = wrap_as_json("SELECT 1 -- one");
        assert!(wrapped.ends_with("-- one\n) AS t"));
    }

    #[test]
    fn test_parse_row_with_repeated_columns() {
        let row = parse_row(r#"[["name", "Mary"], ["name", "Canada"], ["count", 2]]"#).unwrap();
        let table = TabularResult::from_pairs(vec![row]);

        assert_eq!(table.columns, vec!["name", "name", "count"]);
        assert_eq!(table.cell(0, 0), Some(&serde_json::json!("Mary")));
        assert_eq!(table.cell(0, 1), Some(&serde_json::json!("Canada")));
    }

    #[test]
    fn test_parse_row_rejects_garbage() {
        assert!(matches!(parse_row("{\"a\": 1}"), Err(AppError::Database(_))));
    }
}
