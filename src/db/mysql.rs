//! MySQL backend adapter.
//!
//! One native connection per session, verified with a ping at connect time.
//! Statements are serialised on a mutex because a MySQL connection cannot run
//! two commands at once.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};
use sqlx::{ConnectOptions, Connection, Executor, Row};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::backend::{Backend, SESSION_CLOSED, Session, query_error, schema_error};
use super::types::RowToJson;
use crate::error::{AppError, AppResult};
use crate::models::schema::parse_nullable;
use crate::models::{
    ColumnDescriptor, ConnectionConfig, DatabaseType, KeyRole, QueryResult, SchemaDocument,
};

mod queries {
    // information_schema columns are VARBINARY on some MySQL 8 builds
    pub const LIST_TABLES: &str = r#"
        SELECT CONVERT(TABLE_NAME USING utf8mb4) AS TABLE_NAME
        FROM information_schema.TABLES
        WHERE TABLE_SCHEMA = DATABASE()
        AND TABLE_TYPE = 'BASE TABLE'
        ORDER BY TABLE_NAME
        "#;

    pub const LIST_COLUMNS: &str = r#"
        SELECT
            CONVERT(COLUMN_NAME USING utf8mb4) AS COLUMN_NAME,
            CONVERT(DATA_TYPE USING utf8mb4) AS DATA_TYPE,
            CONVERT(IS_NULLABLE USING utf8mb4) AS IS_NULLABLE,
            CONVERT(COLUMN_KEY USING utf8mb4) AS COLUMN_KEY
        FROM information_schema.COLUMNS
        WHERE TABLE_SCHEMA = DATABASE()
        AND TABLE_NAME = ?
        ORDER BY ORDINAL_POSITION
        "#;
}

#[derive(Debug, Clone)]
pub struct MySqlBackend {
    connect_timeout: Duration,
}

impl MySqlBackend {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }

    fn connect_options(config: &ConnectionConfig) -> MySqlConnectOptions {
        MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.password)
            .database(&config.database)
            .charset("utf8mb4")
    }
}

#[async_trait]
impl Backend for MySqlBackend {
    fn db_type(&self) -> DatabaseType {
        DatabaseType::MySQL
    }

    async fn connect(&self, config: &ConnectionConfig) -> AppResult<Box<dyn Session>> {
        info!(target_db = %config.target(), "Connecting to MySQL");

        let options = Self::connect_options(config);
        let mut conn = tokio::time::timeout(self.connect_timeout, options.connect())
            .await
            .map_err(|_| {
                AppError::connection_other(format!(
                    "connect timed out after {}s",
                    self.connect_timeout.as_secs()
                ))
            })?
            .map_err(|e| AppError::connection(&e))?;

        // Surface bad credentials or a dead server now, not on the first query
        conn.ping().await.map_err(|e| AppError::connection(&e))?;

        Ok(Box::new(MySqlSession {
            conn: Mutex::new(Some(conn)),
        }))
    }
}

pub struct MySqlSession {
    /// `None` once closed
    conn: Mutex<Option<MySqlConnection>>,
}

#[async_trait]
impl Session for MySqlSession {
    async fn execute(&self, sql: &str) -> AppResult<QueryResult> {
        let start = Instant::now();
        let mut guard = self.conn.lock().await;
        let conn = guard
            .as_mut()
            .ok_or_else(|| AppError::query(SESSION_CLOSED))?;

        let rows = conn.fetch_all(sql).await.map_err(query_error)?;
        let result = QueryResult::new(rows.iter().map(|row| row.to_json_map()).collect());

        debug!(
            row_count = result.row_count,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "MySQL statement finished"
        );
        Ok(result)
    }

    async fn introspect_schema(&self) -> AppResult<SchemaDocument> {
        let mut guard = self.conn.lock().await;
        let conn = guard
            .as_mut()
            .ok_or_else(|| AppError::schema(SESSION_CLOSED))?;

        let table_rows = sqlx::query(queries::LIST_TABLES)
            .fetch_all(&mut *conn)
            .await
            .map_err(schema_error)?;

        let mut schema = SchemaDocument::new();
        for table_row in &table_rows {
            let table: String = table_row.try_get("TABLE_NAME").map_err(schema_error)?;

            let column_rows = sqlx::query(queries::LIST_COLUMNS)
                .bind(&table)
                .fetch_all(&mut *conn)
                .await
                .map_err(schema_error)?;

            let columns = column_rows
                .iter()
                .map(|row| {
                    let name: String = row.try_get("COLUMN_NAME")?;
                    let data_type: String = row.try_get("DATA_TYPE")?;
                    let nullable: String = row.try_get("IS_NULLABLE")?;
                    let key: Option<String> = row.try_get("COLUMN_KEY")?;
                    Ok(ColumnDescriptor::new(name, data_type, parse_nullable(&nullable))
                        .with_key_role(key.as_deref().and_then(KeyRole::from_column_key)))
                })
                .collect::<Result<Vec<_>, sqlx::Error>>()
                .map_err(schema_error)?;

            schema.insert(table, columns);
        }

        debug!(table_count = schema.len(), "Introspected MySQL schema");
        Ok(schema)
    }

    async fn close(&self) {
        let conn = self.conn.lock().await.take();
        if let Some(conn) = conn {
            if let Err(e) = conn.close().await {
                warn!(error = %e, "Error while closing MySQL connection");
            }
        }
    }
}
