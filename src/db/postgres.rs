//! PostgreSQL backend adapter.
//!
//! Each session owns a pool capped at a single connection, so statements on
//! one handle never interleave across native connections.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use sqlx::{ConnectOptions, Connection, Executor, Row};
use tracing::{debug, info, warn};

use super::backend::{Backend, Session, query_error, schema_error};
use super::types::RowToJson;
use crate::error::{AppError, AppResult};
use crate::models::schema::parse_nullable;
use crate::models::{
    ColumnDescriptor, ConnectionConfig, DatabaseType, KeyRole, QueryResult, SchemaDocument,
};

mod queries {
    pub const LIST_TABLES: &str = r#"
        SELECT table_name::text AS table_name
        FROM information_schema.tables
        WHERE table_schema = 'public'
        AND table_type = 'BASE TABLE'
        ORDER BY table_name
        "#;

    // column_key mirrors MySQL's COLUMN_KEY codes
    pub const LIST_COLUMNS: &str = r#"
        SELECT
            c.column_name::text AS column_name,
            c.data_type::text AS data_type,
            c.is_nullable::text AS is_nullable,
            (
                SELECT CASE
                    WHEN bool_or(tc.constraint_type = 'PRIMARY KEY') THEN 'PRI'
                    WHEN bool_or(tc.constraint_type = 'UNIQUE') THEN 'UNI'
                END
                FROM information_schema.key_column_usage k
                JOIN information_schema.table_constraints tc
                    ON tc.constraint_name = k.constraint_name
                    AND tc.table_schema = k.table_schema
                    AND tc.table_name = k.table_name
                WHERE k.table_schema = c.table_schema
                AND k.table_name = c.table_name
                AND k.column_name = c.column_name
            )::text AS column_key
        FROM information_schema.columns c
        WHERE c.table_schema = 'public'
        AND c.table_name = $1
        ORDER BY c.ordinal_position
        "#;
}

#[derive(Debug, Clone)]
pub struct PostgresBackend {
    connect_timeout: Duration,
}

impl PostgresBackend {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }

    fn connect_options(config: &ConnectionConfig) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.password)
            .database(&config.database)
            .application_name("querymind")
    }
}

#[async_trait]
impl Backend for PostgresBackend {
    fn db_type(&self) -> DatabaseType {
        DatabaseType::PostgreSQL
    }

    async fn connect(&self, config: &ConnectionConfig) -> AppResult<Box<dyn Session>> {
        info!(target_db = %config.target(), "Connecting to PostgreSQL");

        let options = Self::connect_options(config);

        // The pool retries refused connections until its acquire timeout,
        // so liveness is checked on a direct connection first.
        let conn = tokio::time::timeout(self.connect_timeout, options.connect())
            .await
            .map_err(|_| {
                AppError::connection_other(format!(
                    "connect timed out after {}s",
                    self.connect_timeout.as_secs()
                ))
            })?
            .map_err(|e| AppError::connection(&e))?;
        if let Err(e) = conn.close().await {
            warn!(error = %e, "Failed to close PostgreSQL verification connection");
        }

        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(self.connect_timeout)
            .idle_timeout(self.connect_timeout)
            .connect_lazy_with(options);

        // Warm the capped pool now that the server is known to accept us
        match pool.acquire().await {
            Ok(conn) => drop(conn),
            Err(e) => {
                pool.close().await;
                return Err(AppError::connection(&e));
            }
        }

        Ok(Box::new(PostgresSession { pool }))
    }
}

pub struct PostgresSession {
    pool: PgPool,
}

#[async_trait]
impl Session for PostgresSession {
    async fn execute(&self, sql: &str) -> AppResult<QueryResult> {
        let start = Instant::now();
        let rows = (&self.pool).fetch_all(sql).await.map_err(query_error)?;
        let result = QueryResult::new(rows.iter().map(|row| row.to_json_map()).collect());

        debug!(
            row_count = result.row_count,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "PostgreSQL statement finished"
        );
        Ok(result)
    }

    async fn introspect_schema(&self) -> AppResult<SchemaDocument> {
        let table_rows = sqlx::query(queries::LIST_TABLES)
            .fetch_all(&self.pool)
            .await
            .map_err(schema_error)?;

        let mut schema = SchemaDocument::new();
        for table_row in &table_rows {
            let table: String = table_row.try_get("table_name").map_err(schema_error)?;

            let column_rows = sqlx::query(queries::LIST_COLUMNS)
                .bind(&table)
                .fetch_all(&self.pool)
                .await
                .map_err(schema_error)?;

            let columns = column_rows
                .iter()
                .map(|row| {
                    let name: String = row.try_get("column_name")?;
                    let data_type: String = row.try_get("data_type")?;
                    let nullable: String = row.try_get("is_nullable")?;
                    let key: Option<String> = row.try_get("column_key")?;
                    Ok(ColumnDescriptor::new(name, data_type, parse_nullable(&nullable))
                        .with_key_role(key.as_deref().and_then(KeyRole::from_column_key)))
                })
                .collect::<Result<Vec<_>, sqlx::Error>>()
                .map_err(schema_error)?;

            schema.insert(table, columns);
        }

        debug!(table_count = schema.len(), "Introspected PostgreSQL schema");
        Ok(schema)
    }

    async fn close(&self) {
        // PgPool::close is idempotent
        self.pool.close().await;
    }
}
