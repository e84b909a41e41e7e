//! Backend capability traits and the factory keyed on database type.
//!
//! Each supported database technology implements [`Backend`] (how to open a
//! verified session) and [`Session`] (what can be done with one). Call sites
//! never branch on the database type; they ask [`Backends`] for the adapter.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{AppError, AppResult};
use crate::models::{ConnectionConfig, DatabaseType, QueryResult, SchemaDocument};

use super::{mysql::MySqlBackend, postgres::PostgresBackend, sqlite::SqliteBackend};

/// Opens sessions for one database technology.
#[async_trait]
pub trait Backend: Send + Sync {
    fn db_type(&self) -> DatabaseType;

    /// Open a session and verify it is live before returning.
    async fn connect(&self, config: &ConnectionConfig) -> AppResult<Box<dyn Session>>;
}

/// A live, verified session against one database.
#[async_trait]
pub trait Session: Send + Sync {
    /// Run one SQL text and return every produced row.
    async fn execute(&self, sql: &str) -> AppResult<QueryResult>;

    /// Enumerate base tables and their columns. All or nothing.
    async fn introspect_schema(&self) -> AppResult<SchemaDocument>;

    /// Release the native session. Safe to call more than once.
    async fn close(&self);
}

/// Adapter lookup keyed on [`DatabaseType`].
#[derive(Clone, Default)]
pub struct Backends {
    adapters: HashMap<DatabaseType, Arc<dyn Backend>>,
}

impl Backends {
    /// An empty factory; every type is unsupported until registered.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The production adapters: MySQL, PostgreSQL and the disabled SQLite backend.
    pub fn native(connect_timeout: Duration) -> Self {
        Self::empty()
            .with(MySqlBackend::new(connect_timeout))
            .with(PostgresBackend::new(connect_timeout))
            .with(SqliteBackend)
    }

    /// Register (or replace) the adapter for its database type.
    pub fn with(mut self, backend: impl Backend + 'static) -> Self {
        self.adapters.insert(backend.db_type(), Arc::new(backend));
        self
    }

    pub fn get(&self, db_type: DatabaseType) -> AppResult<Arc<dyn Backend>> {
        self.adapters.get(&db_type).cloned().ok_or_else(|| {
            AppError::unsupported_type(db_type.tag(), "no adapter is registered for this type")
        })
    }

    pub fn supports(&self, db_type: DatabaseType) -> bool {
        self.adapters.contains_key(&db_type)
    }
}

impl std::fmt::Debug for Backends {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut types: Vec<_> = self.adapters.keys().map(|t| t.tag()).collect();
        types.sort_unstable();
        f.debug_struct("Backends").field("types", &types).finish()
    }
}

/// Reported when a statement reaches a session that was already disposed.
pub(crate) const SESSION_CLOSED: &str = "session is closed";

/// Wrap a driver failure during statement execution, keeping only its description.
pub(crate) fn query_error(err: sqlx::Error) -> AppError {
    AppError::query(driver_message(&err))
}

/// Wrap a driver failure during introspection.
pub(crate) fn schema_error(err: sqlx::Error) -> AppError {
    AppError::schema(driver_message(&err))
}

fn driver_message(err: &sqlx::Error) -> String {
    match err {
        sqlx::Error::Database(db_err) => db_err.message().to_string(),
        sqlx::Error::PoolClosed => SESSION_CLOSED.to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_backends_cover_all_types() {
        let backends = Backends::native(Duration::from_secs(10));
        assert!(backends.supports(DatabaseType::MySQL));
        assert!(backends.supports(DatabaseType::PostgreSQL));
        assert!(backends.supports(DatabaseType::SQLite));
    }

    #[test]
    fn test_empty_backends_reject() {
        let err = match Backends::empty().get(DatabaseType::MySQL) {
            Ok(_) => panic!("expected unsupported"),
            Err(e) => e,
        };
        assert_eq!(err.code(), "UNSUPPORTED_TYPE");
    }

    #[test]
    fn test_driver_message_for_non_database_errors() {
        let err = query_error(sqlx::Error::PoolClosed);
        assert_eq!(err.to_string(), "Query execution failed: session is closed");
        let err = schema_error(sqlx::Error::RowNotFound);
        assert!(err.to_string().starts_with("Failed to fetch schema: "));
    }
}
