//! Integration tests for the connect dispatcher, registry and gateways.
//!
//! These tests use in-memory fake backends so they run without a database.

use async_trait::async_trait;
use querymind::db::{Backend, Backends, ConnectionRegistry, Session};
use querymind::error::{AppError, AppResult};
use querymind::gateway::DatabaseGateway;
use querymind::models::{
    ColumnDescriptor, ConnectionConfig, DatabaseType, KeyRole, QueryResult, SchemaDocument,
};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Counters shared between a fake backend and the test body.
#[derive(Default)]
struct Counters {
    connects: AtomicUsize,
    executes: AtomicUsize,
    closes: AtomicUsize,
}

struct FakeBackend {
    db_type: DatabaseType,
    counters: Arc<Counters>,
    refuse: bool,
}

struct FakeSession {
    counters: Arc<Counters>,
    closed: AtomicBool,
}

#[async_trait]
impl Backend for FakeBackend {
    fn db_type(&self) -> DatabaseType {
        self.db_type
    }

    async fn connect(&self, _config: &ConnectionConfig) -> AppResult<Box<dyn Session>> {
        if self.refuse {
            return Err(AppError::connection_other("server unreachable"));
        }
        self.counters.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeSession {
            counters: Arc::clone(&self.counters),
            closed: AtomicBool::new(false),
        }))
    }
}

#[async_trait]
impl Session for FakeSession {
    async fn execute(&self, sql: &str) -> AppResult<QueryResult> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(AppError::query("session is closed"));
        }
        self.counters.executes.fetch_add(1, Ordering::SeqCst);
        let mut row = Map::new();
        row.insert("sql".to_string(), Value::String(sql.to_string()));
        Ok(QueryResult::new(vec![row]))
    }

    async fn introspect_schema(&self) -> AppResult<SchemaDocument> {
        let mut doc = SchemaDocument::new();
        doc.insert(
            "users",
            vec![
                ColumnDescriptor::new("id", "int", false).with_key_role(Some(KeyRole::Primary)),
                ColumnDescriptor::new("name", "varchar", true),
            ],
        );
        Ok(doc)
    }

    async fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.counters.closes.fetch_add(1, Ordering::SeqCst);
        }
    }
}

fn config(db_type: DatabaseType) -> ConnectionConfig {
    ConnectionConfig {
        db_type,
        host: "localhost".to_string(),
        port: db_type.default_port().unwrap_or(0),
        user: "root".to_string(),
        password: "secret".to_string(),
        database: "shop".to_string(),
        filename: None,
    }
}

/// Gateway with fake MySQL and PostgreSQL backends.
fn setup(read_only: bool) -> (DatabaseGateway, Arc<Counters>) {
    let counters = Arc::new(Counters::default());
    let backends = Backends::empty()
        .with(FakeBackend {
            db_type: DatabaseType::MySQL,
            counters: Arc::clone(&counters),
            refuse: false,
        })
        .with(FakeBackend {
            db_type: DatabaseType::PostgreSQL,
            counters: Arc::clone(&counters),
            refuse: false,
        });
    let gateway = DatabaseGateway::new(backends, Arc::new(ConnectionRegistry::new()), read_only);
    (gateway, counters)
}

// =========================================================================
// Connect / disconnect
// =========================================================================

#[tokio::test]
async fn test_connect_returns_tagged_handle() {
    let (gateway, counters) = setup(true);

    let mysql = gateway.connect(config(DatabaseType::MySQL)).await.unwrap();
    let pg = gateway
        .connect(config(DatabaseType::PostgreSQL))
        .await
        .unwrap();

    assert!(mysql.as_str().starts_with("mysql_"));
    assert!(pg.as_str().starts_with("postgresql_"));
    assert_eq!(counters.connects.load(Ordering::SeqCst), 2);
    assert_eq!(gateway.registry().len().await, 2);
}

#[tokio::test]
async fn test_concurrent_connects_yield_distinct_handles() {
    let (gateway, _counters) = setup(true);

    let tasks: Vec<_> = (0..32)
        .map(|_| {
            let gateway = gateway.clone();
            tokio::spawn(async move { gateway.connect(config(DatabaseType::MySQL)).await })
        })
        .collect();

    let mut handles = HashSet::new();
    for task in tasks {
        let handle = task.await.unwrap().unwrap();
        assert!(handles.insert(handle.as_str().to_string()));
    }
    assert_eq!(handles.len(), 32);
    assert_eq!(gateway.registry().len().await, 32);
}

#[tokio::test]
async fn test_failed_connect_registers_nothing() {
    let counters = Arc::new(Counters::default());
    let backends = Backends::empty().with(FakeBackend {
        db_type: DatabaseType::MySQL,
        counters: Arc::clone(&counters),
        refuse: true,
    });
    let gateway = DatabaseGateway::new(backends, Arc::new(ConnectionRegistry::new()), true);

    let err = gateway
        .connect(config(DatabaseType::MySQL))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "CONNECTION_ERROR");
    assert!(err.to_string().contains("server unreachable"));
    assert!(gateway.registry().is_empty().await);
}

#[tokio::test]
async fn test_unregistered_type_is_unsupported() {
    let (gateway, counters) = setup(true);

    let mut sqlite = config(DatabaseType::SQLite);
    sqlite.filename = Some("local.db".to_string());
    let err = gateway.connect(sqlite).await.unwrap_err();

    assert!(matches!(err, AppError::UnsupportedType { .. }));
    assert_eq!(counters.connects.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_native_sqlite_backend_is_disabled() {
    let gateway = DatabaseGateway::new(
        Backends::native(std::time::Duration::from_secs(1)),
        Arc::new(ConnectionRegistry::new()),
        true,
    );

    let mut sqlite = config(DatabaseType::SQLite);
    sqlite.filename = Some("local.db".to_string());
    let err = gateway.connect(sqlite).await.unwrap_err();

    assert_eq!(err.code(), "UNSUPPORTED_TYPE");
    assert!(gateway.registry().is_empty().await);
}

#[tokio::test]
async fn test_disconnect_closes_and_is_idempotent() {
    let (gateway, counters) = setup(true);
    let handle = gateway.connect(config(DatabaseType::MySQL)).await.unwrap();

    assert!(gateway.disconnect(handle.as_str()).await);
    assert!(!gateway.disconnect(handle.as_str()).await);
    assert!(!gateway.disconnect("mysql_never_issued").await);

    assert_eq!(counters.closes.load(Ordering::SeqCst), 1);
    assert!(gateway.registry().is_empty().await);
}

#[tokio::test]
async fn test_disposed_handle_is_not_found() {
    let (gateway, _counters) = setup(true);
    let handle = gateway.connect(config(DatabaseType::MySQL)).await.unwrap();
    gateway.disconnect(handle.as_str()).await;

    let err = gateway
        .execute_query(handle.as_str(), "SELECT 1")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound { .. }));

    let err = gateway.get_schema(handle.as_str()).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound { .. }));
}

#[tokio::test]
async fn test_in_flight_entry_survives_dispose() {
    let (gateway, _counters) = setup(true);
    let handle = gateway.connect(config(DatabaseType::MySQL)).await.unwrap();

    // Simulates a request that looked the handle up before dispose ran
    let entry = gateway.registry().lookup(handle.as_str()).await.unwrap();
    gateway.disconnect(handle.as_str()).await;

    let err = entry.session().execute("SELECT 1").await.unwrap_err();
    assert_eq!(err.to_string(), "Query execution failed: session is closed");
}

#[tokio::test]
async fn test_close_all_closes_every_session() {
    let (gateway, counters) = setup(true);
    for _ in 0..3 {
        gateway.connect(config(DatabaseType::MySQL)).await.unwrap();
    }

    assert_eq!(gateway.registry().close_all().await, 3);
    assert_eq!(counters.closes.load(Ordering::SeqCst), 3);
    assert!(gateway.registry().is_empty().await);
}

// =========================================================================
// Query execution and the read-only guard
// =========================================================================

#[tokio::test]
async fn test_execute_delegates_to_session() {
    let (gateway, counters) = setup(true);
    let handle = gateway.connect(config(DatabaseType::MySQL)).await.unwrap();

    let result = gateway
        .execute_query(handle.as_str(), "SELECT * FROM users")
        .await
        .unwrap();

    assert_eq!(result.row_count, 1);
    assert_eq!(result.rows[0]["sql"], "SELECT * FROM users");
    assert_eq!(counters.executes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_unknown_handle_reported_before_guard() {
    let (gateway, _counters) = setup(true);

    // Both empty and write SQL would fail the guard; NotFound wins
    let err = gateway.execute_query("mysql_missing", "").await.unwrap_err();
    assert!(matches!(err, AppError::NotFound { .. }));

    let err = gateway
        .execute_query("mysql_missing", "DROP TABLE users")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound { .. }));
}

#[tokio::test]
async fn test_read_only_rejects_writes() {
    let (gateway, counters) = setup(true);
    let handle = gateway.connect(config(DatabaseType::MySQL)).await.unwrap();

    let err = gateway
        .execute_query(handle.as_str(), "DELETE FROM users")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Permission { .. }));
    assert_eq!(counters.executes.load(Ordering::SeqCst), 0);

    let err = gateway
        .execute_query(handle.as_str(), " ;; ")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation { .. }));
}

#[tokio::test]
async fn test_writes_allowed_when_not_read_only() {
    let (gateway, counters) = setup(false);
    let handle = gateway
        .connect(config(DatabaseType::PostgreSQL))
        .await
        .unwrap();

    gateway
        .execute_query(handle.as_str(), "INSERT INTO users (name) VALUES ('a')")
        .await
        .unwrap();
    assert_eq!(counters.executes.load(Ordering::SeqCst), 1);

    // Empty SQL is rejected regardless of policy
    let err = gateway.execute_query(handle.as_str(), "").await.unwrap_err();
    assert!(matches!(err, AppError::Validation { .. }));
}

// =========================================================================
// Schema introspection
// =========================================================================

#[tokio::test]
async fn test_get_schema_returns_document() {
    let (gateway, _counters) = setup(true);
    let handle = gateway.connect(config(DatabaseType::MySQL)).await.unwrap();

    let schema = gateway.get_schema(handle.as_str()).await.unwrap();
    let users = schema.table("users").unwrap();
    assert_eq!(users.len(), 2);
    assert_eq!(users[0].name, "id");
    assert_eq!(users[0].key_role, Some(KeyRole::Primary));
    assert!(users[1].nullable);
}
