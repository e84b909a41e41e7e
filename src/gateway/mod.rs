//! Operations exposed to the HTTP boundary.
//!
//! - [`ConnectDispatcher`]: connect and disconnect
//! - [`QueryGateway`]: execute SQL on a handle
//! - [`SchemaGateway`]: introspect a handle's database
//!
//! [`DatabaseGateway`] bundles the three over one shared registry.

mod connect;
mod query;
mod schema;

pub use connect::ConnectDispatcher;
pub use query::QueryGateway;
pub use schema::SchemaGateway;

use std::sync::Arc;

use crate::db::{Backends, ConnectionRegistry};
use crate::error::AppResult;
use crate::models::{ConnectionConfig, ConnectionHandle, QueryResult, SchemaDocument};

#[derive(Debug, Clone)]
pub struct DatabaseGateway {
    registry: Arc<ConnectionRegistry>,
    dispatcher: ConnectDispatcher,
    queries: QueryGateway,
    schemas: SchemaGateway,
}

impl DatabaseGateway {
    pub fn new(backends: Backends, registry: Arc<ConnectionRegistry>, read_only: bool) -> Self {
        Self {
            dispatcher: ConnectDispatcher::new(backends, Arc::clone(&registry)),
            queries: QueryGateway::new(Arc::clone(&registry), read_only),
            schemas: SchemaGateway::new(Arc::clone(&registry)),
            registry,
        }
    }

    pub async fn connect(&self, config: ConnectionConfig) -> AppResult<ConnectionHandle> {
        self.dispatcher.connect(config).await
    }

    pub async fn execute_query(&self, handle: &str, sql: &str) -> AppResult<QueryResult> {
        self.queries.execute_query(handle, sql).await
    }

    pub async fn get_schema(&self, handle: &str) -> AppResult<SchemaDocument> {
        self.schemas.get_schema(handle).await
    }

    pub async fn disconnect(&self, handle: &str) -> bool {
        self.dispatcher.disconnect(handle).await
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    pub fn is_read_only(&self) -> bool {
        self.queries.is_read_only()
    }
}
