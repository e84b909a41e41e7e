//! Schema introspection gateway.

use std::sync::Arc;

use tracing::info;

use crate::db::ConnectionRegistry;
use crate::error::AppResult;
use crate::models::SchemaDocument;

#[derive(Debug, Clone)]
pub struct SchemaGateway {
    registry: Arc<ConnectionRegistry>,
}

impl SchemaGateway {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Introspect the database behind `handle`. Never cached, never partial.
    pub async fn get_schema(&self, handle: &str) -> AppResult<SchemaDocument> {
        let entry = self.registry.lookup(handle).await?;
        let schema = entry.session().introspect_schema().await?;
        info!(
            connection_id = %handle,
            table_count = schema.len(),
            "Schema analyzed"
        );
        Ok(schema)
    }
}
