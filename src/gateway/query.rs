//! Query execution gateway.

use std::sync::Arc;

use tracing::debug;

use crate::db::ConnectionRegistry;
use crate::error::AppResult;
use crate::guard;
use crate::models::QueryResult;

#[derive(Debug, Clone)]
pub struct QueryGateway {
    registry: Arc<ConnectionRegistry>,
    read_only: bool,
}

impl QueryGateway {
    pub fn new(registry: Arc<ConnectionRegistry>, read_only: bool) -> Self {
        Self {
            registry,
            read_only,
        }
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Run `sql` on the connection behind `handle`.
    ///
    /// An unknown handle is reported before any SQL validation. No retries.
    pub async fn execute_query(&self, handle: &str, sql: &str) -> AppResult<QueryResult> {
        let entry = self.registry.lookup(handle).await?;

        guard::ensure_not_empty(sql)?;
        if self.read_only {
            guard::validate_readonly(sql, entry.db_type())?;
        }

        debug!(connection_id = %handle, sql = %sql, "Executing query");
        entry.session().execute(sql).await
    }
}
