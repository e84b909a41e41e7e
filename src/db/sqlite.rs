//! Embedded file backend.
//!
//! Accepted by the configuration surface but disabled: every connect attempt
//! fails with a tagged unsupported error so callers never get a silent no-op.

use async_trait::async_trait;
use tracing::warn;

use super::backend::{Backend, Session};
use crate::error::{AppError, AppResult};
use crate::models::{ConnectionConfig, DatabaseType};

pub const DISABLED_REASON: &str = "SQLite support is temporarily disabled";

#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteBackend;

#[async_trait]
impl Backend for SqliteBackend {
    fn db_type(&self) -> DatabaseType {
        DatabaseType::SQLite
    }

    async fn connect(&self, config: &ConnectionConfig) -> AppResult<Box<dyn Session>> {
        warn!(target_db = %config.target(), "Rejected connect to disabled SQLite backend");
        Err(AppError::unsupported_type(
            DatabaseType::SQLite.tag(),
            DISABLED_REASON,
        ))
    }
}
