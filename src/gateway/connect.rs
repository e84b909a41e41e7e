//! Connect dispatcher: routes a configuration to its adapter and registers the session.

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use crate::db::{Backends, ConnectionRegistry};
use crate::error::{AppError, AppResult};
use crate::models::{ConnectionConfig, ConnectionHandle};

#[derive(Debug, Clone)]
pub struct ConnectDispatcher {
    backends: Backends,
    registry: Arc<ConnectionRegistry>,
}

impl ConnectDispatcher {
    pub fn new(backends: Backends, registry: Arc<ConnectionRegistry>) -> Self {
        Self { backends, registry }
    }

    /// Open and verify a session, then register it.
    ///
    /// A failed connect never leaves an entry behind.
    pub async fn connect(&self, config: ConnectionConfig) -> AppResult<ConnectionHandle> {
        let db_type = config.db_type;
        let backend = self.backends.get(db_type)?;
        let start = Instant::now();

        let session = match backend.connect(&config).await {
            Ok(session) => session,
            Err(e) => {
                if let AppError::Connection { cause, .. } = &e {
                    warn!(
                        db_type = %db_type,
                        target_db = %config.target(),
                        cause = ?cause,
                        "Connection failed"
                    );
                }
                return Err(e);
            }
        };

        let handle = self.registry.register(db_type, session).await;
        info!(
            connection_id = %handle,
            db_type = %db_type,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Connected successfully"
        );
        Ok(handle)
    }

    /// Dispose a handle. Idempotent; returns whether anything was closed.
    pub async fn disconnect(&self, handle: &str) -> bool {
        self.registry.dispose(handle).await
    }
}
