//! Connection registry.
//!
//! Maps opaque connection handles to live sessions. The registry is created
//! once at startup and shared by `Arc`; it is the only owner that removes an
//! entry and closes its session.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::backend::Session;
use crate::error::{AppError, AppResult};
use crate::models::{ConnectionHandle, DatabaseType};

/// A registered session. Never mutated after registration.
pub struct ManagedConnection {
    handle: ConnectionHandle,
    db_type: DatabaseType,
    session: Box<dyn Session>,
    created_at: DateTime<Utc>,
}

impl ManagedConnection {
    pub fn handle(&self) -> &ConnectionHandle {
        &self.handle
    }

    pub fn db_type(&self) -> DatabaseType {
        self.db_type
    }

    pub fn session(&self) -> &dyn Session {
        self.session.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl std::fmt::Debug for ManagedConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagedConnection")
            .field("handle", &self.handle)
            .field("db_type", &self.db_type)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
pub struct ConnectionRegistry {
    entries: RwLock<HashMap<ConnectionHandle, Arc<ManagedConnection>>>,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a verified session under a freshly minted handle.
    pub async fn register(
        &self,
        db_type: DatabaseType,
        session: Box<dyn Session>,
    ) -> ConnectionHandle {
        let mut entries = self.entries.write().await;

        let mut handle = ConnectionHandle::generate(db_type);
        while entries.contains_key(&handle) {
            handle = ConnectionHandle::generate(db_type);
        }

        let entry = ManagedConnection {
            handle: handle.clone(),
            db_type,
            session,
            created_at: Utc::now(),
        };
        entries.insert(handle.clone(), Arc::new(entry));
        let total = entries.len();
        drop(entries);

        info!(connection_id = %handle, db_type = %db_type, total, "Registered connection");
        handle
    }

    /// Find a live connection; unknown and disposed handles are `NotFound`.
    pub async fn lookup(&self, handle: &str) -> AppResult<Arc<ManagedConnection>> {
        let entries = self.entries.read().await;
        entries
            .get(handle)
            .cloned()
            .ok_or_else(|| AppError::not_found(handle))
    }

    /// Remove and close a connection. Absent handles are a no-op.
    ///
    /// Returns whether an entry was removed.
    pub async fn dispose(&self, handle: &str) -> bool {
        let removed = {
            let mut entries = self.entries.write().await;
            entries.remove(handle)
        }; // Lock released here

        match removed {
            Some(entry) => {
                // Close outside the lock; in-flight callers keep their Arc
                entry.session().close().await;
                info!(connection_id = %handle, "Disposed connection");
                true
            }
            None => {
                debug!(connection_id = %handle, "Dispose on unknown handle ignored");
                false
            }
        }
    }

    /// Close every live session. Used at shutdown.
    pub async fn close_all(&self) -> usize {
        let drained: Vec<_> = {
            let mut entries = self.entries.write().await;
            entries.drain().map(|(_, entry)| entry).collect()
        }; // Lock released here

        let count = drained.len();
        for entry in drained {
            debug!(connection_id = %entry.handle(), "Closing connection");
            entry.session().close().await;
        }

        if count > 0 {
            info!(count, "Closed all connections");
        }
        count
    }

    /// Handles currently registered, in no particular order.
    pub async fn handles(&self) -> Vec<ConnectionHandle> {
        let entries = self.entries.read().await;
        entries.keys().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl std::fmt::Debug for ConnectionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionRegistry").finish_non_exhaustive()
    }
}
