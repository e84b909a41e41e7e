//! Shared application state handed to every handler.

use std::sync::Arc;

use crate::gateway::DatabaseGateway;
use crate::llm::SqlAssistant;

#[derive(Clone)]
pub struct AppState {
    pub gateway: DatabaseGateway,
    pub assistant: Arc<dyn SqlAssistant>,
}

impl AppState {
    pub fn new(gateway: DatabaseGateway, assistant: Arc<dyn SqlAssistant>) -> Self {
        Self { gateway, assistant }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("gateway", &self.gateway)
            .finish_non_exhaustive()
    }
}
