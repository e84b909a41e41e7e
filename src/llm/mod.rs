//! Language-model collaborator.
//!
//! The service treats the model as a black box behind [`SqlAssistant`]:
//! translate a question into SQL, optimize a query, or suggest improvements.
//! Calls are never retried; every failure becomes an `Assistant` error.

mod openrouter;

pub use openrouter::OpenRouterClient;

use async_trait::async_trait;

use crate::error::AppResult;
use crate::models::{DatabaseType, Optimization, SchemaDocument};

#[async_trait]
pub trait SqlAssistant: Send + Sync {
    /// Convert natural-language text into a single SQL query for `dialect`.
    async fn translate(
        &self,
        text: &str,
        schema: &SchemaDocument,
        dialect: DatabaseType,
        locale: &str,
    ) -> AppResult<String>;

    async fn optimize(&self, sql: &str, dialect: DatabaseType) -> AppResult<Optimization>;

    async fn suggest(
        &self,
        sql: &str,
        schema: &SchemaDocument,
        dialect: DatabaseType,
    ) -> AppResult<Vec<String>>;
}

/// Remove Markdown code fences from model output.
pub fn strip_code_fences(text: &str) -> String {
    let mut out = text.trim().to_string();
    for fence in ["```sql", "```SQL", "```json", "```"] {
        out = out.replace(fence, "");
    }
    out.trim().to_string()
}
