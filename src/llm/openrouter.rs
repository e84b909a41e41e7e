//! OpenRouter chat-completions client.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use super::{SqlAssistant, strip_code_fences};
use crate::error::{AppError, AppResult};
use crate::models::{DatabaseType, Optimization, SchemaDocument};

const TRANSLATE_OP: &str = "convert query";
const OPTIMIZE_OP: &str = "optimize query";
const SUGGEST_OP: &str = "get suggestions";

/// OpenRouter client implementing [`SqlAssistant`].
pub struct OpenRouterClient {
    /// API key. Never logged.
    api_key: Option<String>,
    endpoint: String,
    /// Model for translate and optimize.
    translate_model: String,
    /// Model for suggest.
    suggest_model: String,
    client: reqwest::Client,
}

impl OpenRouterClient {
    pub const DEFAULT_ENDPOINT: &'static str = "https://openrouter.ai/api/v1/chat/completions";
    pub const DEFAULT_TRANSLATE_MODEL: &'static str = "openai/gpt-4-turbo";
    pub const DEFAULT_SUGGEST_MODEL: &'static str = "openai/gpt-3.5-turbo";
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

    /// Creates a new client with default endpoint and models.
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            endpoint: Self::DEFAULT_ENDPOINT.to_string(),
            translate_model: Self::DEFAULT_TRANSLATE_MODEL.to_string(),
            suggest_model: Self::DEFAULT_SUGGEST_MODEL.to_string(),
            client: Self::build_client(Self::DEFAULT_TIMEOUT).unwrap_or_else(|e| {
                warn!(error = %e, "Failed to build HTTP client, model calls have no timeout");
                reqwest::Client::default()
            }),
        }
    }

    fn build_client(timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
        reqwest::Client::builder().timeout(timeout).build()
    }

    /// Sets the API endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    #[must_use]
    pub fn with_translate_model(mut self, model: impl Into<String>) -> Self {
        self.translate_model = model.into();
        self
    }

    #[must_use]
    pub fn with_suggest_model(mut self, model: impl Into<String>) -> Self {
        self.suggest_model = model.into();
        self
    }

    /// Sets the per-request timeout. Fails if the HTTP client cannot be built.
    pub fn with_timeout(mut self, timeout: Duration) -> AppResult<Self> {
        self.client = Self::build_client(timeout)
            .map_err(|e| AppError::internal(format!("Failed to build HTTP client: {}", e)))?;
        Ok(self)
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Sends one chat completion and returns the first choice's content.
    async fn request(&self, operation: &str, request: ChatCompletionRequest) -> AppResult<String> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| AppError::assistant(operation, "OPENROUTER_API_KEY not set"))?;

        debug!(model = %request.model, operation, "Sending completion request");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .header("HTTP-Referer", "https://querymind-ai.com")
            .header("X-Title", "QueryMind AI")
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::assistant(operation, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ApiErrorBody>(&body)
                .ok()
                .map(|b| b.error.message)
                .unwrap_or(body);
            warn!(status = %status, operation, "Completion request rejected");
            return Err(AppError::assistant(
                operation,
                format!("API returned status: {} - {}", status, detail),
            ));
        }

        let response: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| AppError::assistant(operation, e.to_string()))?;

        // Extract content from first choice
        response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| AppError::assistant(operation, "No choices in response"))
    }
}

fn schema_json(schema: &SchemaDocument) -> String {
    serde_json::to_string(schema).unwrap_or_else(|_| "{}".to_string())
}

fn translate_prompt(schema: &SchemaDocument, dialect: DatabaseType, locale: &str) -> String {
    let db = dialect.display_name();
    format!(
        "You are an expert SQL query generator. Convert natural language queries to SQL.
Database Type: {db}
Schema: {schema}
User Language: {locale}

Rules:
1. Generate ONLY valid SQL queries for {db}
2. Use proper table and column names from the schema
3. Include appropriate WHERE, JOIN, ORDER BY clauses as needed
4. Optimize for performance
5. Return ONLY the SQL query, no explanations
6. Support multi-language input (English, Hindi, Hinglish, Spanish, French, Chinese)",
        schema = schema_json(schema),
    )
}

fn optimize_prompt(dialect: DatabaseType) -> String {
    format!(
        r#"You are a SQL optimization expert for {}.
Analyze the given SQL query and provide:
1. Optimized version of the query
2. Brief explanation of optimizations made
3. Performance tips

Format your response as JSON:
{{
  "optimizedQuery": "...",
  "improvements": ["improvement 1", "improvement 2"],
  "estimatedPerformanceGain": "..."
}}"#,
        dialect.display_name()
    )
}

fn suggest_prompt(dialect: DatabaseType) -> String {
    format!(
        "Suggest improvements for this SQL query based on the schema and best practices for {}. \
         Return 3-5 actionable suggestions as a JSON array of strings.",
        dialect.display_name()
    )
}

/// Parse optimization JSON, tolerating surrounding code fences.
fn parse_optimization(content: &str) -> AppResult<Optimization> {
    serde_json::from_str(&strip_code_fences(content))
        .map_err(|e| AppError::assistant(OPTIMIZE_OP, format!("invalid JSON from model: {}", e)))
}

/// Parse suggestions: a JSON array of strings, or an object wrapping one.
fn parse_suggestions(content: &str) -> AppResult<Vec<String>> {
    let value: JsonValue = serde_json::from_str(&strip_code_fences(content))
        .map_err(|e| AppError::assistant(SUGGEST_OP, format!("invalid JSON from model: {}", e)))?;

    let items = match &value {
        JsonValue::Array(items) => items,
        JsonValue::Object(map) => match map.values().find_map(JsonValue::as_array) {
            Some(items) => items,
            None => {
                return Err(AppError::assistant(
                    SUGGEST_OP,
                    "model response contains no suggestion list",
                ));
            }
        },
        _ => {
            return Err(AppError::assistant(
                SUGGEST_OP,
                "model response is not a JSON array",
            ));
        }
    };

    Ok(items
        .iter()
        .map(|item| match item {
            JsonValue::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect())
}

#[async_trait]
impl SqlAssistant for OpenRouterClient {
    async fn translate(
        &self,
        text: &str,
        schema: &SchemaDocument,
        dialect: DatabaseType,
        locale: &str,
    ) -> AppResult<String> {
        let request = ChatCompletionRequest {
            model: self.translate_model.clone(),
            messages: vec![
                ChatMessage::system(translate_prompt(schema, dialect, locale)),
                ChatMessage::user(text),
            ],
            temperature: 0.3,
            max_tokens: 500,
        };

        let content = self.request(TRANSLATE_OP, request).await?;
        Ok(strip_code_fences(&content))
    }

    async fn optimize(&self, sql: &str, dialect: DatabaseType) -> AppResult<Optimization> {
        let request = ChatCompletionRequest {
            model: self.translate_model.clone(),
            messages: vec![
                ChatMessage::system(optimize_prompt(dialect)),
                ChatMessage::user(sql),
            ],
            temperature: 0.2,
            max_tokens: 800,
        };

        let content = self.request(OPTIMIZE_OP, request).await?;
        parse_optimization(&content)
    }

    async fn suggest(
        &self,
        sql: &str,
        schema: &SchemaDocument,
        dialect: DatabaseType,
    ) -> AppResult<Vec<String>> {
        let request = ChatCompletionRequest {
            model: self.suggest_model.clone(),
            messages: vec![
                ChatMessage::system(suggest_prompt(dialect)),
                ChatMessage::user(format!("Query: {}\nSchema: {}", sql, schema_json(schema))),
            ],
            temperature: 0.4,
            max_tokens: 300,
        };

        let content = self.request(SUGGEST_OP, request).await?;
        parse_suggestions(&content)
    }
}

/// Request to the chat completions API.
#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

/// Chat message.
#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

impl ChatMessage {
    fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Response from the chat completions API.
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}
