//! Route table and handlers for the `/api` surface.

use std::sync::Arc;

use axum::{
    Extension, Router,
    extract::State,
    middleware,
    routing::{get, post},
};
use chrono::Utc;
use serde::Serialize;
use serde_json::{Value as JsonValue, json};
use tracing::info;

use super::middleware::{RateLimiter, RequestId, rate_limit};
use super::response::{ApiResponse, ValidJson};
use super::state::AppState;
use crate::error::AppResult;
use crate::models::{
    ConnectRequest, ConnectionHandle, ConnectionRequest, ConvertRequest, ConvertResponse,
    DatabaseType, ExecuteRequest, Optimization, OptimizeRequest, QueryResult, SchemaDocument,
    SuggestRequest,
};

type ApiResult<T> = AppResult<ApiResponse<T>>;

/// Build the `/api` routes. `query_limiter` guards only `/api/query/*`.
pub fn api_routes(query_limiter: Arc<RateLimiter>) -> Router<AppState> {
    let query = Router::new()
        .route("/convert", post(convert_query))
        .route("/optimize", post(optimize_query))
        .route("/suggestions", post(suggest_improvements))
        .layer(middleware::from_fn_with_state(query_limiter, rate_limit));

    Router::new()
        .route("/api/health", get(health))
        .route("/api/database/connect", post(connect))
        .route("/api/database/execute", post(execute))
        .route("/api/database/disconnect", post(disconnect))
        .route("/api/schema/analyze", post(analyze_schema))
        .nest("/api/query", query)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ConnectData {
    connection_id: ConnectionHandle,
}

#[derive(Debug, Serialize)]
struct SchemaData {
    schema: SchemaDocument,
}

#[derive(Debug, Serialize)]
struct SuggestionsData {
    suggestions: Vec<String>,
}

async fn health(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
) -> ApiResponse<JsonValue> {
    let connections = state.gateway.registry().len().await;
    ApiResponse::ok(json!({
        "status": "ok",
        "timestamp": Utc::now(),
        "connections": connections,
    }))
    .with_request_id(request_id.as_str())
}

async fn connect(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    ValidJson(req): ValidJson<ConnectRequest>,
) -> ApiResult<ConnectData> {
    let config = req.into_config()?;
    let connection_id = state.gateway.connect(config).await?;
    Ok(ApiResponse::ok(ConnectData { connection_id }).with_request_id(request_id.as_str()))
}

async fn execute(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    ValidJson(req): ValidJson<ExecuteRequest>,
) -> ApiResult<QueryResult> {
    let result = state
        .gateway
        .execute_query(&req.connection_id, &req.query)
        .await?;
    Ok(ApiResponse::ok(result).with_request_id(request_id.as_str()))
}

async fn disconnect(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    ValidJson(req): ValidJson<ConnectionRequest>,
) -> ApiResponse<JsonValue> {
    let removed = state.gateway.disconnect(&req.connection_id).await;
    if !removed {
        info!(connection_id = %req.connection_id, "Disconnect for unknown handle");
    }
    ApiResponse::ok(json!({ "disconnected": true }))
        .with_message("Disconnected successfully")
        .with_request_id(request_id.as_str())
}

async fn analyze_schema(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    ValidJson(req): ValidJson<ConnectionRequest>,
) -> ApiResult<SchemaData> {
    let schema = state.gateway.get_schema(&req.connection_id).await?;
    Ok(ApiResponse::ok(SchemaData { schema }).with_request_id(request_id.as_str()))
}

async fn convert_query(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    ValidJson(req): ValidJson<ConvertRequest>,
) -> ApiResult<ConvertResponse> {
    let dialect: DatabaseType = req.db_type.parse()?;
    let schema = req.schema.unwrap_or_default();
    let sql_query = state
        .assistant
        .translate(&req.natural_language, &schema, dialect, &req.language)
        .await?;
    Ok(ApiResponse::ok(ConvertResponse {
        sql_query,
        natural_language: req.natural_language,
        timestamp: Utc::now(),
    })
    .with_request_id(request_id.as_str()))
}

async fn optimize_query(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    ValidJson(req): ValidJson<OptimizeRequest>,
) -> ApiResult<Optimization> {
    let dialect: DatabaseType = req.db_type.parse()?;
    let optimization = state.assistant.optimize(&req.sql_query, dialect).await?;
    Ok(ApiResponse::ok(optimization).with_request_id(request_id.as_str()))
}

async fn suggest_improvements(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    ValidJson(req): ValidJson<SuggestRequest>,
) -> ApiResult<SuggestionsData> {
    let dialect: DatabaseType = req.db_type.parse()?;
    let schema = req.schema.unwrap_or_default();
    let suggestions = state
        .assistant
        .suggest(&req.sql_query, &schema, dialect)
        .await?;
    Ok(ApiResponse::ok(SuggestionsData { suggestions }).with_request_id(request_id.as_str()))
}
