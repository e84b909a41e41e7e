//! QueryMind - Main entry point.
//!
//! Serves the QueryMind HTTP API: ad-hoc MySQL/PostgreSQL sessions,
//! schema introspection and natural-language to SQL translation.

use querymind::config::Config;
use querymind::db::{Backends, ConnectionRegistry};
use querymind::gateway::DatabaseGateway;
use querymind::http::{AppState, HttpServer};
use querymind::llm::OpenRouterClient;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber.with(fmt::layer().json()).init();
    } else {
        subscriber
            .with(fmt::layer().with_target(true).with_thread_ids(false))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse configuration from command line and environment
    let config = Config::parse_args();

    // Initialize logging
    init_tracing(&config);

    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(2);
    }

    info!(
        read_only = !config.allow_writes,
        "Starting QueryMind v{}",
        env!("CARGO_PKG_VERSION")
    );

    // One registry shared by every gateway and request
    let registry = Arc::new(ConnectionRegistry::new());
    let backends = Backends::native(config.connect_timeout_duration());
    let gateway = DatabaseGateway::new(backends, registry, !config.allow_writes);

    let assistant = OpenRouterClient::new(config.openrouter_api_key.clone())
        .with_endpoint(&config.openrouter_url)
        .with_translate_model(&config.translate_model)
        .with_suggest_model(&config.suggest_model)
        .with_timeout(config.llm_timeout_duration())?;
    if !assistant.is_configured() {
        warn!("OPENROUTER_API_KEY is not set; query assistant endpoints will fail");
    }

    let state = AppState::new(gateway, Arc::new(assistant));

    if let Err(e) = HttpServer::new(config, state).run().await {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Server shutdown complete");
    Ok(())
}
