//! HTTP boundary for the service.
//!
//! Routes live in [`routes`]; this module assembles the middleware stack and
//! owns the server lifecycle, including closing every live session on shutdown.

pub mod middleware;
pub mod response;
pub mod routes;
pub mod state;

pub use response::{ApiResponse, ValidJson};
pub use state::AppState;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderName, Method, header},
};
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use self::middleware::{RateLimiter, rate_limit, request_id, with_security_headers};

/// Maximum accepted request body.
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Build the full application router with its middleware stack.
///
/// Layers, outermost first: CORS, security headers, body limit,
/// request ID, tracing, global rate limiter.
pub fn router(state: AppState, config: &Config) -> AppResult<Router> {
    let origins = config.cors_origins().map_err(AppError::validation)?;

    let global_limiter = Arc::new(RateLimiter::new(
        "global",
        config.rate_limit_max,
        config.rate_limit_window_duration(),
    ));
    let query_limiter = Arc::new(RateLimiter::new(
        "query",
        config.query_rate_limit_max,
        config.query_rate_limit_window_duration(),
    ));

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
        ]);

    let app = routes::api_routes(query_limiter)
        .layer(axum::middleware::from_fn_with_state(
            global_limiter,
            rate_limit,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(request_id))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES));

    Ok(with_security_headers(app).layer(cors).with_state(state))
}

/// HTTP server with graceful shutdown.
pub struct HttpServer {
    config: Config,
    state: AppState,
}

impl HttpServer {
    pub fn new(config: Config, state: AppState) -> Self {
        Self { config, state }
    }

    /// Get the bind address.
    pub fn bind_addr(&self) -> String {
        self.config.http_bind_addr()
    }

    /// Serve until SIGINT/SIGTERM, then close every registered session.
    pub async fn run(self) -> AppResult<()> {
        let bind_addr = self.bind_addr();
        let registry = Arc::clone(self.state.gateway.registry());
        let app = router(self.state, &self.config)?;

        let listener = TcpListener::bind(&bind_addr)
            .await
            .map_err(|e| AppError::internal(format!("Failed to bind to {}: {}", bind_addr, e)))?;

        info!(
            addr = %bind_addr,
            read_only = !self.config.allow_writes,
            "QueryMind API listening"
        );

        // In-flight requests may hang on a slow database or model call, so a
        // second signal or this timeout forces exit after shutdown starts.
        const GRACEFUL_TIMEOUT: Duration = Duration::from_secs(30);

        let shutdown_notify = Arc::new(tokio::sync::Notify::new());
        let shutdown_notify_clone = shutdown_notify.clone();
        let shutdown_signal = async move {
            wait_for_signal().await;
            shutdown_notify_clone.notify_one();
        };

        let server = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal);

        tokio::select! {
            result = server => {
                match result {
                    Ok(()) => info!("HTTP server stopped"),
                    Err(e) => {
                        error!(error = %e, "HTTP server error");
                        registry.close_all().await;
                        return Err(AppError::internal(format!("HTTP server error: {}", e)));
                    }
                }
            }
            _ = async {
                shutdown_notify.notified().await;
                info!(
                    timeout_secs = GRACEFUL_TIMEOUT.as_secs(),
                    "Waiting for requests to finish (send signal again to force exit)..."
                );
                tokio::select! {
                    _ = tokio::time::sleep(GRACEFUL_TIMEOUT) => {
                        warn!("Graceful shutdown timeout, forcing exit");
                    }
                    _ = wait_for_signal() => {
                        warn!("Received second signal, forcing immediate exit");
                    }
                }
            } => {}
        }

        let closed = registry.close_all().await;
        info!(closed, "Closed database sessions");
        Ok(())
    }
}

/// Wait for a shutdown signal (SIGINT or SIGTERM).
async fn wait_for_signal() {
    let ctrl_c = signal::ctrl_c();

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
