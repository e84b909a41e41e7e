//! Request-scoped middleware: request IDs, per-client rate limiting and
//! security headers.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::{
    Router,
    extract::{ConnectInfo, Request, State},
    http::{HeaderName, HeaderValue, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::{Instrument, warn};
use uuid::Uuid;

use crate::error::AppError;

/// Header name for request ID.
pub static REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

tokio::task_local! {
    static CURRENT_REQUEST_ID: String;
}

/// Request ID of the request being handled on this task, if any.
pub fn current_request_id() -> Option<String> {
    CURRENT_REQUEST_ID.try_with(Clone::clone).ok()
}

/// Request ID stored in request extensions.
#[derive(Clone, Debug)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Attach a request ID (reusing an inbound `x-request-id`), open a tracing
/// span for the request and echo the ID on the response. The ID is also
/// readable through [`current_request_id`] while the request is handled.
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let request_id = req
        .headers()
        .get(&REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(String::from)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    req.extensions_mut().insert(RequestId(request_id.clone()));

    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %req.method(),
        uri = %req.uri(),
    );

    let mut response = CURRENT_REQUEST_ID
        .scope(request_id.clone(), next.run(req))
        .instrument(span)
        .await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response
            .headers_mut()
            .insert(REQUEST_ID_HEADER.clone(), value);
    }
    response
}

#[derive(Debug, Clone, Copy)]
struct ClientWindow {
    count: u32,
    started: Instant,
}

/// Fixed-window request counter keyed by client IP.
#[derive(Debug)]
pub struct RateLimiter {
    name: &'static str,
    max_requests: u32,
    window: Duration,
    clients: Mutex<HashMap<IpAddr, ClientWindow>>,
}

/// Above this many tracked clients, expired windows are pruned on insert.
const PRUNE_THRESHOLD: usize = 1024;

impl RateLimiter {
    pub fn new(name: &'static str, max_requests: u32, window: Duration) -> Self {
        Self {
            name,
            max_requests,
            window,
            clients: Mutex::new(HashMap::new()),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Count one request for `client`; reject once the window is exhausted.
    pub fn check(&self, client: IpAddr) -> Result<(), AppError> {
        self.check_at(client, Instant::now())
    }

    fn check_at(&self, client: IpAddr, now: Instant) -> Result<(), AppError> {
        let mut clients = self
            .clients
            .lock()
            .map_err(|_| AppError::internal("rate limiter state poisoned"))?;

        if clients.len() >= PRUNE_THRESHOLD && !clients.contains_key(&client) {
            let window = self.window;
            clients.retain(|_, w| now.duration_since(w.started) < window);
        }

        let entry = clients.entry(client).or_insert(ClientWindow {
            count: 0,
            started: now,
        });

        let elapsed = now.duration_since(entry.started);
        if elapsed >= self.window {
            entry.count = 0;
            entry.started = now;
        }

        if entry.count >= self.max_requests {
            let remaining = self.window.saturating_sub(now.duration_since(entry.started));
            return Err(AppError::RateLimited {
                retry_after_secs: remaining.as_secs().max(1),
            });
        }

        entry.count += 1;
        Ok(())
    }
}

/// Peer address of the request, or the unspecified address when the
/// server was not started with connect info (e.g. in-process tests).
fn client_ip(req: &Request) -> IpAddr {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

pub async fn rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    req: Request,
    next: Next,
) -> Response {
    let client = client_ip(&req);
    if let Err(err) = limiter.check(client) {
        warn!(limiter = limiter.name(), client = %client, "Rate limit exceeded");
        return err.into_response();
    }
    next.run(req).await
}

/// Apply the fixed set of security headers without clobbering handler values.
pub fn with_security_headers<S>(router: Router<S>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("SAMEORIGIN"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_DNS_PREFETCH_CONTROL,
            HeaderValue::from_static("off"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::STRICT_TRANSPORT_SECURITY,
            HeaderValue::from_static("max-age=15552000; includeSubDomains"),
        ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(last: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(10, 0, 0, last))
    }

    #[test]
    fn test_rate_limiter_blocks_after_max() {
        let limiter = RateLimiter::new("test", 2, Duration::from_secs(60));
        let now = Instant::now();
        assert!(limiter.check_at(ip(1), now).is_ok());
        assert!(limiter.check_at(ip(1), now).is_ok());

        let err = limiter.check_at(ip(1), now).unwrap_err();
        match err {
            AppError::RateLimited { retry_after_secs } => assert_eq!(retry_after_secs, 60),
            other => panic!("unexpected error: {other:?}"),
        }

        // Other clients have their own window
        assert!(limiter.check_at(ip(2), now).is_ok());
    }

    #[test]
    fn test_rate_limiter_resets_after_window() {
        let limiter = RateLimiter::new("test", 1, Duration::from_secs(10));
        let now = Instant::now();
        assert!(limiter.check_at(ip(1), now).is_ok());
        assert!(limiter.check_at(ip(1), now + Duration::from_secs(5)).is_err());
        assert!(limiter.check_at(ip(1), now + Duration::from_secs(10)).is_ok());
    }

    #[test]
    fn test_rate_limiter_prunes_expired_clients() {
        let limiter = RateLimiter::new("test", 1, Duration::from_secs(1));
        let now = Instant::now();
        for i in 0..PRUNE_THRESHOLD {
            let addr = IpAddr::V6(std::net::Ipv6Addr::from(i as u128));
            assert!(limiter.check_at(addr, now).is_ok());
        }
        assert!(limiter.check_at(ip(1), now + Duration::from_secs(2)).is_ok());
        assert_eq!(limiter.clients.lock().unwrap().len(), 1);
    }
}
