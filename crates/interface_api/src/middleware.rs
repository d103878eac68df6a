//! API middleware

use axum::{body::Body, http::Request, middleware::Next, response::Response};
use chrono::Utc;
use tracing::info;

use core_kernel::Actor;

/// Header naming the acting user; requests without it act as `system`
pub const ACTOR_HEADER: &str = "X-Actor-Id";

/// Resolves the acting user and stores it in the request extensions
pub async fn actor_middleware(mut request: Request<Body>, next: Next) -> Response {
    let actor = request
        .headers()
        .get(ACTOR_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(Actor::new)
        .unwrap_or_else(Actor::system);

    request.extensions_mut().insert(actor);
    next.run(request).await
}

/// Request logging middleware
pub async fn request_log_middleware(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let actor = request
        .extensions()
        .get::<Actor>()
        .map(|a| a.to_string())
        .unwrap_or_else(|| "anonymous".to_string());

    let start = Utc::now();
    let response = next.run(request).await;
    let duration = Utc::now() - start;

    info!(
        method = %method,
        uri = %uri,
        actor = %actor,
        status = response.status().as_u16(),
        duration_ms = duration.num_milliseconds(),
        "API request"
    );

    response
}
