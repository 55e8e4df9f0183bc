//! rusty-press/crates/api-adapters/src/middleware.rs
//!
//! Custom layers: CORS policy and request metrics. Request ids, tracing
//! and compression are stock `tower-http` layers assembled in `router`.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::Method;
use axum::middleware::Next;
use axum::response::Response;
use tower_http::cors::{Any, CorsLayer};

use crate::metrics::Metrics;

pub fn cors_policy() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers(Any)
        .max_age(std::time::Duration::from_secs(3600))
}

/// Counts every response by method and status code.
pub async fn track_requests(State(metrics): State<Arc<Metrics>>, request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let response = next.run(request).await;
    metrics.record_request(&method, response.status().as_u16());
    response
}
