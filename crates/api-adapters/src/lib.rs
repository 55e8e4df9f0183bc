//! rusty-press/crates/api-adapters/src/lib.rs
//!
//! JSON HTTP surface over the application services.
//! The axum router sits behind the `web-axum` feature.

pub mod metrics;

#[cfg(feature = "web-axum")]
pub mod dto;
#[cfg(feature = "web-axum")]
pub mod error;
#[cfg(feature = "web-axum")]
pub mod extract;
#[cfg(feature = "web-axum")]
pub mod handlers;
#[cfg(feature = "web-axum")]
pub mod middleware;
#[cfg(feature = "web-axum")]
pub mod state;

// Re-exporting for easier access in binaries and tests
pub use metrics::Metrics;

#[cfg(feature = "web-axum")]
pub use error::ApiError;
#[cfg(feature = "web-axum")]
pub use state::AppState;

#[cfg(feature = "web-axum")]
use axum::routing::{get, patch, post};
#[cfg(feature = "web-axum")]
use axum::Router;
#[cfg(feature = "web-axum")]
use tower::ServiceBuilder;
#[cfg(feature = "web-axum")]
use tower_http::{
    compression::CompressionLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

/// Builds the full application router.
#[cfg(feature = "web-axum")]
pub fn router(state: AppState) -> Router {
    use handlers::{auth, comments, posts, statuses, taxonomy};

    let api = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::me))
        .route("/posts", get(posts::list).post(posts::create))
        .route("/posts/search", get(posts::search))
        .route("/posts/mine", get(posts::mine))
        .route("/posts/drafts", get(posts::drafts))
        .route("/posts/featured", get(posts::featured))
        .route("/posts/popular", get(posts::popular))
        .route("/posts/{slug}", get(posts::get).patch(posts::update).delete(posts::delete))
        .route("/posts/{slug}/transition", post(posts::transition))
        .route("/posts/{slug}/publish", post(posts::publish))
        .route("/posts/{slug}/comments", get(comments::thread).post(comments::add))
        .route("/categories", get(taxonomy::list_categories).post(taxonomy::create_category))
        .route("/categories/{slug}", get(taxonomy::get_category).delete(taxonomy::delete_category))
        .route("/categories/{slug}/posts", get(taxonomy::category_posts))
        .route("/tags", get(taxonomy::list_tags).post(taxonomy::create_tag))
        .route("/tags/{slug}", get(taxonomy::get_tag).delete(taxonomy::delete_tag))
        .route("/tags/{slug}/posts", get(taxonomy::tag_posts))
        .route("/statuses", get(statuses::list).post(statuses::create))
        .route("/statuses/reload", post(statuses::reload))
        .route("/statuses/{slug}", patch(statuses::update))
        .route("/comments/mine", get(comments::mine))
        .route("/comments/pending", get(comments::pending))
        .route("/comments/{id}", patch(comments::edit).delete(comments::delete))
        .route("/comments/{id}/replies", get(comments::replies))
        .route("/comments/{id}/approve", post(comments::approve))
        .route("/comments/{id}/reject", post(comments::reject))
        .route("/comments/{id}/flag", post(comments::flag))
        .route("/comments/{id}/spam", post(comments::spam))
        .route("/comments/{id}/report", post(comments::report))
        .route("/comments/{id}/history", get(comments::history))
        .route("/reports", get(comments::reports))
        .route("/reports/{id}/review", post(comments::review));

    let metrics = state.metrics.clone();
    Router::new()
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .nest("/api", api)
        .layer(axum::middleware::from_fn_with_state(metrics, middleware::track_requests))
        .layer(
            // outermost first: the request id exists before the trace span opens
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(middleware::cors_policy())
                .layer(CompressionLayer::new()),
        )
        .with_state(state)
}
