//! HTTP route table.

mod handlers;

use crate::config::SentinelConfig;
use crate::state::AppState;
use axum::routing::{get, post};
use axum::Router;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

pub fn create_router(state: AppState, config: &SentinelConfig) -> Router {
    let routes = Router::new()
        .route("/health", get(handlers::health))
        .route("/sentinelnet/check", post(handlers::policy_check))
        .route("/sentinelnet/policy", post(handlers::create_policy))
        .route(
            "/sentinelnet/policy/:id/:version/explain",
            post(handlers::explain_policy),
        )
        .route(
            "/sentinelnet/policy/:id/:version/transition",
            post(handlers::transition_policy),
        )
        .route("/kernel/audit", get(handlers::list_audit))
        .route("/memory/nodes", post(handlers::create_memory_node))
        .route("/memory/nodes/:id", get(handlers::get_memory_node))
        .route("/memory/nodes/:id/legal_hold", post(handlers::set_legal_hold))
        .route("/eval/submit", post(handlers::submit_eval))
        .route("/eval/roi", post(handlers::submit_roi))
        .route("/alloc/request", post(handlers::request_allocation))
        .route("/alloc/settle", post(handlers::settle_allocation))
        .route("/alloc/approve", post(handlers::approve_allocation))
        .route("/alloc/:id", get(handlers::get_allocation));

    let mut router = Router::new()
        .nest("/v1", routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(config.server.request_timeout_secs)));

    if config.server.enable_cors {
        router = router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }

    router.with_state(state)
}
