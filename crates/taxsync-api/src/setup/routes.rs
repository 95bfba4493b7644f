//! Route configuration and setup

use crate::auth::{auth_middleware, AuthState};
use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use taxsync_core::Config;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

pub const API_PREFIX: &str = "/api/v1";

/// Filing requests and provider webhooks are small JSON documents
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router<()>, anyhow::Error> {
    let protected = match &config.server.service_api_key {
        Some(key) => protected_routes().route_layer(axum::middleware::from_fn_with_state(
            Arc::new(AuthState {
                service_api_key: key.clone(),
            }),
            auth_middleware,
        )),
        None => {
            tracing::warn!("SERVICE_API_KEY not set, filing endpoints are unauthenticated");
            protected_routes()
        }
    };

    let http_concurrency_limit = config.server.http_concurrency_limit;
    tracing::info!(
        http_concurrency_limit = http_concurrency_limit,
        "HTTP concurrency limit layer enabled"
    );

    let app = public_routes()
        .merge(protected)
        .with_state(state)
        .layer(ConcurrencyLimitLayer::new(http_concurrency_limit))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http());

    Ok(app)
}

/// Public routes (no service key; webhooks authenticate by signature)
fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route(
            "/webhooks/accounting",
            post(handlers::webhooks::accounting_webhook),
        )
}

fn protected_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            &format!("{}/filings", API_PREFIX),
            post(handlers::filings::submit_filing),
        )
        .route(
            &format!("{}/filings/status-sweep", API_PREFIX),
            post(handlers::filings::trigger_status_sweep),
        )
        .route(
            &format!("{}/filings/{{id}}", API_PREFIX),
            get(handlers::filings::get_filing),
        )
}
