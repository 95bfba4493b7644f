//! Service-key authentication for the internal API

use crate::error::HttpAppError;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use subtle::ConstantTimeEq;
use taxsync_core::AppError;

pub const API_KEY_HEADER: &str = "x-api-key";

#[derive(Clone)]
pub struct AuthState {
    pub service_api_key: String,
}

/// Constant-time comparison of two strings to prevent timing attacks on API key validation.
fn secure_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Reject requests whose `X-Api-Key` does not match the configured service key
pub async fn auth_middleware(
    State(auth_state): State<Arc<AuthState>>,
    request: Request,
    next: Next,
) -> Response {
    let provided = match request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|h| h.to_str().ok())
    {
        Some(key) => key,
        None => {
            tracing::debug!(path = %request.uri().path(), "Missing API key");
            return HttpAppError(AppError::Unauthorized("Missing API key".to_string()))
                .into_response();
        }
    };

    if !secure_compare(provided, &auth_state.service_api_key) {
        tracing::warn!(path = %request.uri().path(), "Rejected request with invalid API key");
        return HttpAppError(AppError::Unauthorized("Invalid API key".to_string()))
            .into_response();
    }

    next.run(request).await
}
