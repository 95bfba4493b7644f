use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Json},
};
use std::sync::Arc;
use taxsync_services::SIGNATURE_HEADER;

use crate::error::HttpAppError;
use crate::state::AppState;

/// Accounting provider webhook receiver. The raw body is needed for signature
/// verification, so it is taken as bytes and parsed by the ingestor.
#[tracing::instrument(skip(state, headers, body), fields(body_len = body.len()))]
pub async fn accounting_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, HttpAppError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    let report = state.ingestor.ingest(&body, signature).await?;

    Ok(Json(report))
}
