//! Filing submission, lookup and the manual status sweep

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use std::sync::Arc;
use taxsync_core::models::SubmitFilingRequest;
use taxsync_core::AppError;
use uuid::Uuid;
use validator::Validate;

use crate::error::HttpAppError;
use crate::state::AppState;

/// Aggregate the user's documents and submit the return
#[tracing::instrument(skip(state, request))]
pub async fn submit_filing(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SubmitFilingRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    request.validate()?;

    let filing = state
        .submitter
        .submit(request.user_id, request.tax_year)
        .await?;

    Ok((StatusCode::CREATED, Json(filing)))
}

#[tracing::instrument(skip(state))]
pub async fn get_filing(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let filing = state
        .filings
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Filing {} not found", id)))?;

    Ok(Json(filing))
}

/// Run one status sweep now and return its report
#[tracing::instrument(skip(state))]
pub async fn trigger_status_sweep(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.poller.sweep().await)
}
