//! Outbound provider integrations.
//!
//! Each provider is reached through a trait so the services can be driven by the
//! HTTP clients in production and by in-memory doubles in tests.

pub mod accounting;
pub mod efile;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use taxsync_core::models::{AccessToken, EntityType, FormType};
use taxsync_core::AppError;

pub use accounting::{AccountingClient, TokenGrant, TENANT_HEADER};
pub use efile::{
    EfileClient, EfileSubmission, Form1040Data, ReturnData, ReturnHeader, ReturnPayload,
    StatusRecord,
};

/// Tax e-file provider
#[async_trait]
pub trait EfileProvider: Send + Sync {
    /// Create a Form 1040 return. Returns the provider's submission id.
    async fn create_filing(&self, payload: &ReturnPayload) -> Result<EfileSubmission, AppError>;

    /// Status records for a submission, newest first as the provider returns them
    async fn fetch_status(
        &self,
        form_type: FormType,
        submission_id: &str,
    ) -> Result<Vec<StatusRecord>, AppError>;
}

/// Accounting platform provider (OAuth token endpoint + resource API)
#[async_trait]
pub trait AccountingProvider: Send + Sync {
    /// Exchange a refresh token. A rejected exchange is `TokenRefreshFailed`.
    async fn refresh_token(&self, tenant_id: &str, refresh_token: &str)
        -> Result<TokenGrant, AppError>;

    /// Full resource JSON, `None` when the provider no longer has it
    async fn fetch_resource(
        &self,
        access_token: &AccessToken,
        tenant_id: &str,
        entity_type: EntityType,
        resource_id: &str,
    ) -> Result<Option<JsonValue>, AppError>;
}

pub(crate) fn transport_error(err: reqwest::Error) -> AppError {
    if err.is_timeout() {
        AppError::Transport(format!("request timed out: {}", err))
    } else {
        AppError::Transport(err.to_string())
    }
}
