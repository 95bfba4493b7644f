//! HTTP client for the accounting platform: OAuth token endpoint and resource API.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use taxsync_core::models::{AccessToken, EntityType};
use taxsync_core::{AccountingConfig, AppError};
use taxsync_infra::build_http_client;

use super::{transport_error, AccountingProvider};

/// Header naming the tenant a resource request is made for
pub const TENANT_HEADER: &str = "provider-tenant-id";

/// Token endpoint response
#[derive(Clone, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub expires_in: i64,
}

impl std::fmt::Debug for TokenGrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenGrant")
            .field("expires_in", &self.expires_in)
            .field("rotated_refresh_token", &self.refresh_token.is_some())
            .finish_non_exhaustive()
    }
}

#[derive(Clone)]
pub struct AccountingClient {
    config: AccountingConfig,
    client: reqwest::Client,
}

impl AccountingClient {
    pub fn new(config: AccountingConfig) -> Result<Self, AppError> {
        let client = build_http_client(config.timeout_seconds)
            .map_err(|e| AppError::Configuration(format!("accounting HTTP client: {}", e)))?;
        Ok(Self { config, client })
    }

    fn client_credentials(&self) -> Result<(&str, &str), AppError> {
        match (
            self.config.client_id.as_deref(),
            self.config.client_secret.as_deref(),
        ) {
            (Some(id), Some(secret)) => Ok((id, secret)),
            _ => Err(AppError::Configuration(
                "ACCOUNTING_CLIENT_ID and ACCOUNTING_CLIENT_SECRET must be set".to_string(),
            )),
        }
    }
}

#[async_trait]
impl AccountingProvider for AccountingClient {
    #[tracing::instrument(skip(self, refresh_token))]
    async fn refresh_token(
        &self,
        tenant_id: &str,
        refresh_token: &str,
    ) -> Result<TokenGrant, AppError> {
        let (client_id, client_secret) = self.client_credentials()?;

        let response = self
            .client
            .post(&self.config.token_url)
            .basic_auth(client_id, Some(client_secret))
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::TokenRefreshFailed {
                tenant_id: tenant_id.to_string(),
                message: format!("token endpoint returned {}: {}", status, body),
            });
        }

        response
            .json::<TokenGrant>()
            .await
            .map_err(|e| AppError::TokenRefreshFailed {
                tenant_id: tenant_id.to_string(),
                message: format!("unreadable token response: {}", e),
            })
    }

    #[tracing::instrument(skip(self, access_token), fields(entity_type = %entity_type))]
    async fn fetch_resource(
        &self,
        access_token: &AccessToken,
        tenant_id: &str,
        entity_type: EntityType,
        resource_id: &str,
    ) -> Result<Option<JsonValue>, AppError> {
        let url = format!(
            "{}/{}/{}",
            self.config.api_base_url.trim_end_matches('/'),
            entity_type.collection(),
            resource_id
        );

        let response = self
            .client
            .get(url)
            .bearer_auth(access_token.secret())
            .header(TENANT_HEADER, tenant_id)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Transport(format!(
                "resource endpoint returned {}: {}",
                status, body
            )));
        }

        let envelope: JsonValue = response
            .json()
            .await
            .map_err(|e| AppError::Transport(format!("unreadable resource response: {}", e)))?;

        Ok(envelope
            .get(entity_type.collection())
            .and_then(JsonValue::as_array)
            .and_then(|items| items.first())
            .cloned())
    }
}
