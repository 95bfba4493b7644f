use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt::{Display, Formatter, Result as FmtResult};
use uuid::Uuid;

#[cfg(feature = "sqlx")]
use sqlx::FromRow;

use super::EntityType;

pub const ACCOUNTING_PROVIDER: &str = "accounting";

/// Delivery body pushed by the accounting provider
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountingWebhookPayload {
    #[serde(default)]
    pub events: Vec<AccountingWebhookEvent>,
    #[serde(default)]
    pub first_event_sequence: Option<i64>,
    #[serde(default)]
    pub last_event_sequence: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountingWebhookEvent {
    pub event_category: String,
    pub event_type: String,
    #[serde(default)]
    pub event_date_utc: Option<String>,
    pub resource_id: String,
    pub tenant_id: String,
    #[serde(default)]
    pub resource_url: Option<String>,
}

/// What the ingestor does with one event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookAction {
    Upsert(EntityType),
    SoftDelete(EntityType),
    Unsupported,
}

impl AccountingWebhookEvent {
    pub fn entity_type(&self) -> Option<EntityType> {
        match self.event_category.trim().to_uppercase().as_str() {
            "INVOICE" => Some(EntityType::Invoice),
            "CONTACT" => Some(EntityType::Contact),
            _ => None,
        }
    }

    pub fn action(&self) -> WebhookAction {
        let Some(entity_type) = self.entity_type() else {
            return WebhookAction::Unsupported;
        };
        match self.event_type.trim().to_uppercase().as_str() {
            "DELETE" => WebhookAction::SoftDelete(entity_type),
            _ => WebhookAction::Upsert(entity_type),
        }
    }
}

/// Outcome recorded for each inbound event
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "webhook_event_outcome", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum WebhookEventOutcome {
    Processed,
    Skipped,
    Failed,
}

impl Display for WebhookEventOutcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            WebhookEventOutcome::Processed => write!(f, "processed"),
            WebhookEventOutcome::Skipped => write!(f, "skipped"),
            WebhookEventOutcome::Failed => write!(f, "failed"),
        }
    }
}

/// Append-only audit entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
pub struct WebhookEventLog {
    pub id: Uuid,
    pub provider: String,
    pub event_category: String,
    pub event_type: String,
    pub tenant_id: String,
    pub resource_id: String,
    pub payload: JsonValue,
    pub outcome: WebhookEventOutcome,
    pub error_message: Option<String>,
    pub processed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewWebhookEventLog {
    pub provider: String,
    pub event_category: String,
    pub event_type: String,
    pub tenant_id: String,
    pub resource_id: String,
    pub payload: JsonValue,
    pub outcome: WebhookEventOutcome,
    pub error_message: Option<String>,
}

impl NewWebhookEventLog {
    pub fn for_event(
        event: &AccountingWebhookEvent,
        outcome: WebhookEventOutcome,
        error_message: Option<String>,
    ) -> Self {
        Self {
            provider: ACCOUNTING_PROVIDER.to_string(),
            event_category: event.event_category.clone(),
            event_type: event.event_type.clone(),
            tenant_id: event.tenant_id.clone(),
            resource_id: event.resource_id.clone(),
            payload: serde_json::to_value(event).unwrap_or(JsonValue::Null),
            outcome,
            error_message,
        }
    }
}
