//! Accounting webhook ingestion.
//!
//! A delivery is authenticated against the raw body before it is parsed. Events
//! are then processed one at a time in delivery order, and every event lands in
//! the webhook event log whatever its outcome.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use taxsync_core::models::{
    AccountingWebhookEvent, AccountingWebhookPayload, NewWebhookEventLog, UpsertSyncedEntity,
    WebhookAction, WebhookEventOutcome,
};
use taxsync_core::AppError;
use taxsync_db::{ConnectionStore, SyncedEntityStore, WebhookEventStore};
use taxsync_infra::verify_webhook_signature;

use crate::providers::AccountingProvider;
use crate::tokens::TokenLifecycleManager;

/// Header carrying the body signature
pub const SIGNATURE_HEADER: &str = "x-provider-signature";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub received: usize,
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl IngestReport {
    fn record(&mut self, outcome: WebhookEventOutcome) {
        match outcome {
            WebhookEventOutcome::Processed => self.processed += 1,
            WebhookEventOutcome::Skipped => self.skipped += 1,
            WebhookEventOutcome::Failed => self.failed += 1,
        }
    }
}

enum EventResult {
    Processed,
    Skipped(String),
}

#[derive(Clone)]
pub struct WebhookIngestor {
    webhook_key: Option<String>,
    connections: Arc<dyn ConnectionStore>,
    tokens: Arc<TokenLifecycleManager>,
    provider: Arc<dyn AccountingProvider>,
    entities: Arc<dyn SyncedEntityStore>,
    events: Arc<dyn WebhookEventStore>,
}

impl WebhookIngestor {
    pub fn new(
        webhook_key: Option<String>,
        connections: Arc<dyn ConnectionStore>,
        tokens: Arc<TokenLifecycleManager>,
        provider: Arc<dyn AccountingProvider>,
        entities: Arc<dyn SyncedEntityStore>,
        events: Arc<dyn WebhookEventStore>,
    ) -> Self {
        if webhook_key.is_none() {
            tracing::warn!("ACCOUNTING_WEBHOOK_KEY not set, webhook signatures will not be verified");
        }
        Self {
            webhook_key,
            connections,
            tokens,
            provider,
            entities,
            events,
        }
    }

    fn verify(&self, body: &[u8], signature: Option<&str>) -> Result<(), AppError> {
        let Some(key) = self.webhook_key.as_deref() else {
            return Ok(());
        };
        match signature {
            Some(signature) if verify_webhook_signature(key, body, signature) => Ok(()),
            Some(_) => {
                tracing::warn!(body_len = body.len(), "Rejected webhook with invalid signature");
                Err(AppError::InvalidSignature)
            }
            None => {
                tracing::warn!(body_len = body.len(), "Rejected webhook without signature");
                Err(AppError::InvalidSignature)
            }
        }
    }

    /// Authenticate, parse and process one delivery.
    #[tracing::instrument(skip(self, body, signature), fields(body_len = body.len()))]
    pub async fn ingest(&self, body: &[u8], signature: Option<&str>) -> Result<IngestReport, AppError> {
        self.verify(body, signature)?;

        let payload: AccountingWebhookPayload = serde_json::from_slice(body)
            .map_err(|e| AppError::InvalidInput(format!("malformed webhook payload: {}", e)))?;

        let mut report = IngestReport {
            received: payload.events.len(),
            ..IngestReport::default()
        };
        // Tenants whose token or transport failed earlier in this delivery
        let mut failed_tenants: HashMap<String, String> = HashMap::new();

        for event in &payload.events {
            let (outcome, error_message) = match failed_tenants.get(&event.tenant_id) {
                Some(reason) => (WebhookEventOutcome::Failed, Some(reason.clone())),
                None => match self.process_event(event).await {
                    Ok(EventResult::Processed) => (WebhookEventOutcome::Processed, None),
                    Ok(EventResult::Skipped(reason)) => (WebhookEventOutcome::Skipped, Some(reason)),
                    Err(e) => {
                        tracing::error!(
                            tenant_id = %event.tenant_id,
                            resource_id = %event.resource_id,
                            event_type = %event.event_type,
                            error = %e,
                            "Webhook event failed"
                        );
                        if matches!(
                            e,
                            AppError::TokenRefreshFailed { .. } | AppError::Transport(_)
                        ) {
                            failed_tenants.insert(event.tenant_id.clone(), e.to_string());
                        }
                        (WebhookEventOutcome::Failed, Some(e.to_string()))
                    }
                },
            };

            report.record(outcome);
            let entry = NewWebhookEventLog::for_event(event, outcome, error_message);
            if let Err(e) = self.events.append(&entry).await {
                tracing::error!(
                    tenant_id = %event.tenant_id,
                    resource_id = %event.resource_id,
                    error = %e,
                    "Failed to append webhook event log"
                );
            }
        }

        tracing::info!(
            received = report.received,
            processed = report.processed,
            skipped = report.skipped,
            failed = report.failed,
            "Webhook delivery ingested"
        );

        Ok(report)
    }

    async fn process_event(&self, event: &AccountingWebhookEvent) -> Result<EventResult, AppError> {
        let action = event.action();
        if action == WebhookAction::Unsupported {
            tracing::debug!(
                event_category = %event.event_category,
                "Skipping unsupported webhook category"
            );
            return Ok(EventResult::Skipped(format!(
                "unsupported event category {}",
                event.event_category
            )));
        }

        let Some(connection) = self.connections.get_by_tenant(&event.tenant_id).await? else {
            tracing::warn!(tenant_id = %event.tenant_id, "Webhook for unknown tenant");
            return Ok(EventResult::Skipped("unknown tenant".to_string()));
        };

        match action {
            WebhookAction::SoftDelete(entity_type) => {
                let deleted = self
                    .entities
                    .soft_delete(&event.tenant_id, entity_type, &event.resource_id)
                    .await?;
                if deleted {
                    Ok(EventResult::Processed)
                } else {
                    Ok(EventResult::Skipped(format!("unknown {}", entity_type)))
                }
            }
            WebhookAction::Upsert(entity_type) => {
                let token = self.tokens.access_token(&connection).await?;
                let resource = self
                    .provider
                    .fetch_resource(&token, &event.tenant_id, entity_type, &event.resource_id)
                    .await?;

                let Some(data) = resource else {
                    return Ok(EventResult::Skipped(format!(
                        "{} not found at provider",
                        entity_type
                    )));
                };

                self.entities
                    .upsert(&UpsertSyncedEntity {
                        tenant_id: event.tenant_id.clone(),
                        user_id: connection.user_id,
                        entity_type,
                        resource_id: event.resource_id.clone(),
                        data,
                    })
                    .await?;
                Ok(EventResult::Processed)
            }
            WebhookAction::Unsupported => Ok(EventResult::Skipped(format!(
                "unsupported event category {}",
                event.event_category
            ))),
        }
    }
}
