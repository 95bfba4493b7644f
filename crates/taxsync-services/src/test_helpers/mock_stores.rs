//! In-memory store implementations for testing
//!
//! Each store mirrors the semantics of its SQL counterpart closely enough that the
//! services behave the same against either.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use taxsync_core::models::{
    Document, EntityType, Filing, FilingStatus, FilingStatusUpdate, FormType, NewFiling,
    NewNotification, NewWebhookEventLog, Notification, OAuthConnection, RotatedTokens,
    SyncedEntity, TaxpayerProfile, UpsertSyncedEntity,
};
use taxsync_core::AppError;
use taxsync_db::{
    ConnectionStore, DocumentStore, FilingStore, NotificationStore, ProfileStore,
    SyncedEntityStore, WebhookEventStore,
};
use uuid::Uuid;

#[derive(Clone, Default)]
pub struct InMemoryFilingStore {
    filings: Arc<Mutex<HashMap<Uuid, Filing>>>,
    updates_applied: Arc<Mutex<usize>>,
}

impl InMemoryFilingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_filing(&self, filing: Filing) {
        self.filings.lock().unwrap().insert(filing.id, filing);
    }

    pub fn get(&self, id: Uuid) -> Option<Filing> {
        self.filings.lock().unwrap().get(&id).cloned()
    }

    pub fn all(&self) -> Vec<Filing> {
        self.filings.lock().unwrap().values().cloned().collect()
    }

    /// Number of conditional writes that matched a row
    pub fn updates_applied(&self) -> usize {
        *self.updates_applied.lock().unwrap()
    }
}

#[async_trait]
impl FilingStore for InMemoryFilingStore {
    async fn insert_submitted(&self, new: &NewFiling) -> Result<Filing, AppError> {
        let mut filings = self.filings.lock().unwrap();
        if filings
            .values()
            .any(|f| f.submission_id.as_deref() == Some(new.submission_id.as_str()))
        {
            return Err(AppError::Conflict(format!(
                "submission id {} already recorded",
                new.submission_id
            )));
        }
        if filings.values().any(|f| {
            f.user_id == new.user_id
                && f.tax_year == new.tax_year
                && f.form_type == new.form_type
                && f.status.is_live()
        }) {
            return Err(AppError::Conflict(format!(
                "an active filing already exists for user {} in tax year {}",
                new.user_id, new.tax_year
            )));
        }

        let now = Utc::now();
        let filing = Filing {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            tax_year: new.tax_year,
            form_type: new.form_type,
            status: FilingStatus::Submitted,
            submission_id: Some(new.submission_id.clone()),
            provider_status: new.provider_status.clone(),
            total_income: new.total_income,
            total_wages: new.total_wages,
            total_withheld: new.total_withheld,
            total_deductions: new.total_deductions,
            tax_liability: new.tax_liability,
            refund_or_owed: new.refund_or_owed,
            refund_amount: None,
            rejection_reasons: None,
            submitted_at: Some(now),
            accepted_at: None,
            rejected_at: None,
            created_at: now,
            updated_at: now,
        };
        filings.insert(filing.id, filing.clone());
        Ok(filing)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Filing>, AppError> {
        Ok(self.get(id))
    }

    async fn find_active(
        &self,
        user_id: Uuid,
        tax_year: i32,
        form_type: FormType,
    ) -> Result<Option<Filing>, AppError> {
        Ok(self
            .filings
            .lock()
            .unwrap()
            .values()
            .find(|f| {
                f.user_id == user_id
                    && f.tax_year == tax_year
                    && f.form_type == form_type
                    && f.status.is_live()
            })
            .cloned())
    }

    async fn list_pollable(
        &self,
        form_type: FormType,
        limit: i64,
    ) -> Result<Vec<Filing>, AppError> {
        let mut pollable: Vec<Filing> = self
            .filings
            .lock()
            .unwrap()
            .values()
            .filter(|f| {
                f.form_type == form_type
                    && matches!(f.status, FilingStatus::Pending | FilingStatus::Submitted)
                    && f.submission_id.is_some()
            })
            .cloned()
            .collect();
        pollable.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        pollable.truncate(limit.max(0) as usize);
        Ok(pollable)
    }

    async fn apply_status_update(&self, update: &FilingStatusUpdate) -> Result<bool, AppError> {
        let mut filings = self.filings.lock().unwrap();
        let Some(filing) = filings.get_mut(&update.filing_id) else {
            return Ok(false);
        };
        if filing.status != update.expected_status {
            return Ok(false);
        }

        let now = Utc::now();
        filing.status = update.new_status;
        filing.provider_status = Some(update.provider_status.clone());
        if let Some(reasons) = &update.rejection_reasons {
            filing.rejection_reasons = Some(reasons.clone());
        }
        match update.new_status {
            FilingStatus::Accepted => {
                if filing.refund_amount.is_none() {
                    filing.refund_amount = update.refund_estimate;
                }
                filing.accepted_at.get_or_insert(now);
            }
            FilingStatus::Rejected => {
                filing.rejected_at.get_or_insert(now);
            }
            _ => {}
        }
        filing.updated_at = now;
        *self.updates_applied.lock().unwrap() += 1;
        Ok(true)
    }
}

#[derive(Clone, Default)]
pub struct InMemoryDocumentStore {
    documents: Arc<Mutex<Vec<Document>>>,
    reads: Arc<Mutex<usize>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_document(&self, document: Document) {
        self.documents.lock().unwrap().push(document);
    }

    pub fn reads(&self) -> usize {
        *self.reads.lock().unwrap()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn list_completed(&self, user_id: Uuid) -> Result<Vec<Document>, AppError> {
        *self.reads.lock().unwrap() += 1;
        Ok(self
            .documents
            .lock()
            .unwrap()
            .iter()
            .filter(|d| d.user_id == user_id && d.is_completed())
            .cloned()
            .collect())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryProfileStore {
    profiles: Arc<Mutex<HashMap<Uuid, TaxpayerProfile>>>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_profile(&self, profile: TaxpayerProfile) {
        self.profiles.lock().unwrap().insert(profile.user_id, profile);
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn get_profile(&self, user_id: Uuid) -> Result<Option<TaxpayerProfile>, AppError> {
        Ok(self.profiles.lock().unwrap().get(&user_id).cloned())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryConnectionStore {
    connections: Arc<Mutex<HashMap<String, OAuthConnection>>>,
    token_writes: Arc<Mutex<usize>>,
}

impl InMemoryConnectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_connection(&self, connection: OAuthConnection) {
        self.connections
            .lock()
            .unwrap()
            .insert(connection.tenant_id.clone(), connection);
    }

    pub fn get(&self, tenant_id: &str) -> Option<OAuthConnection> {
        self.connections.lock().unwrap().get(tenant_id).cloned()
    }

    pub fn token_writes(&self) -> usize {
        *self.token_writes.lock().unwrap()
    }
}

#[async_trait]
impl ConnectionStore for InMemoryConnectionStore {
    async fn get_by_tenant(&self, tenant_id: &str) -> Result<Option<OAuthConnection>, AppError> {
        Ok(self.get(tenant_id))
    }

    async fn update_tokens(&self, id: Uuid, tokens: &RotatedTokens) -> Result<(), AppError> {
        let mut connections = self.connections.lock().unwrap();
        let connection = connections
            .values_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| AppError::NotFound(format!("OAuth connection {} not found", id)))?;
        connection.access_token_encrypted = tokens.access_token_encrypted.clone();
        connection.refresh_token_encrypted = tokens.refresh_token_encrypted.clone();
        connection.expires_at = tokens.expires_at;
        connection.updated_at = Utc::now();
        *self.token_writes.lock().unwrap() += 1;
        Ok(())
    }
}

type EntityKey = (String, EntityType, String);

#[derive(Clone, Default)]
pub struct InMemorySyncedEntityStore {
    entities: Arc<Mutex<HashMap<EntityKey, SyncedEntity>>>,
}

impl InMemorySyncedEntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(
        &self,
        tenant_id: &str,
        entity_type: EntityType,
        resource_id: &str,
    ) -> Option<SyncedEntity> {
        self.entities
            .lock()
            .unwrap()
            .get(&(tenant_id.to_string(), entity_type, resource_id.to_string()))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.entities.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SyncedEntityStore for InMemorySyncedEntityStore {
    async fn upsert(&self, entity: &UpsertSyncedEntity) -> Result<SyncedEntity, AppError> {
        let key = (
            entity.tenant_id.clone(),
            entity.entity_type,
            entity.resource_id.clone(),
        );
        let mut entities = self.entities.lock().unwrap();
        let id = entities.get(&key).map(|e| e.id).unwrap_or_else(Uuid::new_v4);
        let row = SyncedEntity {
            id,
            tenant_id: entity.tenant_id.clone(),
            user_id: entity.user_id,
            entity_type: entity.entity_type,
            resource_id: entity.resource_id.clone(),
            data: entity.data.clone(),
            synced_at: Utc::now(),
            deleted_at: None,
        };
        entities.insert(key, row.clone());
        Ok(row)
    }

    async fn soft_delete(
        &self,
        tenant_id: &str,
        entity_type: EntityType,
        resource_id: &str,
    ) -> Result<bool, AppError> {
        let mut entities = self.entities.lock().unwrap();
        match entities.get_mut(&(tenant_id.to_string(), entity_type, resource_id.to_string())) {
            Some(entity) => {
                entity.deleted_at.get_or_insert(Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[derive(Clone, Default)]
pub struct InMemoryWebhookEventStore {
    entries: Arc<Mutex<Vec<NewWebhookEventLog>>>,
}

impl InMemoryWebhookEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<NewWebhookEventLog> {
        self.entries.lock().unwrap().clone()
    }
}

#[async_trait]
impl WebhookEventStore for InMemoryWebhookEventStore {
    async fn append(&self, entry: &NewWebhookEventLog) -> Result<(), AppError> {
        self.entries.lock().unwrap().push(entry.clone());
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryNotificationStore {
    notifications: Arc<Mutex<Vec<Notification>>>,
    fail: Arc<Mutex<bool>>,
}

impl InMemoryNotificationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `create` fail
    pub fn fail_writes(&self) {
        *self.fail.lock().unwrap() = true;
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationStore for InMemoryNotificationStore {
    async fn create(&self, notification: &NewNotification) -> Result<Notification, AppError> {
        if *self.fail.lock().unwrap() {
            return Err(AppError::Internal("notification store unavailable".to_string()));
        }
        let row = Notification {
            id: Uuid::new_v4(),
            user_id: notification.user_id,
            kind: notification.kind,
            title: notification.title.clone(),
            body: notification.body.clone(),
            filing_id: notification.filing_id,
            created_at: Utc::now(),
            read_at: None,
        };
        self.notifications.lock().unwrap().push(row.clone());
        Ok(row)
    }
}
