//! Store trait abstractions
//!
//! These traits define the persistence interface the filing services need, so the
//! services can be exercised with in-memory doubles and no database.

use async_trait::async_trait;
use taxsync_core::error::AppError;
use taxsync_core::models::{
    Document, EntityType, Filing, FilingStatusUpdate, FormType, NewFiling, NewNotification,
    NewWebhookEventLog, Notification, OAuthConnection, RotatedTokens, SyncedEntity,
    TaxpayerProfile, UpsertSyncedEntity,
};
use uuid::Uuid;

use crate::db::{
    DocumentRepository, FilingRepository, NotificationRepository, OAuthConnectionRepository,
    SyncedEntityRepository, TaxpayerProfileRepository, WebhookEventLogRepository,
};

#[async_trait]
pub trait FilingStore: Send + Sync {
    async fn insert_submitted(&self, filing: &NewFiling) -> Result<Filing, AppError>;

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Filing>, AppError>;

    /// A live (pending, submitted or accepted) filing for the same user, year and form
    async fn find_active(
        &self,
        user_id: Uuid,
        tax_year: i32,
        form_type: FormType,
    ) -> Result<Option<Filing>, AppError>;

    /// Filings in `pending`/`submitted` with a submission id, newest first
    async fn list_pollable(&self, form_type: FormType, limit: i64)
        -> Result<Vec<Filing>, AppError>;

    /// Conditional write; `false` when the expected status no longer holds
    async fn apply_status_update(&self, update: &FilingStatusUpdate) -> Result<bool, AppError>;
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn list_completed(&self, user_id: Uuid) -> Result<Vec<Document>, AppError>;
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get_profile(&self, user_id: Uuid) -> Result<Option<TaxpayerProfile>, AppError>;
}

#[async_trait]
pub trait ConnectionStore: Send + Sync {
    async fn get_by_tenant(&self, tenant_id: &str) -> Result<Option<OAuthConnection>, AppError>;

    /// Write both tokens and the expiry in one atomic update
    async fn update_tokens(&self, id: Uuid, tokens: &RotatedTokens) -> Result<(), AppError>;
}

#[async_trait]
pub trait SyncedEntityStore: Send + Sync {
    async fn upsert(&self, entity: &UpsertSyncedEntity) -> Result<SyncedEntity, AppError>;

    /// Returns `false` when the resource is unknown
    async fn soft_delete(
        &self,
        tenant_id: &str,
        entity_type: EntityType,
        resource_id: &str,
    ) -> Result<bool, AppError>;
}

#[async_trait]
pub trait WebhookEventStore: Send + Sync {
    async fn append(&self, entry: &NewWebhookEventLog) -> Result<(), AppError>;
}

#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn create(&self, notification: &NewNotification) -> Result<Notification, AppError>;
}

// Implementations for concrete repository types

#[async_trait]
impl FilingStore for FilingRepository {
    async fn insert_submitted(&self, filing: &NewFiling) -> Result<Filing, AppError> {
        self.insert_submitted(filing).await
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Filing>, AppError> {
        self.get_by_id(id).await
    }

    async fn find_active(
        &self,
        user_id: Uuid,
        tax_year: i32,
        form_type: FormType,
    ) -> Result<Option<Filing>, AppError> {
        self.find_active(user_id, tax_year, form_type).await
    }

    async fn list_pollable(
        &self,
        form_type: FormType,
        limit: i64,
    ) -> Result<Vec<Filing>, AppError> {
        self.list_pollable(form_type, limit).await
    }

    async fn apply_status_update(&self, update: &FilingStatusUpdate) -> Result<bool, AppError> {
        self.apply_status_update(update).await
    }
}

#[async_trait]
impl DocumentStore for DocumentRepository {
    async fn list_completed(&self, user_id: Uuid) -> Result<Vec<Document>, AppError> {
        self.list_completed(user_id).await
    }
}

#[async_trait]
impl ProfileStore for TaxpayerProfileRepository {
    async fn get_profile(&self, user_id: Uuid) -> Result<Option<TaxpayerProfile>, AppError> {
        self.get(user_id).await
    }
}

#[async_trait]
impl ConnectionStore for OAuthConnectionRepository {
    async fn get_by_tenant(&self, tenant_id: &str) -> Result<Option<OAuthConnection>, AppError> {
        self.get_by_tenant(tenant_id).await
    }

    async fn update_tokens(&self, id: Uuid, tokens: &RotatedTokens) -> Result<(), AppError> {
        self.update_tokens(id, tokens).await
    }
}

#[async_trait]
impl SyncedEntityStore for SyncedEntityRepository {
    async fn upsert(&self, entity: &UpsertSyncedEntity) -> Result<SyncedEntity, AppError> {
        self.upsert(entity).await
    }

    async fn soft_delete(
        &self,
        tenant_id: &str,
        entity_type: EntityType,
        resource_id: &str,
    ) -> Result<bool, AppError> {
        self.soft_delete(tenant_id, entity_type, resource_id).await
    }
}

#[async_trait]
impl WebhookEventStore for WebhookEventLogRepository {
    async fn append(&self, entry: &NewWebhookEventLog) -> Result<(), AppError> {
        self.append(entry).await
    }
}

#[async_trait]
impl NotificationStore for NotificationRepository {
    async fn create(&self, notification: &NewNotification) -> Result<Notification, AppError> {
        self.create(notification).await
    }
}
