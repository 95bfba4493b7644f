//! Taxsync Database Layer
//!
//! Postgres repositories for filings, the document and profile read models, OAuth
//! connections, synced provider entities, the webhook audit log and notifications,
//! plus the store traits the services are written against.

pub mod db;
pub mod store;

pub use db::{
    DocumentRepository, FilingRepository, NotificationRepository, OAuthConnectionRepository,
    SyncedEntityRepository, TaxpayerProfileRepository, WebhookEventLogRepository,
};

pub use store::{
    ConnectionStore, DocumentStore, FilingStore, NotificationStore, ProfileStore,
    SyncedEntityStore, WebhookEventStore,
};
