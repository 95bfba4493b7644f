//! Database repositories
//!
//! Filing records and connections are owned by this service; documents and taxpayer
//! profiles are read-only views over tables written elsewhere.

pub mod connection;
pub mod document;
pub mod filing;
pub mod notification;
pub mod synced_entity;
pub mod webhook_event;

pub use connection::OAuthConnectionRepository;
pub use document::{DocumentRepository, TaxpayerProfileRepository};
pub use filing::FilingRepository;
pub use notification::NotificationRepository;
pub use synced_entity::SyncedEntityRepository;
pub use webhook_event::WebhookEventLogRepository;
