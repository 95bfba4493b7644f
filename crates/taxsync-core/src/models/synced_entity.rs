use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt::{Display, Formatter, Result as FmtResult};
use uuid::Uuid;

#[cfg(feature = "sqlx")]
use sqlx::FromRow;

/// Business objects mirrored from the accounting provider
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "synced_entity_type", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Invoice,
    Contact,
}

impl EntityType {
    /// Collection name in the provider's REST API and response envelope
    pub fn collection(self) -> &'static str {
        match self {
            EntityType::Invoice => "Invoices",
            EntityType::Contact => "Contacts",
        }
    }
}

impl Display for EntityType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            EntityType::Invoice => write!(f, "invoice"),
            EntityType::Contact => write!(f, "contact"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
pub struct SyncedEntity {
    pub id: Uuid,
    pub tenant_id: String,
    pub user_id: Uuid,
    pub entity_type: EntityType,
    pub resource_id: String,
    pub data: JsonValue,
    pub synced_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Upsert payload keyed by (tenant_id, entity_type, resource_id)
#[derive(Debug, Clone, PartialEq)]
pub struct UpsertSyncedEntity {
    pub tenant_id: String,
    pub user_id: Uuid,
    pub entity_type: EntityType,
    pub resource_id: String,
    pub data: JsonValue,
}
