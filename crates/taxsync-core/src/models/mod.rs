//! Data models for the filing pipeline
//!
//! Each sub-module represents one persisted entity or inbound payload.

mod connection;
mod document;
mod filing;
mod notification;
mod profile;
mod synced_entity;
mod webhook_event;

pub use connection::*;
pub use document::*;
pub use filing::*;
pub use notification::*;
pub use profile::*;
pub use synced_entity::*;
pub use webhook_event::*;
