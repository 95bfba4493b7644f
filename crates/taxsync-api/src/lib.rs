//! Taxsync API Library
//!
//! This crate provides the HTTP handlers, service-key middleware and application
//! setup for the filing service.

mod handlers;

// Public modules
pub mod auth;
pub mod error;
pub mod setup;
pub mod state;

// Re-exports
pub use error::HttpAppError;
pub use state::AppState;
