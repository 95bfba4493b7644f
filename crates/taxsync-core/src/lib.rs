//! Taxsync Core Library
//!
//! This crate provides the domain models, error types, configuration and the
//! liability calculator shared across all taxsync components.

pub mod config;
pub mod encryption;
pub mod error;
pub mod liability;
pub mod models;
pub mod money;

// Re-export commonly used types
pub use config::{AccountingConfig, Config, EfileAuthMode, EfileConfig, PollerConfig, ServerConfig};
pub use encryption::EncryptionService;
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use liability::{compute_liability, estimate_refund, BracketSchedule, STANDARD_DEDUCTION};
pub use money::Amount;
