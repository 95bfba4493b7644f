//! Taxsync Infrastructure Library
//!
//! Shared infrastructure used by the API and the CLI:
//! - Telemetry initialization (tracing-subscriber)
//! - HMAC request signing and webhook signature verification
//! - Outbound HTTP client construction
//! - HTTP error response body

pub mod error;
pub mod http;
pub mod signing;
pub mod telemetry;

pub use error::ErrorResponse;
pub use http::build_http_client;
pub use signing::{sign_status_request, sign_webhook_body, verify_webhook_signature};
pub use telemetry::{init_telemetry, shutdown_telemetry, LogFormat};
