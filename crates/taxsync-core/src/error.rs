//! Error types module
//!
//! All failures in the filing pipeline are unified under the `AppError` enum. Each
//! variant self-describes how it is presented over HTTP and logged through the
//! `ErrorMetadata` trait.
//!
//! The `Database` variant and `From<sqlx::Error>` are gated behind the `sqlx` feature.

use std::io;

#[cfg(feature = "sqlx")]
use sqlx::Error as SqlxError;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues like provider rejections
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "DATABASE_ERROR")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (a later attempt may succeed)
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the client
    fn suggested_action(&self) -> Option<&'static str>;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden in production
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[source] SqlxError),

    #[cfg(not(feature = "sqlx"))]
    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("No eligible documents for user {user_id} in tax year {tax_year}")]
    NoEligibleDocuments { user_id: uuid::Uuid, tax_year: i32 },

    #[error("Provider rejected submission ({status}): {message}")]
    ProviderSubmissionFailed { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid webhook signature")]
    InvalidSignature,

    #[error("Token refresh failed for tenant {tenant_id}: {message}")]
    TokenRefreshFailed { tenant_id: String, message: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid document data: {0}")]
    InvalidDocumentData(String),

    #[error("Unsupported tax year: {0}")]
    UnsupportedTaxYear(i32),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

#[cfg(feature = "sqlx")]
impl From<SqlxError> for AppError {
    fn from(err: SqlxError) -> Self {
        AppError::Database(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

impl From<uuid::Error> for AppError {
    fn from(err: uuid::Error) -> Self {
        AppError::InvalidInput(format!("UUID parsing error: {}", err))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::InvalidInput(format!("Validation error: {}", err))
    }
}

/// Static metadata for each variant: (http_status, error_code, recoverable, suggested_action, sensitive, log_level).
fn app_error_static_metadata(
    err: &AppError,
) -> (
    u16,
    &'static str,
    bool,
    Option<&'static str>,
    bool,
    LogLevel,
) {
    match err {
        AppError::Database(_) => (
            500,
            "DATABASE_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::Configuration(_) => (
            500,
            "CONFIGURATION_ERROR",
            false,
            Some("Contact the operator; provider credentials are missing"),
            true,
            LogLevel::Error,
        ),
        AppError::NoEligibleDocuments { .. } => (
            422,
            "NO_ELIGIBLE_DOCUMENTS",
            false,
            Some("Upload and process tax documents before filing"),
            false,
            LogLevel::Debug,
        ),
        AppError::ProviderSubmissionFailed { .. } => (
            502,
            "PROVIDER_SUBMISSION_FAILED",
            false,
            Some("Review the provider message and correct the return"),
            false,
            LogLevel::Warn,
        ),
        AppError::Transport(_) => (
            503,
            "TRANSPORT_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Warn,
        ),
        AppError::InvalidSignature => (
            401,
            "INVALID_SIGNATURE",
            false,
            Some("Check the webhook signing key"),
            false,
            LogLevel::Warn,
        ),
        AppError::TokenRefreshFailed { .. } => (
            502,
            "TOKEN_REFRESH_FAILED",
            false,
            Some("Reconnect the accounting provider"),
            true,
            LogLevel::Warn,
        ),
        AppError::InvalidInput(_) => (
            400,
            "INVALID_INPUT",
            false,
            Some("Check request parameters and try again"),
            false,
            LogLevel::Debug,
        ),
        AppError::InvalidDocumentData(_) => (
            422,
            "INVALID_DOCUMENT_DATA",
            false,
            Some("Reprocess the affected document"),
            false,
            LogLevel::Warn,
        ),
        AppError::UnsupportedTaxYear(_) => (
            422,
            "UNSUPPORTED_TAX_YEAR",
            false,
            Some("File for a supported tax year"),
            false,
            LogLevel::Debug,
        ),
        AppError::NotFound(_) => (
            404,
            "NOT_FOUND",
            false,
            Some("Verify the resource ID exists"),
            false,
            LogLevel::Debug,
        ),
        AppError::Conflict(_) => (
            409,
            "CONFLICT",
            false,
            Some("A filing for this tax year is already in progress"),
            false,
            LogLevel::Debug,
        ),
        AppError::Unauthorized(_) => (
            401,
            "UNAUTHORIZED",
            false,
            Some("Check API key"),
            false,
            LogLevel::Debug,
        ),
        AppError::Internal(_) => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::InternalWithSource { .. } => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
    }
}

impl AppError {
    /// Get the error type name for detailed error responses
    pub fn error_type(&self) -> &str {
        match self {
            AppError::Database(_) => "Database",
            AppError::Configuration(_) => "ConfigurationError",
            AppError::NoEligibleDocuments { .. } => "NoEligibleDocuments",
            AppError::ProviderSubmissionFailed { .. } => "ProviderSubmissionFailed",
            AppError::Transport(_) => "TransportError",
            AppError::InvalidSignature => "InvalidSignature",
            AppError::TokenRefreshFailed { .. } => "TokenRefreshFailed",
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::InvalidDocumentData(_) => "InvalidDocumentData",
            AppError::UnsupportedTaxYear(_) => "UnsupportedTaxYear",
            AppError::NotFound(_) => "NotFound",
            AppError::Conflict(_) => "Conflict",
            AppError::Unauthorized(_) => "Unauthorized",
            AppError::Internal(_) => "Internal",
            AppError::InternalWithSource { .. } => "Internal",
        }
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_static_metadata(self).3
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).4
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).5
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Database(_) => "Failed to access database".to_string(),
            AppError::Configuration(_) => "Service is not configured".to_string(),
            AppError::NoEligibleDocuments { tax_year, .. } => format!(
                "No completed tax documents found for tax year {}",
                tax_year
            ),
            AppError::ProviderSubmissionFailed { message, .. } => {
                format!("E-file provider rejected the submission: {}", message)
            }
            AppError::Transport(_) => "Upstream provider is unreachable".to_string(),
            AppError::InvalidSignature => "Invalid signature".to_string(),
            AppError::TokenRefreshFailed { .. } => {
                "Accounting provider authorization expired".to_string()
            }
            AppError::InvalidInput(ref msg) => msg.clone(),
            AppError::InvalidDocumentData(ref msg) => msg.clone(),
            AppError::UnsupportedTaxYear(year) => format!("Tax year {} is not supported", year),
            AppError::NotFound(ref msg) => msg.clone(),
            AppError::Conflict(ref msg) => msg.clone(),
            AppError::Unauthorized(ref msg) => msg.clone(),
            AppError::Internal(_) => "Internal server error".to_string(),
            AppError::InternalWithSource { .. } => "Internal server error".to_string(),
        }
    }
}
