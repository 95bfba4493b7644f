//! Test fixtures and helper functions for creating test data

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use serde_json::{json, Value as JsonValue};
use taxsync_core::models::{
    Document, Filing, FilingStatus, FormType, OAuthConnection, TaxpayerProfile,
};
use taxsync_core::EncryptionService;
use uuid::Uuid;

/// Fixed 32-byte key for token encryption in tests
pub const TEST_ENCRYPTION_KEY: [u8; 32] = [7u8; 32];

pub fn test_encryption_service() -> EncryptionService {
    match EncryptionService::from_key_bytes(&TEST_ENCRYPTION_KEY) {
        Ok(service) => service,
        Err(e) => panic!("test encryption key rejected: {}", e),
    }
}

/// Create a completed document with the given extracted payload
pub fn create_test_document(user_id: Uuid, tax_year: Option<i32>, data: JsonValue) -> Document {
    Document {
        id: Uuid::new_v4(),
        user_id,
        document_type: None,
        tax_year,
        processing_status: "completed".to_string(),
        extracted_data: Some(data),
        created_at: Utc::now(),
    }
}

/// Create a completed W-2 document
pub fn create_test_w2(user_id: Uuid, wages: &str, withheld: &str) -> Document {
    create_test_document(
        user_id,
        Some(2024),
        json!({"w2": {"wages": wages, "federal_income_tax_withheld": withheld, "employer_name": "Acme Corp"}}),
    )
}

pub fn create_test_profile(user_id: Uuid) -> TaxpayerProfile {
    TaxpayerProfile {
        user_id,
        ssn: "123-45-6789".to_string(),
        first_name: "Ada".to_string(),
        last_name: "Lovelace".to_string(),
        filing_status: "Single".to_string(),
    }
}

/// Create a filing awaiting a provider decision
pub fn create_test_filing(form_type: FormType, submission_id: &str) -> Filing {
    let now = Utc::now();
    Filing {
        id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        tax_year: 2024,
        form_type,
        status: FilingStatus::Submitted,
        submission_id: Some(submission_id.to_string()),
        provider_status: Some("Received".to_string()),
        total_income: Decimal::new(75_000, 0),
        total_wages: Decimal::new(75_000, 0),
        total_withheld: Decimal::new(9_000, 0),
        total_deductions: Decimal::new(14_600, 0),
        tax_liability: Decimal::new(834_100, 2),
        refund_or_owed: Decimal::new(65_900, 2),
        refund_amount: None,
        rejection_reasons: None,
        submitted_at: Some(now),
        accepted_at: None,
        rejected_at: None,
        created_at: now,
        updated_at: now,
    }
}

/// Create a connection whose tokens are encrypted with the test key
pub fn create_test_connection(
    tenant_id: &str,
    access_token: &str,
    refresh_token: &str,
    expires_in: Duration,
) -> OAuthConnection {
    let encryption = test_encryption_service();
    let now = Utc::now();
    let encrypt = |plain: &str| match encryption.encrypt(plain) {
        Ok(sealed) => sealed,
        Err(e) => panic!("test encryption failed: {}", e),
    };
    OAuthConnection {
        id: Uuid::new_v4(),
        tenant_id: tenant_id.to_string(),
        user_id: Uuid::new_v4(),
        access_token_encrypted: encrypt(access_token),
        refresh_token_encrypted: encrypt(refresh_token),
        expires_at: now + expires_in,
        created_at: now,
        updated_at: now,
    }
}
