use taxsync_core::models::{Document, TaxpayerProfile, PROCESSING_STATUS_COMPLETED};
use taxsync_core::AppError;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

/// Read-only access to processed tax documents
#[derive(Clone)]
pub struct DocumentRepository {
    pool: PgPool,
}

impl DocumentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Completed documents for a user, oldest first
    #[tracing::instrument(skip(self), fields(db.table = "documents", db.operation = "select", user_id = %user_id))]
    pub async fn list_completed(&self, user_id: Uuid) -> Result<Vec<Document>, AppError> {
        let documents = sqlx::query_as::<Postgres, Document>(
            r#"
            SELECT id, user_id, document_type, tax_year, processing_status, extracted_data, created_at
            FROM documents
            WHERE user_id = $1 AND LOWER(processing_status) = $2
            ORDER BY created_at ASC
            "#,
        )
        .bind(user_id)
        .bind(PROCESSING_STATUS_COMPLETED)
        .fetch_all(&self.pool)
        .await?;

        Ok(documents)
    }
}

/// Read-only access to taxpayer identity
#[derive(Clone)]
pub struct TaxpayerProfileRepository {
    pool: PgPool,
}

impl TaxpayerProfileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self), fields(db.table = "taxpayer_profiles", db.operation = "select", user_id = %user_id))]
    pub async fn get(&self, user_id: Uuid) -> Result<Option<TaxpayerProfile>, AppError> {
        let profile = sqlx::query_as::<Postgres, TaxpayerProfile>(
            r#"
            SELECT user_id, ssn, first_name, last_name, filing_status
            FROM taxpayer_profiles
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(profile)
    }
}
