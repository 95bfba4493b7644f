use taxsync_core::models::{Filing, FilingStatusUpdate, FormType, NewFiling};
use taxsync_core::AppError;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

/// Partial unique index allowing one live filing per user, year and form
const ONE_ACTIVE_INDEX: &str = "idx_filings_one_active";

fn is_one_active_violation(err: &sqlx::Error) -> bool {
    err.as_database_error().is_some_and(|db| {
        db.is_unique_violation() && db.constraint() == Some(ONE_ACTIVE_INDEX)
    })
}

/// Repository for filing records
#[derive(Clone)]
pub struct FilingRepository {
    pool: PgPool,
}

impl FilingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a filing that the provider has accepted for processing.
    /// The row starts in `submitted` with the provider's submission id.
    #[tracing::instrument(skip(self, filing), fields(db.table = "filings", db.operation = "insert", submission_id = %filing.submission_id))]
    pub async fn insert_submitted(&self, filing: &NewFiling) -> Result<Filing, AppError> {
        let inserted = sqlx::query_as::<Postgres, Filing>(
            r#"
            INSERT INTO filings (
                id, user_id, tax_year, form_type, status, submission_id, provider_status,
                total_income, total_wages, total_withheld, total_deductions,
                tax_liability, refund_or_owed, submitted_at
            )
            VALUES ($1, $2, $3, $4, 'submitted', $5, $6, $7, $8, $9, $10, $11, $12, NOW())
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(filing.user_id)
        .bind(filing.tax_year)
        .bind(filing.form_type)
        .bind(&filing.submission_id)
        .bind(&filing.provider_status)
        .bind(filing.total_income)
        .bind(filing.total_wages)
        .bind(filing.total_withheld)
        .bind(filing.total_deductions)
        .bind(filing.tax_liability)
        .bind(filing.refund_or_owed)
        .fetch_one(&self.pool)
        .await;

        match inserted {
            Ok(filing) => Ok(filing),
            Err(e) if is_one_active_violation(&e) => Err(AppError::Conflict(format!(
                "an active filing already exists for user {} in tax year {}",
                filing.user_id, filing.tax_year
            ))),
            Err(e) => Err(e.into()),
        }
    }

    #[tracing::instrument(skip(self), fields(db.table = "filings", db.operation = "select", db.record_id = %id))]
    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<Filing>, AppError> {
        let filing = sqlx::query_as::<Postgres, Filing>("SELECT * FROM filings WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(filing)
    }

    /// A live (pending, submitted or accepted) filing for the same user, year and form
    #[tracing::instrument(skip(self), fields(db.table = "filings", db.operation = "select"))]
    pub async fn find_active(
        &self,
        user_id: Uuid,
        tax_year: i32,
        form_type: FormType,
    ) -> Result<Option<Filing>, AppError> {
        let filing = sqlx::query_as::<Postgres, Filing>(
            r#"
            SELECT * FROM filings
            WHERE user_id = $1 AND tax_year = $2 AND form_type = $3
              AND status IN ('pending', 'submitted', 'accepted')
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(tax_year)
        .bind(form_type)
        .fetch_optional(&self.pool)
        .await?;

        Ok(filing)
    }

    /// Filings awaiting a provider decision, most recently submitted first
    #[tracing::instrument(skip(self), fields(db.table = "filings", db.operation = "select", form_type = %form_type))]
    pub async fn list_pollable(
        &self,
        form_type: FormType,
        limit: i64,
    ) -> Result<Vec<Filing>, AppError> {
        let filings = sqlx::query_as::<Postgres, Filing>(
            r#"
            SELECT * FROM filings
            WHERE form_type = $1
              AND status IN ('pending', 'submitted')
              AND submission_id IS NOT NULL
            ORDER BY submitted_at DESC NULLS LAST
            LIMIT $2
            "#,
        )
        .bind(form_type)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(filings)
    }

    /// Conditional status write. Returns `false` when the stored status no longer
    /// matches `expected_status` (another sweep got there first).
    ///
    /// The refund estimate and decision timestamps are only filled when still empty,
    /// so replaying the same provider response is a no-op.
    #[tracing::instrument(skip(self, update), fields(db.table = "filings", db.operation = "update", db.record_id = %update.filing_id, new_status = %update.new_status))]
    pub async fn apply_status_update(&self, update: &FilingStatusUpdate) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE filings
            SET status = $3,
                provider_status = $4,
                rejection_reasons = COALESCE($5, rejection_reasons),
                refund_amount = CASE
                    WHEN $3 = 'accepted'::filing_status THEN COALESCE(refund_amount, $6)
                    ELSE refund_amount
                END,
                accepted_at = CASE
                    WHEN $3 = 'accepted'::filing_status THEN COALESCE(accepted_at, NOW())
                    ELSE accepted_at
                END,
                rejected_at = CASE
                    WHEN $3 = 'rejected'::filing_status THEN COALESCE(rejected_at, NOW())
                    ELSE rejected_at
                END,
                updated_at = NOW()
            WHERE id = $1 AND status = $2
            "#,
        )
        .bind(update.filing_id)
        .bind(update.expected_status)
        .bind(update.new_status)
        .bind(&update.provider_status)
        .bind(&update.rejection_reasons)
        .bind(update.refund_estimate)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
