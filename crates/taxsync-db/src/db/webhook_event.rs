use taxsync_core::models::NewWebhookEventLog;
use taxsync_core::AppError;
use sqlx::PgPool;
use uuid::Uuid;

/// Append-only audit log of inbound webhook events
#[derive(Clone)]
pub struct WebhookEventLogRepository {
    pool: PgPool,
}

impl WebhookEventLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self, entry), fields(db.table = "webhook_event_log", db.operation = "insert", tenant_id = %entry.tenant_id, outcome = %entry.outcome))]
    pub async fn append(&self, entry: &NewWebhookEventLog) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO webhook_event_log (
                id, provider, event_category, event_type, tenant_id, resource_id,
                payload, outcome, error_message, processed_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, NOW())
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&entry.provider)
        .bind(&entry.event_category)
        .bind(&entry.event_type)
        .bind(&entry.tenant_id)
        .bind(&entry.resource_id)
        .bind(&entry.payload)
        .bind(entry.outcome)
        .bind(&entry.error_message)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
