use taxsync_core::models::{NewNotification, Notification};
use taxsync_core::AppError;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

/// Repository for in-app user notifications
#[derive(Clone)]
pub struct NotificationRepository {
    pool: PgPool,
}

impl NotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self, notification), fields(db.table = "notifications", db.operation = "insert", user_id = %notification.user_id))]
    pub async fn create(&self, notification: &NewNotification) -> Result<Notification, AppError> {
        let notification = sqlx::query_as::<Postgres, Notification>(
            r#"
            INSERT INTO notifications (id, user_id, kind, title, body, filing_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(notification.user_id)
        .bind(notification.kind)
        .bind(&notification.title)
        .bind(&notification.body)
        .bind(notification.filing_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(notification)
    }
}
