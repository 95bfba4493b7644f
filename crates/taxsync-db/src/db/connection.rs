use taxsync_core::models::{OAuthConnection, RotatedTokens};
use taxsync_core::AppError;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

/// Repository for accounting-provider OAuth connections
#[derive(Clone)]
pub struct OAuthConnectionRepository {
    pool: PgPool,
}

impl OAuthConnectionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self), fields(db.table = "oauth_connections", db.operation = "select", tenant_id = %tenant_id))]
    pub async fn get_by_tenant(&self, tenant_id: &str) -> Result<Option<OAuthConnection>, AppError> {
        let connection = sqlx::query_as::<Postgres, OAuthConnection>(
            "SELECT * FROM oauth_connections WHERE tenant_id = $1",
        )
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(connection)
    }

    /// Persist a refreshed token pair. Both tokens and the expiry are written by one
    /// statement so readers never see a new expiry with an old token.
    #[tracing::instrument(skip(self, tokens), fields(db.table = "oauth_connections", db.operation = "update", db.record_id = %id))]
    pub async fn update_tokens(&self, id: Uuid, tokens: &RotatedTokens) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE oauth_connections
            SET access_token_encrypted = $2,
                refresh_token_encrypted = $3,
                expires_at = $4,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&tokens.access_token_encrypted)
        .bind(&tokens.refresh_token_encrypted)
        .bind(tokens.expires_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("OAuth connection {} not found", id)));
        }

        Ok(())
    }
}
