use taxsync_core::models::{EntityType, SyncedEntity, UpsertSyncedEntity};
use taxsync_core::AppError;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

/// Repository for business objects mirrored from the accounting provider
#[derive(Clone)]
pub struct SyncedEntityRepository {
    pool: PgPool,
}

impl SyncedEntityRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert or refresh an entity keyed by (tenant, type, provider resource id).
    /// A re-created resource clears an earlier soft delete.
    #[tracing::instrument(skip(self, entity), fields(db.table = "synced_entities", db.operation = "upsert", tenant_id = %entity.tenant_id, resource_id = %entity.resource_id))]
    pub async fn upsert(&self, entity: &UpsertSyncedEntity) -> Result<SyncedEntity, AppError> {
        let entity = sqlx::query_as::<Postgres, SyncedEntity>(
            r#"
            INSERT INTO synced_entities (id, tenant_id, user_id, entity_type, resource_id, data, synced_at)
            VALUES ($1, $2, $3, $4, $5, $6, NOW())
            ON CONFLICT (tenant_id, entity_type, resource_id) DO UPDATE
            SET data = EXCLUDED.data,
                user_id = EXCLUDED.user_id,
                synced_at = NOW(),
                deleted_at = NULL
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&entity.tenant_id)
        .bind(entity.user_id)
        .bind(entity.entity_type)
        .bind(&entity.resource_id)
        .bind(&entity.data)
        .fetch_one(&self.pool)
        .await?;

        Ok(entity)
    }

    /// Mark an entity deleted, keeping the row. Returns `false` if the resource was
    /// never synced.
    #[tracing::instrument(skip(self), fields(db.table = "synced_entities", db.operation = "update"))]
    pub async fn soft_delete(
        &self,
        tenant_id: &str,
        entity_type: EntityType,
        resource_id: &str,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE synced_entities
            SET deleted_at = COALESCE(deleted_at, NOW())
            WHERE tenant_id = $1 AND entity_type = $2 AND resource_id = $3
            "#,
        )
        .bind(tenant_id)
        .bind(entity_type)
        .bind(resource_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
