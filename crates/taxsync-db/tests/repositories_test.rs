mod helpers;

use helpers::{new_filing, setup_test_db};
use rust_decimal_macros::dec;
use serde_json::json;
use taxsync_core::models::{
    EntityType, FilingStatus, FilingStatusUpdate, FormType, SyncedEntity, UpsertSyncedEntity,
};
use taxsync_core::AppError;
use taxsync_db::{FilingRepository, SyncedEntityRepository};
use uuid::Uuid;

fn accepted(filing_id: Uuid, refund_estimate: Option<rust_decimal::Decimal>) -> FilingStatusUpdate {
    FilingStatusUpdate {
        filing_id,
        expected_status: FilingStatus::Submitted,
        new_status: FilingStatus::Accepted,
        provider_status: "Accepted".to_string(),
        rejection_reasons: None,
        refund_estimate,
    }
}

#[tokio::test]
async fn filing_round_trips_enum_columns() {
    let Some(db) = setup_test_db().await else {
        return;
    };
    let repo = FilingRepository::new(db.pool.clone());
    let user_id = Uuid::new_v4();

    let inserted = repo
        .insert_submitted(&new_filing(user_id, FormType::Form4868, "sub-ext-1"))
        .await
        .unwrap();

    let stored = repo.get_by_id(inserted.id).await.unwrap().unwrap();
    assert_eq!(stored.form_type, FormType::Form4868);
    assert_eq!(stored.status, FilingStatus::Submitted);
    assert_eq!(stored.submission_id.as_deref(), Some("sub-ext-1"));
    assert_eq!(stored.tax_liability, dec!(8341.00));
    assert!(stored.submitted_at.is_some());
    assert!(stored.refund_amount.is_none());

    let extensions = repo.list_pollable(FormType::Form4868, 10).await.unwrap();
    assert_eq!(extensions.len(), 1);
    assert!(repo.list_pollable(FormType::Form1040, 10).await.unwrap().is_empty());

    let active = repo
        .find_active(user_id, 2024, FormType::Form4868)
        .await
        .unwrap();
    assert_eq!(active.map(|f| f.id), Some(inserted.id));
    assert!(repo
        .find_active(user_id, 2024, FormType::Form1040)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn status_update_is_conditional_and_replay_safe() {
    let Some(db) = setup_test_db().await else {
        return;
    };
    let repo = FilingRepository::new(db.pool.clone());
    let filing = repo
        .insert_submitted(&new_filing(Uuid::new_v4(), FormType::Form1040, "sub-1"))
        .await
        .unwrap();

    assert!(repo
        .apply_status_update(&accepted(filing.id, Some(dec!(659.00))))
        .await
        .unwrap());
    let first = repo.get_by_id(filing.id).await.unwrap().unwrap();
    assert_eq!(first.status, FilingStatus::Accepted);
    assert_eq!(first.provider_status.as_deref(), Some("Accepted"));
    assert_eq!(first.refund_amount, Some(dec!(659.00)));
    assert!(first.accepted_at.is_some());

    // stored status no longer matches the expected one
    assert!(!repo
        .apply_status_update(&accepted(filing.id, Some(dec!(1.00))))
        .await
        .unwrap());
    let replayed = repo.get_by_id(filing.id).await.unwrap().unwrap();
    assert_eq!(replayed.refund_amount, Some(dec!(659.00)));
    assert_eq!(replayed.accepted_at, first.accepted_at);
    assert!(repo
        .list_pollable(FormType::Form1040, 10)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn recorded_refund_amount_is_kept_on_acceptance() {
    let Some(db) = setup_test_db().await else {
        return;
    };
    let repo = FilingRepository::new(db.pool.clone());
    let filing = repo
        .insert_submitted(&new_filing(Uuid::new_v4(), FormType::Form1040, "sub-refund"))
        .await
        .unwrap();
    sqlx::query("UPDATE filings SET refund_amount = 42 WHERE id = $1")
        .bind(filing.id)
        .execute(&db.pool)
        .await
        .unwrap();

    assert!(repo
        .apply_status_update(&accepted(filing.id, Some(dec!(659.00))))
        .await
        .unwrap());

    let stored = repo.get_by_id(filing.id).await.unwrap().unwrap();
    assert_eq!(stored.refund_amount, Some(dec!(42)));
}

#[tokio::test]
async fn rejection_records_reasons_and_frees_the_year() {
    let Some(db) = setup_test_db().await else {
        return;
    };
    let repo = FilingRepository::new(db.pool.clone());
    let user_id = Uuid::new_v4();
    let filing = repo
        .insert_submitted(&new_filing(user_id, FormType::Form1040, "sub-rej"))
        .await
        .unwrap();

    let duplicate = repo
        .insert_submitted(&new_filing(user_id, FormType::Form1040, "sub-dup"))
        .await;
    assert!(matches!(duplicate, Err(AppError::Conflict(_))));

    let rejected = FilingStatusUpdate {
        filing_id: filing.id,
        expected_status: FilingStatus::Submitted,
        new_status: FilingStatus::Rejected,
        provider_status: "Rejected".to_string(),
        rejection_reasons: Some(vec!["IND-031: SSN mismatch".to_string()]),
        refund_estimate: None,
    };
    assert!(repo.apply_status_update(&rejected).await.unwrap());

    let stored = repo.get_by_id(filing.id).await.unwrap().unwrap();
    assert_eq!(stored.status, FilingStatus::Rejected);
    assert_eq!(
        stored.rejection_reasons,
        Some(vec!["IND-031: SSN mismatch".to_string()])
    );
    assert!(stored.rejected_at.is_some());
    assert!(stored.accepted_at.is_none());

    let refiled = repo
        .insert_submitted(&new_filing(user_id, FormType::Form1040, "sub-refiled"))
        .await
        .unwrap();
    assert_eq!(refiled.status, FilingStatus::Submitted);
}

#[tokio::test]
async fn submission_id_is_unique_and_immutable() {
    let Some(db) = setup_test_db().await else {
        return;
    };
    let repo = FilingRepository::new(db.pool.clone());
    let filing = repo
        .insert_submitted(&new_filing(Uuid::new_v4(), FormType::Form1040, "sub-fixed"))
        .await
        .unwrap();

    let reused = repo
        .insert_submitted(&new_filing(Uuid::new_v4(), FormType::Form1040, "sub-fixed"))
        .await;
    assert!(matches!(reused, Err(AppError::Database(_))));

    let rewrite = sqlx::query("UPDATE filings SET submission_id = 'sub-other' WHERE id = $1")
        .bind(filing.id)
        .execute(&db.pool)
        .await;
    assert!(rewrite.is_err());

    sqlx::query("UPDATE filings SET provider_status = 'Transmitted' WHERE id = $1")
        .bind(filing.id)
        .execute(&db.pool)
        .await
        .unwrap();
    let stored = repo.get_by_id(filing.id).await.unwrap().unwrap();
    assert_eq!(stored.submission_id.as_deref(), Some("sub-fixed"));
}

async fn fetch_entity(pool: &sqlx::PgPool, resource_id: &str) -> SyncedEntity {
    sqlx::query_as::<_, SyncedEntity>("SELECT * FROM synced_entities WHERE resource_id = $1")
        .bind(resource_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

#[tokio::test]
async fn synced_entity_soft_delete_and_recreate() {
    let Some(db) = setup_test_db().await else {
        return;
    };
    let repo = SyncedEntityRepository::new(db.pool.clone());
    let entity = UpsertSyncedEntity {
        tenant_id: "tenant-1".to_string(),
        user_id: Uuid::new_v4(),
        entity_type: EntityType::Invoice,
        resource_id: "inv-1".to_string(),
        data: json!({"InvoiceID": "inv-1", "Total": 120}),
    };

    let created = repo.upsert(&entity).await.unwrap();
    assert_eq!(created.entity_type, EntityType::Invoice);
    assert!(created.deleted_at.is_none());

    assert!(repo
        .soft_delete("tenant-1", EntityType::Invoice, "inv-1")
        .await
        .unwrap());
    let deleted = fetch_entity(&db.pool, "inv-1").await;
    assert!(deleted.deleted_at.is_some());

    // a repeated delete keeps the first timestamp
    assert!(repo
        .soft_delete("tenant-1", EntityType::Invoice, "inv-1")
        .await
        .unwrap());
    assert_eq!(
        fetch_entity(&db.pool, "inv-1").await.deleted_at,
        deleted.deleted_at
    );

    let recreated = repo
        .upsert(&UpsertSyncedEntity {
            data: json!({"InvoiceID": "inv-1", "Total": 150}),
            ..entity.clone()
        })
        .await
        .unwrap();
    assert_eq!(recreated.id, created.id);
    assert!(recreated.deleted_at.is_none());
    assert_eq!(recreated.data["Total"], json!(150));

    assert!(!repo
        .soft_delete("tenant-1", EntityType::Contact, "inv-1")
        .await
        .unwrap());
}
