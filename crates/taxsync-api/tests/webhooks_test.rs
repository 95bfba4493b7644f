//! Accounting webhook route tests.
//!
//! Run with: `cargo test -p taxsync-api --test webhooks_test`

mod helpers;

use chrono::Duration;
use helpers::{setup_test_app, TEST_WEBHOOK_KEY};
use serde_json::{json, Value};
use taxsync_core::models::EntityType;
use taxsync_infra::sign_webhook_body;
use taxsync_services::test_helpers::*;
use taxsync_services::SIGNATURE_HEADER;

fn delivery(events: Value) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "events": events,
        "firstEventSequence": 1,
        "lastEventSequence": 1
    }))
    .unwrap()
}

fn invoice_update(tenant: &str, resource: &str) -> Value {
    json!({
        "eventCategory": "INVOICE",
        "eventType": "UPDATE",
        "eventDateUtc": "2024-03-01T10:00:00.000",
        "resourceId": resource,
        "tenantId": tenant
    })
}

#[tokio::test]
async fn test_invalid_signature_is_unauthorized() {
    let app = setup_test_app();
    let body = delivery(json!([invoice_update("t-1", "inv-1")]));

    let response = app
        .client()
        .post("/webhooks/accounting")
        .add_header(SIGNATURE_HEADER, "bm90LWEtc2lnbmF0dXJl")
        .bytes(body.into())
        .await;

    assert_eq!(response.status_code(), 401);
    let data: Value = response.json();
    assert_eq!(data["code"], "INVALID_SIGNATURE");
    assert!(app.events.entries().is_empty());
}

#[tokio::test]
async fn test_missing_signature_is_unauthorized() {
    let app = setup_test_app();

    let response = app
        .client()
        .post("/webhooks/accounting")
        .bytes(delivery(json!([])).into())
        .await;

    assert_eq!(response.status_code(), 401);
}

#[tokio::test]
async fn test_signed_delivery_syncs_known_tenant() {
    let app = setup_test_app();
    app.connections.add_connection(create_test_connection(
        "t-1",
        "access-1",
        "refresh-1",
        Duration::minutes(30),
    ));
    app.accounting.add_resource(
        EntityType::Invoice,
        "inv-1",
        json!({"InvoiceID": "inv-1", "Total": 120.5}),
    );
    let body = delivery(json!([
        invoice_update("t-1", "inv-1"),
        invoice_update("t-unknown", "inv-2")
    ]));
    let signature = sign_webhook_body(TEST_WEBHOOK_KEY, &body).unwrap();

    let response = app
        .client()
        .post("/webhooks/accounting")
        .add_header(SIGNATURE_HEADER, signature)
        .bytes(body.into())
        .await;

    assert_eq!(response.status_code(), 200);
    let data: Value = response.json();
    assert_eq!(data["received"], 2);
    assert_eq!(data["processed"], 1);
    assert_eq!(data["skipped"], 1);
    assert_eq!(data["failed"], 0);

    assert!(app.entities.get("t-1", EntityType::Invoice, "inv-1").is_some());
    assert_eq!(app.events.entries().len(), 2);
}
