//! Test helpers: build AppState and router over in-memory stores and provider
//! doubles, so the route tests need no database or network.

use axum_test::TestServer;
use std::collections::HashMap;
use std::sync::Arc;
use taxsync_api::setup::routes;
use taxsync_api::state::AppState;
use taxsync_core::{Config, PollerConfig};
use taxsync_services::test_helpers::*;
use taxsync_services::{
    FilingAggregator, FilingSubmitter, Notifier, StatusPoller, TokenLifecycleManager,
    WebhookIngestor,
};

pub const TEST_SERVICE_KEY: &str = "svc-test-key";
pub const TEST_WEBHOOK_KEY: &str = "whsec-test-key";

/// Test application: server plus handles on every double it was built from.
pub struct TestApp {
    pub server: TestServer,
    pub filings: InMemoryFilingStore,
    pub documents: InMemoryDocumentStore,
    pub profiles: InMemoryProfileStore,
    pub connections: InMemoryConnectionStore,
    pub entities: InMemorySyncedEntityStore,
    pub events: InMemoryWebhookEventStore,
    pub efile: MockEfileProvider,
    pub accounting: MockAccountingProvider,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }
}

fn test_config() -> Config {
    let vars: HashMap<&str, &str> = HashMap::from([
        ("DATABASE_URL", "postgresql://localhost/taxsync_test"),
        ("SERVICE_API_KEY", TEST_SERVICE_KEY),
        ("ACCOUNTING_WEBHOOK_KEY", TEST_WEBHOOK_KEY),
    ]);
    Config::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap()
}

pub fn setup_test_app() -> TestApp {
    let config = test_config();

    let filings = InMemoryFilingStore::new();
    let documents = InMemoryDocumentStore::new();
    let profiles = InMemoryProfileStore::new();
    let connections = InMemoryConnectionStore::new();
    let entities = InMemorySyncedEntityStore::new();
    let events = InMemoryWebhookEventStore::new();
    let notifications = InMemoryNotificationStore::new();
    let efile = MockEfileProvider::new();
    let accounting = MockAccountingProvider::new();

    let submitter = FilingSubmitter::new(
        FilingAggregator::new(Arc::new(documents.clone())),
        Arc::new(profiles.clone()),
        Arc::new(filings.clone()),
        Arc::new(efile.clone()),
        Notifier::new(Arc::new(notifications)),
    );
    let poller = StatusPoller::new(
        Arc::new(filings.clone()),
        Arc::new(efile.clone()),
        PollerConfig::default(),
    );
    let tokens = Arc::new(TokenLifecycleManager::new(
        Arc::new(connections.clone()),
        Arc::new(accounting.clone()),
        test_encryption_service(),
    ));
    let ingestor = WebhookIngestor::new(
        config.accounting.webhook_key.clone(),
        Arc::new(connections.clone()),
        tokens,
        Arc::new(accounting.clone()),
        Arc::new(entities.clone()),
        Arc::new(events.clone()),
    );

    let state = Arc::new(AppState {
        db_pool: None,
        filings: Arc::new(filings.clone()),
        submitter,
        poller,
        ingestor,
    });

    let router = routes::setup_routes(&config, state).unwrap();
    let server = TestServer::new(router).unwrap();

    TestApp {
        server,
        filings,
        documents,
        profiles,
        connections,
        entities,
        events,
        efile,
        accounting,
    }
}
