use sqlx::PgPool;
use std::sync::Arc;
use taxsync_db::FilingStore;
use taxsync_services::{FilingSubmitter, StatusPoller, WebhookIngestor};

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    /// `None` when the service runs without a database (route tests)
    pub db_pool: Option<PgPool>,
    pub filings: Arc<dyn FilingStore>,
    pub submitter: FilingSubmitter,
    pub poller: StatusPoller,
    pub ingestor: WebhookIngestor,
}
