//! Repository, provider client and service construction

use anyhow::{Context, Result};
use sqlx::PgPool;
use std::sync::Arc;
use taxsync_core::{Config, EncryptionService};
use taxsync_db::{
    ConnectionStore, DocumentRepository, FilingRepository, FilingStore, NotificationRepository,
    OAuthConnectionRepository, SyncedEntityRepository, TaxpayerProfileRepository,
    WebhookEventLogRepository,
};
use taxsync_services::{
    AccountingClient, AccountingProvider, EfileClient, EfileProvider, FilingAggregator,
    FilingSubmitter, Notifier, StatusPoller, TokenLifecycleManager, WebhookIngestor,
};

use crate::state::AppState;

pub fn initialize_services(config: &Config, pool: PgPool) -> Result<Arc<AppState>> {
    let filings: Arc<dyn FilingStore> = Arc::new(FilingRepository::new(pool.clone()));
    let connections: Arc<dyn ConnectionStore> =
        Arc::new(OAuthConnectionRepository::new(pool.clone()));

    let efile: Arc<dyn EfileProvider> = Arc::new(
        EfileClient::new(config.efile.clone()).context("Failed to create e-file client")?,
    );
    let accounting: Arc<dyn AccountingProvider> = Arc::new(
        AccountingClient::new(config.accounting.clone())
            .context("Failed to create accounting client")?,
    );

    let encryption_key = config
        .token_encryption_key
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("TOKEN_ENCRYPTION_KEY must be set"))?;
    let encryption = EncryptionService::from_base64_key(encryption_key)
        .context("Failed to initialize token encryption")?;

    let submitter = FilingSubmitter::new(
        FilingAggregator::new(Arc::new(DocumentRepository::new(pool.clone()))),
        Arc::new(TaxpayerProfileRepository::new(pool.clone())),
        filings.clone(),
        efile.clone(),
        Notifier::new(Arc::new(NotificationRepository::new(pool.clone()))),
    );

    let poller = StatusPoller::new(filings.clone(), efile, config.poller.clone());

    let tokens = Arc::new(TokenLifecycleManager::new(
        connections.clone(),
        accounting.clone(),
        encryption,
    ));
    let ingestor = WebhookIngestor::new(
        config.accounting.webhook_key.clone(),
        connections,
        tokens,
        accounting,
        Arc::new(SyncedEntityRepository::new(pool.clone())),
        Arc::new(WebhookEventLogRepository::new(pool.clone())),
    );

    tracing::info!(
        efile_auth_mode = ?config.efile.auth_mode,
        poll_interval_secs = config.poller.interval_secs,
        "Services initialized"
    );

    Ok(Arc::new(AppState {
        db_pool: Some(pool),
        filings,
        submitter,
        poller,
        ingestor,
    }))
}
