//! OAuth token lifecycle for accounting connections.
//!
//! Tokens are stored encrypted in the connection row. This manager is the only
//! component holding the encryption key: callers receive a decrypted
//! `AccessToken` that is guaranteed to be valid for at least the refresh margin.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use taxsync_core::models::{AccessToken, OAuthConnection, RotatedTokens};
use taxsync_core::{AppError, EncryptionService};
use taxsync_db::ConnectionStore;
use tokio::sync::Mutex;

use crate::providers::AccountingProvider;

/// Tokens closer than this to expiry are refreshed before use
pub const REFRESH_MARGIN_SECS: i64 = 300;

pub fn needs_refresh(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    expires_at - now < Duration::seconds(REFRESH_MARGIN_SECS)
}

pub struct TokenLifecycleManager {
    connections: Arc<dyn ConnectionStore>,
    provider: Arc<dyn AccountingProvider>,
    encryption: EncryptionService,
    tenant_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl TokenLifecycleManager {
    pub fn new(
        connections: Arc<dyn ConnectionStore>,
        provider: Arc<dyn AccountingProvider>,
        encryption: EncryptionService,
    ) -> Self {
        Self {
            connections,
            provider,
            encryption,
            tenant_locks: Mutex::new(HashMap::new()),
        }
    }

    async fn tenant_lock(&self, tenant_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.tenant_locks.lock().await;
        locks
            .entry(tenant_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// A usable access token for the connection, refreshing it first if it
    /// expires within the refresh margin.
    #[tracing::instrument(skip(self, connection), fields(tenant_id = %connection.tenant_id))]
    pub async fn access_token(&self, connection: &OAuthConnection) -> Result<AccessToken, AppError> {
        if !needs_refresh(connection.expires_at, Utc::now()) {
            return self.decrypt_access(connection);
        }

        let lock = self.tenant_lock(&connection.tenant_id).await;
        let _guard = lock.lock().await;

        // Another caller may have refreshed while we waited
        let current = self
            .connections
            .get_by_tenant(&connection.tenant_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "OAuth connection for tenant {} no longer exists",
                    connection.tenant_id
                ))
            })?;

        if !needs_refresh(current.expires_at, Utc::now()) {
            return self.decrypt_access(&current);
        }

        self.refresh(&current).await
    }

    fn decrypt_access(&self, connection: &OAuthConnection) -> Result<AccessToken, AppError> {
        self.encryption
            .decrypt(&connection.access_token_encrypted)
            .map(AccessToken::new)
    }

    async fn refresh(&self, connection: &OAuthConnection) -> Result<AccessToken, AppError> {
        let refresh_token = self
            .encryption
            .decrypt(&connection.refresh_token_encrypted)?;

        let grant = match self
            .provider
            .refresh_token(&connection.tenant_id, &refresh_token)
            .await
        {
            Ok(grant) => grant,
            Err(e) => {
                tracing::warn!(error = %e, "Token refresh failed");
                return Err(e);
            }
        };

        // Providers that do not rotate keep the previous refresh token
        let next_refresh = grant.refresh_token.as_deref().unwrap_or(&refresh_token);
        let rotated = RotatedTokens {
            access_token_encrypted: self.encryption.encrypt(&grant.access_token)?,
            refresh_token_encrypted: self.encryption.encrypt(next_refresh)?,
            expires_at: Utc::now() + Duration::seconds(grant.expires_in),
        };

        self.connections
            .update_tokens(connection.id, &rotated)
            .await?;

        tracing::info!(
            expires_at = %rotated.expires_at,
            rotated_refresh_token = grant.refresh_token.is_some(),
            "Refreshed accounting access token"
        );

        Ok(AccessToken::new(grant.access_token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;

    struct Harness {
        connections: InMemoryConnectionStore,
        provider: MockAccountingProvider,
        manager: Arc<TokenLifecycleManager>,
    }

    fn harness() -> Harness {
        let connections = InMemoryConnectionStore::new();
        let provider = MockAccountingProvider::new();
        let manager = Arc::new(TokenLifecycleManager::new(
            Arc::new(connections.clone()),
            Arc::new(provider.clone()),
            test_encryption_service(),
        ));
        Harness {
            connections,
            provider,
            manager,
        }
    }

    fn decrypt(sealed: &str) -> String {
        test_encryption_service().decrypt(sealed).unwrap()
    }

    #[test]
    fn refresh_margin_is_five_minutes() {
        let now = Utc::now();
        assert!(needs_refresh(now + Duration::seconds(299), now));
        assert!(needs_refresh(now - Duration::seconds(10), now));
        assert!(!needs_refresh(now + Duration::seconds(300), now));
        assert!(!needs_refresh(now + Duration::minutes(30), now));
    }

    #[tokio::test]
    async fn fresh_token_is_returned_without_refresh() {
        let h = harness();
        let connection = create_test_connection("t-1", "access-1", "refresh-1", Duration::minutes(30));
        h.connections.add_connection(connection.clone());

        let token = h.manager.access_token(&connection).await.unwrap();

        assert_eq!(token.secret(), "access-1");
        assert!(h.provider.refresh_calls().is_empty());
        assert_eq!(h.connections.token_writes(), 0);
    }

    #[tokio::test]
    async fn expiring_token_is_refreshed_and_persisted_atomically() {
        let h = harness();
        let connection = create_test_connection("t-1", "access-1", "refresh-1", Duration::minutes(2));
        h.connections.add_connection(connection.clone());

        let token = h.manager.access_token(&connection).await.unwrap();

        assert_eq!(token.secret(), "access-refreshed");
        assert_eq!(h.provider.refresh_calls(), vec!["refresh-1".to_string()]);
        assert_eq!(h.connections.token_writes(), 1);

        let stored = h.connections.get("t-1").unwrap();
        assert_eq!(decrypt(&stored.access_token_encrypted), "access-refreshed");
        assert_eq!(decrypt(&stored.refresh_token_encrypted), "refresh-rotated");
        assert!(stored.expires_at > Utc::now() + Duration::minutes(29));
    }

    #[tokio::test]
    async fn missing_rotated_refresh_token_keeps_the_previous_one() {
        let h = harness();
        h.provider.set_refresh_outcome(RefreshOutcome::Grant {
            access_token: "access-2".to_string(),
            refresh_token: None,
            expires_in: 1800,
        });
        let connection = create_test_connection("t-1", "access-1", "refresh-1", Duration::zero());
        h.connections.add_connection(connection.clone());

        h.manager.access_token(&connection).await.unwrap();

        let stored = h.connections.get("t-1").unwrap();
        assert_eq!(decrypt(&stored.access_token_encrypted), "access-2");
        assert_eq!(decrypt(&stored.refresh_token_encrypted), "refresh-1");
    }

    #[tokio::test]
    async fn rejected_exchange_is_token_refresh_failed_and_writes_nothing() {
        let h = harness();
        h.provider.set_refresh_outcome(RefreshOutcome::Reject);
        let connection = create_test_connection("t-1", "access-1", "refresh-1", Duration::minutes(1));
        h.connections.add_connection(connection.clone());

        let result = h.manager.access_token(&connection).await;

        assert!(matches!(result, Err(AppError::TokenRefreshFailed { .. })));
        assert_eq!(h.connections.token_writes(), 0);
        assert_eq!(
            h.connections.get("t-1").unwrap().access_token_encrypted,
            connection.access_token_encrypted
        );
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_share_one_refresh() {
        let h = harness();
        h.provider.delay_refresh(std::time::Duration::from_millis(500));
        let connection = create_test_connection("t-1", "access-1", "refresh-1", Duration::minutes(1));
        h.connections.add_connection(connection.clone());

        let mut handles = Vec::new();
        for _ in 0..5 {
            let manager = h.manager.clone();
            let connection = connection.clone();
            handles.push(tokio::spawn(async move {
                manager.access_token(&connection).await
            }));
        }

        for handle in handles {
            let token = handle.await.unwrap().unwrap();
            assert_eq!(token.secret(), "access-refreshed");
        }
        assert_eq!(h.provider.refresh_calls().len(), 1);
        assert_eq!(h.connections.token_writes(), 1);
    }
}
