//! Provider doubles for testing without network access

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use taxsync_core::models::{AccessToken, EntityType, FormType};
use taxsync_core::AppError;

use crate::providers::{
    AccountingProvider, EfileProvider, EfileSubmission, ReturnPayload, StatusRecord, TokenGrant,
};

/// What the next create call answers
#[derive(Debug, Clone)]
pub enum CreateOutcome {
    Accept { submission_id: String },
    Reject { status: u16, message: String },
    TransportFailure,
}

#[derive(Clone)]
pub struct MockEfileProvider {
    create_outcome: Arc<Mutex<CreateOutcome>>,
    create_calls: Arc<Mutex<Vec<ReturnPayload>>>,
    create_delay: Arc<Mutex<Option<Duration>>>,
    statuses: Arc<Mutex<HashMap<String, Vec<StatusRecord>>>>,
    delays: Arc<Mutex<HashMap<String, Duration>>>,
    status_calls: Arc<Mutex<usize>>,
}

impl Default for MockEfileProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockEfileProvider {
    pub fn new() -> Self {
        Self {
            create_outcome: Arc::new(Mutex::new(CreateOutcome::Accept {
                submission_id: "sub-0001".to_string(),
            })),
            create_calls: Arc::new(Mutex::new(Vec::new())),
            create_delay: Arc::new(Mutex::new(None)),
            statuses: Arc::new(Mutex::new(HashMap::new())),
            delays: Arc::new(Mutex::new(HashMap::new())),
            status_calls: Arc::new(Mutex::new(0)),
        }
    }

    pub fn set_create_outcome(&self, outcome: CreateOutcome) {
        *self.create_outcome.lock().unwrap() = outcome;
    }

    /// Stall every create call by `delay`
    pub fn delay_create(&self, delay: Duration) {
        *self.create_delay.lock().unwrap() = Some(delay);
    }

    pub fn create_calls(&self) -> Vec<ReturnPayload> {
        self.create_calls.lock().unwrap().clone()
    }

    /// Answer status checks for `submission_id` with a single record
    pub fn set_status(&self, submission_id: &str, status: &str, errors: &[&str]) {
        self.set_records(
            submission_id,
            vec![StatusRecord {
                status: status.to_string(),
                status_time: Some("2024-04-15T12:00:00Z".to_string()),
                errors: errors.iter().map(|e| e.to_string()).collect(),
            }],
        );
    }

    pub fn set_records(&self, submission_id: &str, records: Vec<StatusRecord>) {
        self.statuses
            .lock()
            .unwrap()
            .insert(submission_id.to_string(), records);
    }

    /// Stall status checks for `submission_id` by `delay`
    pub fn delay_status(&self, submission_id: &str, delay: Duration) {
        self.delays
            .lock()
            .unwrap()
            .insert(submission_id.to_string(), delay);
    }

    pub fn status_calls(&self) -> usize {
        *self.status_calls.lock().unwrap()
    }
}

#[async_trait]
impl EfileProvider for MockEfileProvider {
    async fn create_filing(&self, payload: &ReturnPayload) -> Result<EfileSubmission, AppError> {
        self.create_calls.lock().unwrap().push(payload.clone());
        let delay = *self.create_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let outcome = self.create_outcome.lock().unwrap().clone();
        match outcome {
            CreateOutcome::Accept { submission_id } => Ok(EfileSubmission {
                submission_id,
                status: Some("Received".to_string()),
            }),
            CreateOutcome::Reject { status, message } => {
                Err(AppError::ProviderSubmissionFailed { status, message })
            }
            CreateOutcome::TransportFailure => {
                Err(AppError::Transport("connection refused".to_string()))
            }
        }
    }

    async fn fetch_status(
        &self,
        _form_type: FormType,
        submission_id: &str,
    ) -> Result<Vec<StatusRecord>, AppError> {
        *self.status_calls.lock().unwrap() += 1;
        let delay = self.delays.lock().unwrap().get(submission_id).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self
            .statuses
            .lock()
            .unwrap()
            .get(submission_id)
            .cloned()
            .unwrap_or_default())
    }
}

/// What the next token exchange answers
#[derive(Debug, Clone)]
pub enum RefreshOutcome {
    Grant {
        access_token: String,
        refresh_token: Option<String>,
        expires_in: i64,
    },
    Reject,
    TransportFailure,
}

#[derive(Clone)]
pub struct MockAccountingProvider {
    refresh_outcome: Arc<Mutex<RefreshOutcome>>,
    refresh_delay: Arc<Mutex<Option<Duration>>>,
    refresh_calls: Arc<Mutex<Vec<String>>>,
    resources: Arc<Mutex<HashMap<(EntityType, String), JsonValue>>>,
    fetch_calls: Arc<Mutex<Vec<(String, String)>>>,
}

impl Default for MockAccountingProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockAccountingProvider {
    pub fn new() -> Self {
        Self {
            refresh_outcome: Arc::new(Mutex::new(RefreshOutcome::Grant {
                access_token: "access-refreshed".to_string(),
                refresh_token: Some("refresh-rotated".to_string()),
                expires_in: 1800,
            })),
            refresh_delay: Arc::new(Mutex::new(None)),
            refresh_calls: Arc::new(Mutex::new(Vec::new())),
            resources: Arc::new(Mutex::new(HashMap::new())),
            fetch_calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn set_refresh_outcome(&self, outcome: RefreshOutcome) {
        *self.refresh_outcome.lock().unwrap() = outcome;
    }

    pub fn delay_refresh(&self, delay: Duration) {
        *self.refresh_delay.lock().unwrap() = Some(delay);
    }

    /// Refresh tokens presented to the token endpoint, in call order
    pub fn refresh_calls(&self) -> Vec<String> {
        self.refresh_calls.lock().unwrap().clone()
    }

    pub fn add_resource(&self, entity_type: EntityType, resource_id: &str, data: JsonValue) {
        self.resources
            .lock()
            .unwrap()
            .insert((entity_type, resource_id.to_string()), data);
    }

    /// `(tenant_id, access_token)` of each resource fetch
    pub fn fetch_calls(&self) -> Vec<(String, String)> {
        self.fetch_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl AccountingProvider for MockAccountingProvider {
    async fn refresh_token(
        &self,
        tenant_id: &str,
        refresh_token: &str,
    ) -> Result<TokenGrant, AppError> {
        self.refresh_calls
            .lock()
            .unwrap()
            .push(refresh_token.to_string());
        let delay = *self.refresh_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let outcome = self.refresh_outcome.lock().unwrap().clone();
        match outcome {
            RefreshOutcome::Grant {
                access_token,
                refresh_token,
                expires_in,
            } => Ok(TokenGrant {
                access_token,
                refresh_token,
                expires_in,
            }),
            RefreshOutcome::Reject => Err(AppError::TokenRefreshFailed {
                tenant_id: tenant_id.to_string(),
                message: "invalid_grant".to_string(),
            }),
            RefreshOutcome::TransportFailure => {
                Err(AppError::Transport("connection reset".to_string()))
            }
        }
    }

    async fn fetch_resource(
        &self,
        access_token: &AccessToken,
        tenant_id: &str,
        entity_type: EntityType,
        resource_id: &str,
    ) -> Result<Option<JsonValue>, AppError> {
        self.fetch_calls
            .lock()
            .unwrap()
            .push((tenant_id.to_string(), access_token.secret().to_string()));
        Ok(self
            .resources
            .lock()
            .unwrap()
            .get(&(entity_type, resource_id.to_string()))
            .cloned())
    }
}
