//! Status poller.
//!
//! A sweep selects filings still awaiting a provider decision, checks each one
//! against the e-file status endpoint with bounded concurrency and applies any
//! forward status change as a conditional write. Every filing gets its own entry
//! in the sweep report; one failing check never aborts the sweep.

use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use taxsync_core::models::{Filing, FilingStatus, FilingStatusUpdate, FormType};
use taxsync_core::{estimate_refund, AppError, PollerConfig};
use taxsync_db::FilingStore;
use tokio::sync::{mpsc, Semaphore};
use tokio::time::{interval, MissedTickBehavior};
use uuid::Uuid;

use crate::providers::{EfileProvider, StatusRecord};

/// Result of checking one filing
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CheckOutcome {
    Updated {
        from: FilingStatus,
        to: FilingStatus,
        provider_status: String,
    },
    Unchanged {
        reason: String,
    },
    NoRecords,
    Errored {
        error: String,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct FilingCheckResult {
    pub filing_id: Uuid,
    pub form_type: FormType,
    pub submission_id: Option<String>,
    #[serde(flatten)]
    pub outcome: CheckOutcome,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SweepReport {
    pub checked: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub no_records: usize,
    pub errored: usize,
    /// Failures selecting candidates, per form type
    pub selection_errors: Vec<String>,
    pub duration_ms: u64,
    pub results: Vec<FilingCheckResult>,
}

impl SweepReport {
    fn new(
        results: Vec<FilingCheckResult>,
        selection_errors: Vec<String>,
        elapsed: Duration,
    ) -> Self {
        let count = |pred: fn(&CheckOutcome) -> bool| {
            results.iter().filter(|r| pred(&r.outcome)).count()
        };
        Self {
            checked: results.len(),
            updated: count(|o| matches!(o, CheckOutcome::Updated { .. })),
            unchanged: count(|o| matches!(o, CheckOutcome::Unchanged { .. })),
            no_records: count(|o| matches!(o, CheckOutcome::NoRecords)),
            errored: count(|o| matches!(o, CheckOutcome::Errored { .. })),
            selection_errors,
            duration_ms: elapsed.as_millis() as u64,
            results,
        }
    }

    pub fn result_for(&self, filing_id: Uuid) -> Option<&FilingCheckResult> {
        self.results.iter().find(|r| r.filing_id == filing_id)
    }
}

/// What to do with a filing given the provider's latest record
#[derive(Debug, Clone, PartialEq)]
enum StatusPlan {
    Skip(String),
    Apply(FilingStatusUpdate),
}

fn plan_update(filing: &Filing, record: &StatusRecord) -> Result<StatusPlan, AppError> {
    let provider_status = record.status.trim();

    let next = FilingStatus::from_provider(provider_status).ok_or_else(|| {
        AppError::InvalidInput(format!("unknown provider status '{}'", provider_status))
    })?;

    // Matching text alone is not enough: the create response can echo a terminal status
    let same_text = filing
        .provider_status
        .as_deref()
        .is_some_and(|stored| stored.trim().eq_ignore_ascii_case(provider_status));
    if next == filing.status && same_text {
        return Ok(StatusPlan::Skip("provider status unchanged".to_string()));
    }

    if next == FilingStatus::Pending {
        return Ok(StatusPlan::Skip("provider reports pending".to_string()));
    }

    if next != filing.status && !filing.status.can_transition_to(next) {
        return Ok(StatusPlan::Skip(format!(
            "invalid transition {} -> {}",
            filing.status, next
        )));
    }

    let rejection_reasons = (next == FilingStatus::Rejected && !record.errors.is_empty())
        .then(|| record.errors.clone());

    let refund_estimate = (next == FilingStatus::Accepted && filing.refund_amount.is_none())
        .then(|| estimate_refund(filing.total_withheld, filing.total_wages));

    Ok(StatusPlan::Apply(FilingStatusUpdate {
        filing_id: filing.id,
        expected_status: filing.status,
        new_status: next,
        provider_status: provider_status.to_string(),
        rejection_reasons,
        refund_estimate,
    }))
}

async fn check_filing(
    filings: &dyn FilingStore,
    provider: &dyn EfileProvider,
    filing: &Filing,
) -> Result<CheckOutcome, AppError> {
    let submission_id = filing
        .submission_id
        .as_deref()
        .ok_or_else(|| AppError::InvalidInput("filing has no submission id".to_string()))?;

    let records = provider.fetch_status(filing.form_type, submission_id).await?;
    let Some(record) = records.first() else {
        return Ok(CheckOutcome::NoRecords);
    };

    match plan_update(filing, record)? {
        StatusPlan::Skip(reason) => {
            if reason.starts_with("invalid transition") {
                tracing::warn!(
                    filing_id = %filing.id,
                    submission_id = %submission_id,
                    provider_status = %record.status,
                    "Ignoring backward status from provider"
                );
            }
            Ok(CheckOutcome::Unchanged { reason })
        }
        StatusPlan::Apply(update) => {
            if filings.apply_status_update(&update).await? {
                Ok(CheckOutcome::Updated {
                    from: update.expected_status,
                    to: update.new_status,
                    provider_status: update.provider_status,
                })
            } else {
                Ok(CheckOutcome::Unchanged {
                    reason: "status changed concurrently".to_string(),
                })
            }
        }
    }
}

#[derive(Clone)]
pub struct StatusPoller {
    filings: Arc<dyn FilingStore>,
    provider: Arc<dyn EfileProvider>,
    config: PollerConfig,
}

impl StatusPoller {
    pub fn new(
        filings: Arc<dyn FilingStore>,
        provider: Arc<dyn EfileProvider>,
        config: PollerConfig,
    ) -> Self {
        Self {
            filings,
            provider,
            config,
        }
    }

    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    /// Run one sweep over every supported form type.
    #[tracing::instrument(skip(self))]
    pub async fn sweep(&self) -> SweepReport {
        let started = Instant::now();
        let mut candidates = Vec::new();
        let mut selection_errors = Vec::new();

        for form_type in FormType::ALL {
            match self
                .filings
                .list_pollable(form_type, self.config.batch_size)
                .await
            {
                Ok(filings) => candidates.extend(filings),
                Err(e) => {
                    tracing::error!(form_type = %form_type, error = %e, "Failed to select filings to poll");
                    selection_errors.push(format!("{}: {}", form_type, e));
                }
            }
        }

        if let Some(budget) = self.config.max_filings {
            if candidates.len() > budget {
                tracing::debug!(
                    selected = candidates.len(),
                    budget,
                    "Sweep budget reached, remaining filings wait for the next sweep"
                );
                candidates.truncate(budget);
            }
        }

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency.max(1)));
        let check_timeout = Duration::from_secs(self.config.check_timeout_secs);
        let mut handles = Vec::with_capacity(candidates.len());

        for filing in candidates {
            let semaphore = semaphore.clone();
            let filings = self.filings.clone();
            let provider = self.provider.clone();
            let key = (filing.id, filing.form_type, filing.submission_id.clone());

            let handle = tokio::spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => {
                        return CheckOutcome::Errored {
                            error: format!("failed to acquire check slot: {}", e),
                        }
                    }
                };

                match tokio::time::timeout(
                    check_timeout,
                    check_filing(filings.as_ref(), provider.as_ref(), &filing),
                )
                .await
                {
                    Ok(Ok(outcome)) => outcome,
                    Ok(Err(e)) => CheckOutcome::Errored {
                        error: e.to_string(),
                    },
                    Err(_) => CheckOutcome::Errored {
                        error: AppError::Transport(format!(
                            "status check timed out after {}s",
                            check_timeout.as_secs()
                        ))
                        .to_string(),
                    },
                }
            });
            handles.push((key, handle));
        }

        let mut results = Vec::with_capacity(handles.len());
        for ((filing_id, form_type, submission_id), handle) in handles {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => CheckOutcome::Errored {
                    error: format!("status check task failed: {}", e),
                },
            };

            let submission = submission_id.as_deref().unwrap_or_default();
            match &outcome {
                CheckOutcome::Updated { from, to, .. } => tracing::info!(
                    filing_id = %filing_id,
                    submission_id = %submission,
                    form_type = %form_type,
                    from = %from,
                    to = %to,
                    "Filing status updated"
                ),
                CheckOutcome::Errored { error } => tracing::warn!(
                    filing_id = %filing_id,
                    submission_id = %submission,
                    form_type = %form_type,
                    error = %error,
                    "Status check failed"
                ),
                CheckOutcome::NoRecords => tracing::debug!(
                    filing_id = %filing_id,
                    submission_id = %submission,
                    "No records found"
                ),
                CheckOutcome::Unchanged { .. } => {}
            }

            results.push(FilingCheckResult {
                filing_id,
                form_type,
                submission_id,
                outcome,
            });
        }

        let report = SweepReport::new(results, selection_errors, started.elapsed());
        tracing::info!(
            checked = report.checked,
            updated = report.updated,
            unchanged = report.unchanged,
            no_records = report.no_records,
            errored = report.errored,
            duration_ms = report.duration_ms,
            "Status sweep finished"
        );
        report
    }
}

/// Background task running a sweep on a fixed interval
pub struct StatusPollScheduler {
    shutdown_tx: mpsc::Sender<()>,
}

impl StatusPollScheduler {
    /// Spawn the scheduler. Returns `None` when the interval is 0 (disabled).
    pub fn start(poller: StatusPoller) -> Option<Self> {
        let interval_secs = poller.config().interval_secs;
        if interval_secs == 0 {
            tracing::info!("Scheduled status polling disabled");
            return None;
        }

        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        tokio::spawn(async move {
            Self::worker_loop(poller, interval_secs, shutdown_rx).await;
        });

        Some(Self { shutdown_tx })
    }

    async fn worker_loop(
        poller: StatusPoller,
        interval_secs: u64,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        let mut poll_interval = interval(Duration::from_secs(interval_secs));
        poll_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(
            interval_secs,
            batch_size = poller.config().batch_size,
            max_concurrency = poller.config().max_concurrency,
            "Status poll scheduler started"
        );

        loop {
            tokio::select! {
                _ = poll_interval.tick() => {
                    poller.sweep().await;
                }
                _ = shutdown_rx.recv() => {
                    tracing::info!("Status poll scheduler shutting down");
                    break;
                }
            }
        }
    }

    /// Gracefully shutdown the scheduler
    pub async fn shutdown(&self) {
        if let Err(e) = self.shutdown_tx.send(()).await {
            tracing::warn!(
                error = %e,
                "Failed to send shutdown signal to status poll scheduler"
            );
        }
    }
}
