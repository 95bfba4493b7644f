//! Filing submitter.
//!
//! Computes the return figures from the aggregated documents, creates the return
//! at the e-file provider and records the filing once the provider has assigned a
//! submission id. A transport failure is returned to the caller; no filing row is
//! written without a real submission id.

use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use taxsync_core::models::{Filing, FormType, NewFiling, TaxpayerProfile};
use taxsync_core::{AppError, BracketSchedule};
use taxsync_db::{FilingStore, ProfileStore};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::aggregator::{FilingAggregate, FilingAggregator};
use crate::notifier::Notifier;
use crate::providers::{EfileProvider, Form1040Data, ReturnData, ReturnHeader, ReturnPayload};

/// Return figures derived from an aggregate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReturnFigures {
    pub taxable_income: Decimal,
    pub tax_liability: Decimal,
    /// Positive = refund, negative = amount owed
    pub refund_or_owed: Decimal,
}

impl ReturnFigures {
    pub fn compute(aggregate: &FilingAggregate, schedule: &BracketSchedule) -> Self {
        let taxable_income = aggregate.taxable_income();
        let tax_liability = schedule.liability(taxable_income);
        Self {
            taxable_income,
            tax_liability,
            refund_or_owed: aggregate.total_withheld - tax_liability,
        }
    }
}

fn build_payload(
    profile: &TaxpayerProfile,
    aggregate: &FilingAggregate,
    figures: &ReturnFigures,
) -> ReturnPayload {
    ReturnPayload {
        return_header: ReturnHeader {
            tax_year: aggregate.tax_year,
            taxpayer_ssn: profile.ssn.clone(),
            taxpayer_name: profile.full_name(),
        },
        return_data: ReturnData {
            form_1040: Form1040Data {
                filing_status: profile.filing_status.clone(),
                wages: aggregate.total_wages,
                tax_withheld: aggregate.total_withheld,
                taxable_income: figures.taxable_income,
                total_tax: figures.tax_liability,
                refund_or_amount_owed: figures.refund_or_owed,
            },
        },
    }
}

#[derive(Clone)]
pub struct FilingSubmitter {
    aggregator: FilingAggregator,
    profiles: Arc<dyn ProfileStore>,
    filings: Arc<dyn FilingStore>,
    provider: Arc<dyn EfileProvider>,
    notifier: Notifier,
    /// Serializes submissions per user and year so the duplicate check and the
    /// insert cannot interleave with a concurrent request.
    submit_locks: Arc<Mutex<HashMap<(Uuid, i32), Arc<Mutex<()>>>>>,
}

impl FilingSubmitter {
    pub fn new(
        aggregator: FilingAggregator,
        profiles: Arc<dyn ProfileStore>,
        filings: Arc<dyn FilingStore>,
        provider: Arc<dyn EfileProvider>,
        notifier: Notifier,
    ) -> Self {
        Self {
            aggregator,
            profiles,
            filings,
            provider,
            notifier,
            submit_locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    async fn submit_lock(&self, user_id: Uuid, tax_year: i32) -> Arc<Mutex<()>> {
        let mut locks = self.submit_locks.lock().await;
        locks
            .entry((user_id, tax_year))
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Submit the user's Form 1040 for `tax_year`.
    #[tracing::instrument(skip(self), fields(user_id = %user_id, tax_year = tax_year))]
    pub async fn submit(&self, user_id: Uuid, tax_year: i32) -> Result<Filing, AppError> {
        let schedule = BracketSchedule::for_year(tax_year)
            .ok_or(AppError::UnsupportedTaxYear(tax_year))?;

        let profile = self.profiles.get_profile(user_id).await?.ok_or_else(|| {
            AppError::InvalidInput(format!("no taxpayer profile for user {}", user_id))
        })?;

        let lock = self.submit_lock(user_id, tax_year).await;
        let _guard = lock.lock().await;

        if let Some(existing) = self
            .filings
            .find_active(user_id, tax_year, FormType::Form1040)
            .await?
        {
            return Err(AppError::Conflict(format!(
                "filing {} for tax year {} is already {}",
                existing.id, tax_year, existing.status
            )));
        }

        let aggregate = self.aggregator.aggregate(user_id, tax_year).await?;
        let figures = ReturnFigures::compute(&aggregate, schedule);
        let payload = build_payload(&profile, &aggregate, &figures);

        let submission = match self.provider.create_filing(&payload).await {
            Ok(submission) => submission,
            Err(e) => {
                tracing::error!(error = %e, "E-file submission failed");
                return Err(e);
            }
        };

        let filing = self
            .filings
            .insert_submitted(&NewFiling {
                user_id,
                tax_year,
                form_type: FormType::Form1040,
                submission_id: submission.submission_id.clone(),
                provider_status: submission.status.clone(),
                total_income: aggregate.total_income,
                total_wages: aggregate.total_wages,
                total_withheld: aggregate.total_withheld,
                total_deductions: aggregate.total_deductions,
                tax_liability: figures.tax_liability,
                refund_or_owed: figures.refund_or_owed,
            })
            .await
            .map_err(|e| {
                // provider now holds a return with no local row
                tracing::error!(
                    submission_id = %submission.submission_id,
                    error = %e,
                    "Provider accepted the return but the filing could not be stored"
                );
                e
            })?;

        tracing::info!(
            filing_id = %filing.id,
            submission_id = %submission.submission_id,
            tax_liability = %figures.tax_liability,
            refund_or_owed = %figures.refund_or_owed,
            "Filing submitted"
        );

        self.notifier.filing_submitted(&filing).await;

        Ok(filing)
    }
}
