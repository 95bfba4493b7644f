//! Taxsync Services Layer
//!
//! Business services of the filing pipeline: document aggregation, return
//! submission, status polling, OAuth token lifecycle and accounting webhook
//! ingestion, plus the HTTP clients for both providers. The API and CLI crates
//! wire these up; keep HTTP handling out of this crate.

pub mod aggregator;
pub mod notifier;
pub mod poller;
pub mod providers;
pub mod submitter;
pub mod tokens;
pub mod webhooks;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use aggregator::{FilingAggregate, FilingAggregator};
pub use notifier::Notifier;
pub use poller::{CheckOutcome, FilingCheckResult, StatusPollScheduler, StatusPoller, SweepReport};
pub use providers::{AccountingClient, AccountingProvider, EfileClient, EfileProvider};
pub use submitter::{FilingSubmitter, ReturnFigures};
pub use tokens::TokenLifecycleManager;
pub use webhooks::{IngestReport, WebhookIngestor, SIGNATURE_HEADER};
