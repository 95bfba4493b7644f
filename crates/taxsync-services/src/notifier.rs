use std::sync::Arc;
use taxsync_core::models::{Filing, NewNotification, NotificationKind};
use taxsync_db::NotificationStore;

/// In-app notifications for filing events.
///
/// Failures are logged and swallowed: the filing is already durable when a
/// notification is sent, so a lost notification must not undo it.
#[derive(Clone)]
pub struct Notifier {
    store: Arc<dyn NotificationStore>,
}

impl Notifier {
    pub fn new(store: Arc<dyn NotificationStore>) -> Self {
        Self { store }
    }

    #[tracing::instrument(skip(self, filing), fields(filing_id = %filing.id, user_id = %filing.user_id))]
    pub async fn filing_submitted(&self, filing: &Filing) {
        let notification = NewNotification {
            user_id: filing.user_id,
            kind: NotificationKind::FilingSubmitted,
            title: format!("{} tax return submitted", filing.tax_year),
            body: format!(
                "Your {} return was submitted to the IRS e-file provider and is awaiting a decision.",
                filing.tax_year
            ),
            filing_id: Some(filing.id),
        };

        if let Err(e) = self.store.create(&notification).await {
            tracing::warn!(error = %e, "Failed to record filing notification");
        }
    }
}
