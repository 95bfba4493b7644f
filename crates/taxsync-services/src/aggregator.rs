//! Filing aggregator.
//!
//! Folds a user's completed documents for one tax year into the totals a return
//! needs. Documents are a read model here and are never written.

use rust_decimal::Decimal;
use std::sync::Arc;
use taxsync_core::models::{DocumentExtract, ParsedDocument};
use taxsync_core::AppError;
use taxsync_db::DocumentStore;
use uuid::Uuid;

/// Totals over the eligible documents of one user and tax year
#[derive(Debug, Clone, PartialEq)]
pub struct FilingAggregate {
    pub user_id: Uuid,
    pub tax_year: i32,
    /// Wages plus 1099-family income
    pub total_income: Decimal,
    pub total_wages: Decimal,
    pub total_withheld: Decimal,
    pub total_deductions: Decimal,
    pub extracts: Vec<ParsedDocument>,
}

impl FilingAggregate {
    fn empty(user_id: Uuid, tax_year: i32) -> Self {
        Self {
            user_id,
            tax_year,
            total_income: Decimal::ZERO,
            total_wages: Decimal::ZERO,
            total_withheld: Decimal::ZERO,
            total_deductions: Decimal::ZERO,
            extracts: Vec::new(),
        }
    }

    /// `max(0, income - deductions)`
    pub fn taxable_income(&self) -> Decimal {
        (self.total_income - self.total_deductions).max(Decimal::ZERO)
    }

    fn add(&mut self, document: ParsedDocument) {
        match &document.extract {
            DocumentExtract::W2(w2) => {
                self.total_wages += w2.wages.value();
                self.total_income += w2.wages.value();
                self.total_withheld += w2.federal_income_tax_withheld.value();
            }
            DocumentExtract::Form1099 { data, .. } => {
                self.total_income += data.income.value();
                self.total_withheld += data.federal_income_tax_withheld.value();
            }
            DocumentExtract::Other { .. } => {}
        }
        self.total_deductions += document
            .deductions
            .iter()
            .map(|d| d.amount.value())
            .sum::<Decimal>();
        self.extracts.push(document);
    }
}

#[derive(Clone)]
pub struct FilingAggregator {
    documents: Arc<dyn DocumentStore>,
}

impl FilingAggregator {
    pub fn new(documents: Arc<dyn DocumentStore>) -> Self {
        Self { documents }
    }

    /// Aggregate the user's completed documents for `tax_year`.
    ///
    /// Fails with `NoEligibleDocuments` when nothing is left after filtering, and
    /// with `InvalidDocumentData` when a wage or 1099 document cannot be decoded.
    #[tracing::instrument(skip(self), fields(user_id = %user_id, tax_year = tax_year))]
    pub async fn aggregate(&self, user_id: Uuid, tax_year: i32) -> Result<FilingAggregate, AppError> {
        let documents = self.documents.list_completed(user_id).await?;

        let mut aggregate = FilingAggregate::empty(user_id, tax_year);
        for document in documents
            .iter()
            .filter(|d| d.is_completed())
            .filter(|d| d.tax_year.map_or(true, |year| year == tax_year))
        {
            aggregate.add(document.parse()?);
        }

        if aggregate.extracts.is_empty() {
            return Err(AppError::NoEligibleDocuments { user_id, tax_year });
        }

        tracing::debug!(
            documents = aggregate.extracts.len(),
            total_income = %aggregate.total_income,
            total_withheld = %aggregate.total_withheld,
            total_deductions = %aggregate.total_deductions,
            "Aggregated filing documents"
        );

        Ok(aggregate)
    }
}
