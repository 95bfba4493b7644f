use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

#[cfg(feature = "sqlx")]
use sqlx::FromRow;

/// Filing lifecycle status. Only moves forward:
/// `pending -> submitted -> {accepted | rejected}`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "filing_status", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum FilingStatus {
    Pending,
    Submitted,
    Accepted,
    Rejected,
}

impl FilingStatus {
    fn rank(self) -> u8 {
        match self {
            FilingStatus::Pending => 0,
            FilingStatus::Submitted => 1,
            FilingStatus::Accepted | FilingStatus::Rejected => 2,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, FilingStatus::Accepted | FilingStatus::Rejected)
    }

    /// Live filings block another submission for the same user, year and form;
    /// only a rejected return can be filed again.
    pub fn is_live(self) -> bool {
        self != FilingStatus::Rejected
    }

    /// Whether moving from `self` to `next` is a forward transition.
    pub fn can_transition_to(self, next: FilingStatus) -> bool {
        next.rank() > self.rank()
    }

    /// Map a provider status string (case-insensitive) onto the lifecycle.
    pub fn from_provider(status: &str) -> Option<FilingStatus> {
        match status.trim().to_lowercase().as_str() {
            "pending" => Some(FilingStatus::Pending),
            "submitted" | "received" | "transmitted" => Some(FilingStatus::Submitted),
            "accepted" => Some(FilingStatus::Accepted),
            "rejected" => Some(FilingStatus::Rejected),
            _ => None,
        }
    }
}

impl Display for FilingStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            FilingStatus::Pending => write!(f, "pending"),
            FilingStatus::Submitted => write!(f, "submitted"),
            FilingStatus::Accepted => write!(f, "accepted"),
            FilingStatus::Rejected => write!(f, "rejected"),
        }
    }
}

impl FromStr for FilingStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(FilingStatus::Pending),
            "submitted" => Ok(FilingStatus::Submitted),
            "accepted" => Ok(FilingStatus::Accepted),
            "rejected" => Ok(FilingStatus::Rejected),
            _ => Err(anyhow::anyhow!("Invalid filing status: {}", s)),
        }
    }
}

/// Supported e-file form types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "form_type"))]
pub enum FormType {
    /// Individual income tax return
    Form1040,
    /// Extension request
    Form4868,
}

impl FormType {
    pub const ALL: [FormType; 2] = [FormType::Form1040, FormType::Form4868];

    /// Path segment used by the provider's endpoints
    pub fn as_path(self) -> &'static str {
        match self {
            FormType::Form1040 => "Form1040",
            FormType::Form4868 => "Form4868",
        }
    }
}

impl Display for FormType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_path())
    }
}

/// One tax-year submission attempt
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
pub struct Filing {
    pub id: Uuid,
    pub user_id: Uuid,
    pub tax_year: i32,
    pub form_type: FormType,
    pub status: FilingStatus,
    pub submission_id: Option<String>,
    pub provider_status: Option<String>,
    pub total_income: Decimal,
    pub total_wages: Decimal,
    pub total_withheld: Decimal,
    pub total_deductions: Decimal,
    pub tax_liability: Decimal,
    pub refund_or_owed: Decimal,
    pub refund_amount: Option<Decimal>,
    pub rejection_reasons: Option<Vec<String>>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Figures persisted when a filing is accepted by the provider for processing
#[derive(Debug, Clone, PartialEq)]
pub struct NewFiling {
    pub user_id: Uuid,
    pub tax_year: i32,
    pub form_type: FormType,
    pub submission_id: String,
    pub provider_status: Option<String>,
    pub total_income: Decimal,
    pub total_wages: Decimal,
    pub total_withheld: Decimal,
    pub total_deductions: Decimal,
    pub tax_liability: Decimal,
    pub refund_or_owed: Decimal,
}

/// Conditional status write produced by the status poller.
///
/// Applied only while the stored status still equals `expected_status`.
#[derive(Debug, Clone, PartialEq)]
pub struct FilingStatusUpdate {
    pub filing_id: Uuid,
    pub expected_status: FilingStatus,
    pub new_status: FilingStatus,
    pub provider_status: String,
    pub rejection_reasons: Option<Vec<String>>,
    /// Written only when no refund amount has been recorded yet
    pub refund_estimate: Option<Decimal>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SubmitFilingRequest {
    pub user_id: Uuid,
    #[validate(range(min = 2000, max = 2100, message = "tax_year is out of range"))]
    pub tax_year: i32,
}
