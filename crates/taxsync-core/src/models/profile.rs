use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[cfg(feature = "sqlx")]
use sqlx::FromRow;

/// Taxpayer identity maintained by the profile screens (read-only here)
#[derive(Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
pub struct TaxpayerProfile {
    pub user_id: Uuid,
    pub ssn: String,
    pub first_name: String,
    pub last_name: String,
    /// Provider filing status code, e.g. `Single`, `MarriedFilingJointly`
    pub filing_status: String,
}

impl TaxpayerProfile {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
    }
}

impl fmt::Debug for TaxpayerProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let last4: String = self
            .ssn
            .chars()
            .filter(char::is_ascii_digit)
            .rev()
            .take(4)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        f.debug_struct("TaxpayerProfile")
            .field("user_id", &self.user_id)
            .field("ssn", &format!("***-**-{}", last4))
            .field("filing_status", &self.filing_status)
            .finish_non_exhaustive()
    }
}
