pub mod filings;
pub mod health;
pub mod webhooks;
