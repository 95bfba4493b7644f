//! Test helpers for service unit tests
//!
//! In-memory stores and provider doubles, plus fixtures, so the filing services
//! can be exercised without a database or network.

pub mod fixtures;
pub mod mock_providers;
pub mod mock_stores;

pub use fixtures::*;
pub use mock_providers::*;
pub use mock_stores::*;
