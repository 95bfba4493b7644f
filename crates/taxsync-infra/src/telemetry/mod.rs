//! Tracing initialization
//!
//! Logs go to stdout through `tracing-subscriber`; the filter comes from `RUST_LOG`
//! and the line format from `LOG_FORMAT` (`text` or `json`).

mod init_basic;

pub use init_basic::{init_telemetry, shutdown_telemetry, LogFormat};
