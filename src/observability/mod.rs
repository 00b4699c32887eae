//! # Observability
//!
//! Structured logging for a reconciliation run.

pub mod logging;

pub use logging::{filter_directive, init_logging, DEFAULT_LOG_LEVEL};
