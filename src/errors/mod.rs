//! # Error Handling
//!
//! Error types for config2vault. Reconciliation failures carry the stage that
//! failed so the CLI can report a category-qualified message.

mod tls;
mod types;

pub use tls::TlsError;
pub use types::{Error, Result, Stage};
