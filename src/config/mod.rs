//! # Configuration Management
//!
//! Connection settings for the Vault server. The desired-state document
//! itself lives in [`crate::model`].

pub mod settings;
pub mod tls;

pub use settings::{ConnectionConfig, VaultConnection, DEFAULT_CONFIG_PATH, DEFAULT_TIMEOUT_SECONDS};
pub use tls::VaultTlsConfig;
