//! # config2vault
//!
//! Converges the configuration of a HashiCorp Vault server onto a
//! declarative YAML document: secret engine mounts, auth backends, ACL
//! policies, mount roles, userpass accounts, AppRoles, generic secrets and
//! transit keys.
//!
//! ## Architecture
//!
//! ```text
//! YAML documents → model::VaultConfig → reconcile::reconcile → VaultBackend → Vault
//!                                             ↓
//!                          one reconciler per category, fixed order
//! ```
//!
//! Each category reconciler diffs the declared records against what the
//! server reports and issues the creates, updates and deletes needed to
//! close the gap. A run is one-shot and not transactional.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use config2vault::{config::ConnectionConfig, model, reconcile, vault::HttpVaultClient, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let connection = ConnectionConfig::load(None)?.resolve()?;
//!     let document = model::load_path(std::path::Path::new("acls/"))?;
//!     let client = HttpVaultClient::new(&connection)?;
//!     reconcile::reconcile(&client, &document).await
//! }
//! ```

pub mod cli;
pub mod config;
pub mod errors;
pub mod model;
pub mod observability;
pub mod reconcile;
pub mod vault;

// Re-export commonly used types and traits
pub use errors::{Error, Result, Stage};
pub use model::VaultConfig;
pub use vault::{HttpVaultClient, InMemoryVault, VaultBackend};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
