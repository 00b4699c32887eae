//! Access to the remote Vault server.
//!
//! The reconcilers only ever see the [`VaultBackend`] trait: list, read,
//! write and delete against slash-delimited paths with JSON key-value
//! payloads. Two implementations ship with the crate:
//!
//! - [`HttpVaultClient`]: the real thing, over reqwest
//! - [`InMemoryVault`]: a path-keyed store with Vault's observable
//!   semantics for mounts, auth backends, policies and plain entries
//!
//! Loosely-typed payload fields are decoded through the accessors in
//! [`value`] rather than ad-hoc casts at each call site.

pub mod client;
pub mod error;
pub mod http;
pub mod memory;
pub mod value;

pub use client::{join_path, VaultBackend, VaultData};
pub use error::{VaultError, VaultResult};
pub use http::HttpVaultClient;
pub use memory::{InMemoryVault, Operation};
