//! # Error Types
//!
//! Error taxonomy for a config2vault run using `thiserror`.

use std::fmt;
use std::path::PathBuf;

use crate::vault::VaultError;

use super::TlsError;

/// Custom result type for config2vault operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for config2vault
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Configuration errors (missing address/token, unreadable settings)
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// TLS material could not be loaded
    #[error(transparent)]
    Tls(#[from] TlsError),

    /// Any failed call against the Vault server
    #[error("Transport error: {0}")]
    Transport(#[from] VaultError),

    /// I/O errors with additional context
    #[error("I/O error: {context}")]
    Io {
        #[source]
        source: std::io::Error,
        context: String,
    },

    /// A desired-state document could not be parsed
    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// An `@file` reference could not be resolved
    #[error("Failed to load content file {path}: {source}")]
    ContentFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A mount or property bag is malformed in a way the server can't accept
    #[error("Invalid {entity} '{name}': {reason}")]
    Invalid { entity: &'static str, name: String, reason: String },

    /// A reconciliation stage failed; earlier stages stay applied
    #[error("{stage}")]
    Reconcile {
        stage: Stage,
        #[source]
        source: Box<Error>,
    },
}

/// Reconciliation stages, in the order the orchestrator runs them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    AuthBackends,
    Mounts,
    ListPolicies,
    Policies,
    Roles,
    Users,
    AppRoles,
    Secrets,
    TransitKeys,
}

impl Stage {
    /// Short name used for span and log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::AuthBackends => "auth_backends",
            Stage::Mounts => "mounts",
            Stage::ListPolicies => "list_policies",
            Stage::Policies => "policies",
            Stage::Roles => "roles",
            Stage::Users => "users",
            Stage::AppRoles => "approles",
            Stage::Secrets => "secrets",
            Stage::TransitKeys => "transit_keys",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            Stage::AuthBackends => "Failed to update Auth mounts",
            Stage::Mounts => "Failed to update mounts",
            Stage::ListPolicies => "Failed to get list of existing policies",
            Stage::Policies => "Failed to reconcile new and existing policies",
            Stage::Roles => "Failed to apply roles",
            Stage::Users => "Failed to create User Accounts",
            Stage::AppRoles => "Failed to update AppRoles",
            Stage::Secrets => "Failed to update Generic Secrets",
            Stage::TransitKeys => "Failed to update Transit Keys",
        };
        f.write_str(message)
    }
}

impl Error {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config { message: message.into(), source: None }
    }

    /// Create a configuration error with source
    pub fn config_with_source<S: Into<String>>(
        message: S,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::Config { message: message.into(), source: Some(source) }
    }

    /// Create an I/O error with context
    pub fn io<S: Into<String>>(source: std::io::Error, context: S) -> Self {
        Self::Io { source, context: context.into() }
    }

    /// Create an invalid-entity error
    pub fn invalid<N: Into<String>, R: Into<String>>(
        entity: &'static str,
        name: N,
        reason: R,
    ) -> Self {
        Self::Invalid { entity, name: name.into(), reason: reason.into() }
    }

    /// Wrap this error as the failure of a reconciliation stage
    pub fn at_stage(self, stage: Stage) -> Self {
        Self::Reconcile { stage, source: Box::new(self) }
    }

    /// The failed stage, if this is a reconciliation failure
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Error::Reconcile { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Self::Io { source: error, context: "I/O operation failed".to_string() }
    }
}
