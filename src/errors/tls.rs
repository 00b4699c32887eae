use std::path::PathBuf;

use thiserror::Error;

/// TLS-specific error variants surfaced while building the Vault HTTP client.
#[derive(Debug, Error)]
pub enum TlsError {
    /// A client certificate was configured without its private key.
    #[error("Client certificate {path} is configured but the private key path is not")]
    MissingPrivateKeyPath { path: PathBuf },

    /// A client key was configured without its certificate.
    #[error("Client key {path} is configured but the certificate path is not")]
    MissingCertificatePath { path: PathBuf },

    /// The CA bundle could not be read.
    #[error("Failed to read CA bundle at {path}: {source}")]
    CaReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The client certificate file could not be read.
    #[error("Failed to read certificate at {path}: {source}")]
    CertificateReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The client private key file could not be read.
    #[error("Failed to read private key at {path}: {source}")]
    PrivateKeyReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The CA bundle is not a valid PEM certificate.
    #[error("CA bundle {path} is not a valid PEM: {source}")]
    InvalidCaPem {
        path: PathBuf,
        #[source]
        source: reqwest::Error,
    },

    /// The certificate and key do not form a usable identity.
    #[error("Client certificate {path} and its key do not form a valid identity: {source}")]
    InvalidIdentity {
        path: PathBuf,
        #[source]
        source: reqwest::Error,
    },
}
