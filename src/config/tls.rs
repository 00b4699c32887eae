use std::path::PathBuf;

use reqwest::{Certificate, ClientBuilder, Identity};

use crate::errors::TlsError;

/// TLS material for talking to an `https` Vault address.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VaultTlsConfig {
    pub ca_file: Option<PathBuf>,
    pub cert_file: Option<PathBuf>,
    pub key_file: Option<PathBuf>,
    pub skip_verify: bool,
}

impl VaultTlsConfig {
    /// Install the CA bundle, client identity and verification mode on a
    /// reqwest client builder.
    pub fn apply(&self, mut builder: ClientBuilder) -> Result<ClientBuilder, TlsError> {
        if let Some(path) = &self.ca_file {
            let pem = std::fs::read(path)
                .map_err(|source| TlsError::CaReadError { path: path.clone(), source })?;
            let certificate = Certificate::from_pem(&pem)
                .map_err(|source| TlsError::InvalidCaPem { path: path.clone(), source })?;
            builder = builder.add_root_certificate(certificate);
        }

        match (&self.cert_file, &self.key_file) {
            (Some(cert_path), Some(key_path)) => {
                let mut pem = std::fs::read(cert_path).map_err(|source| {
                    TlsError::CertificateReadError { path: cert_path.clone(), source }
                })?;
                let key = std::fs::read(key_path).map_err(|source| {
                    TlsError::PrivateKeyReadError { path: key_path.clone(), source }
                })?;
                pem.push(b'\n');
                pem.extend_from_slice(&key);

                let identity = Identity::from_pem(&pem).map_err(|source| {
                    TlsError::InvalidIdentity { path: cert_path.clone(), source }
                })?;
                builder = builder.identity(identity);
            }
            (Some(cert_path), None) => {
                return Err(TlsError::MissingPrivateKeyPath { path: cert_path.clone() });
            }
            (None, Some(key_path)) => {
                return Err(TlsError::MissingCertificatePath { path: key_path.clone() });
            }
            (None, None) => {}
        }

        if self.skip_verify {
            tracing::warn!("TLS certificate verification is disabled for the Vault connection");
            builder = builder.danger_accept_invalid_certs(true);
        }

        Ok(builder)
    }
}

/// Interpret the usual truthy spellings of an environment flag.
pub fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
