//! Error types for calls against the Vault server.

use thiserror::Error;

/// Result type for Vault accessor operations.
pub type VaultResult<T> = std::result::Result<T, VaultError>;

/// Errors that can occur while talking to Vault.
#[derive(Error, Debug)]
pub enum VaultError {
    /// The server answered with a non-success status.
    #[error("{method} {path} failed with status {status}: {}", .errors.join("; "))]
    Http { method: &'static str, path: String, status: u16, errors: Vec<String> },

    /// The request never produced a response (connection, TLS, timeout).
    #[error("{method} {path} could not be sent: {source}")]
    Request {
        method: &'static str,
        path: String,
        #[source]
        source: reqwest::Error,
    },

    /// The response body was not the expected JSON envelope.
    #[error("Unexpected response for {path}: {message}")]
    Decode { path: String, message: String },

    /// The path exists but does not support the requested operation.
    #[error("{operation} is not supported at {path}")]
    Unsupported { operation: &'static str, path: String },
}

impl VaultError {
    /// Create an HTTP status error.
    pub fn http(
        method: &'static str,
        path: impl Into<String>,
        status: u16,
        errors: Vec<String>,
    ) -> Self {
        Self::Http { method, path: path.into(), status, errors }
    }

    /// Create a decode error.
    pub fn decode(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode { path: path.into(), message: message.into() }
    }

    /// Create an unsupported-operation error.
    pub fn unsupported(operation: &'static str, path: impl Into<String>) -> Self {
        Self::Unsupported { operation, path: path.into() }
    }

    /// HTTP status code, when the server produced one.
    pub fn status(&self) -> Option<u16> {
        match self {
            VaultError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_error_display() {
        let err = VaultError::http(
            "POST",
            "sys/mounts/pki",
            400,
            vec!["path is already in use at pki/".to_string()],
        );
        assert_eq!(
            err.to_string(),
            "POST sys/mounts/pki failed with status 400: path is already in use at pki/"
        );
        assert_eq!(err.status(), Some(400));
    }

    #[test]
    fn test_unsupported_has_no_status() {
        let err = VaultError::unsupported("list", "transit/roles");
        assert!(err.status().is_none());
        assert!(err.to_string().contains("transit/roles"));
    }
}
