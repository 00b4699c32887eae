//! # Connection Settings
//!
//! Where the Vault server lives, how to authenticate, and which document to
//! apply. Settings come from three places, highest priority first:
//!
//! 1. command line flags
//! 2. the JSON settings file (`--config`, default `./config.json`)
//! 3. the standard Vault environment variables (`VAULT_ADDR`, `VAULT_TOKEN`,
//!    `VAULT_CACERT`, `VAULT_CLIENT_CERT`, `VAULT_CLIENT_KEY`,
//!    `VAULT_SKIP_VERIFY`)

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use super::tls::{parse_flag, VaultTlsConfig};
use crate::errors::{Error, Result};

/// Settings file looked up when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "./config.json";

/// Request timeout when none is configured.
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 60;

/// Contents of the JSON settings file. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Path to the desired-state document or directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules: Option<PathBuf>,

    /// Vault server address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Vault token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_file: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cert_file: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_file: Option<PathBuf>,

    /// Accept any server certificate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_skip_verify: Option<bool>,

    /// Per-request timeout
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
}

/// Fully resolved settings for building a Vault client.
#[derive(Clone)]
pub struct VaultConnection {
    pub address: Url,
    pub token: String,
    pub tls: VaultTlsConfig,
    pub timeout: Duration,
}

impl fmt::Debug for VaultConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VaultConnection")
            .field("address", &self.address.as_str())
            .field("token", &"[REDACTED]")
            .field("tls", &self.tls)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ConnectionConfig {
    /// Load settings from a specific file. The file must exist and parse.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::config_with_source(
                format!("Can't load config file at path: {}", path.display()),
                Box::new(e),
            )
        })?;

        serde_json::from_str(&contents).map_err(|e| {
            Error::config_with_source(
                format!("Failed to parse config file: {}", path.display()),
                Box::new(e),
            )
        })
    }

    /// Load the explicitly requested settings file, or the default one when it exists.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load_from_path(path),
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_PATH);
                if default_path.exists() {
                    Self::load_from_path(default_path)
                } else {
                    debug!("No settings file at {}, using flags and environment", DEFAULT_CONFIG_PATH);
                    Ok(Self::default())
                }
            }
        }
    }

    /// Overlay values given on the command line.
    pub fn with_overrides(mut self, url: Option<String>, token: Option<String>) -> Self {
        if url.is_some() {
            self.url = url;
        }
        if token.is_some() {
            self.token = token;
        }
        self
    }

    /// Resolve against the process environment.
    pub fn resolve(&self) -> Result<VaultConnection> {
        self.resolve_with(|key| std::env::var(key).ok())
    }

    /// Resolve against an arbitrary environment lookup.
    pub fn resolve_with<F>(&self, env: F) -> Result<VaultConnection>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |value: Option<String>| value.filter(|v| !v.trim().is_empty());

        let address = non_empty(self.url.clone())
            .or_else(|| non_empty(env("VAULT_ADDR")))
            .ok_or_else(|| Error::config("Can't find address of a Vault server"))?;
        let address = Url::parse(&address).map_err(|e| {
            Error::config_with_source(format!("Invalid Vault address '{}'", address), Box::new(e))
        })?;

        let token = non_empty(self.token.clone())
            .or_else(|| non_empty(env("VAULT_TOKEN")))
            .ok_or_else(|| Error::config("Can't locate token for Vault authentication"))?;

        let env_path = |key: &str| non_empty(env(key)).map(PathBuf::from);
        let tls = VaultTlsConfig {
            ca_file: self.ca_file.clone().or_else(|| env_path("VAULT_CACERT")),
            cert_file: self.cert_file.clone().or_else(|| env_path("VAULT_CLIENT_CERT")),
            key_file: self.key_file.clone().or_else(|| env_path("VAULT_CLIENT_KEY")),
            skip_verify: self
                .tls_skip_verify
                .unwrap_or_else(|| env("VAULT_SKIP_VERIFY").map(|v| parse_flag(&v)).unwrap_or(false)),
        };

        let timeout = Duration::from_secs(self.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS));

        Ok(VaultConnection { address, token, tls, timeout })
    }
}
