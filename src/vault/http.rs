//! HTTP implementation of [`VaultBackend`] against Vault's `/v1` API.
//!
//! Every request carries the `X-Vault-Token` header. Responses are decoded
//! once here: callers only ever see the `data` section of Vault's envelope.
//! Request and response bodies are never logged since they routinely carry
//! secret material.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::Value;
use tracing::{debug, trace};

use super::client::{VaultBackend, VaultData};
use super::error::{VaultError, VaultResult};
use super::value::get_string_array;
use crate::config::VaultConnection;
use crate::errors::Result;

/// Envelope fields Vault puts next to `data`; stripped when a response has
/// no `data` section and the payload lives at the top level instead.
const ENVELOPE_FIELDS: &[&str] =
    &["request_id", "lease_id", "renewable", "lease_duration", "wrap_info", "warnings", "auth"];

const TOKEN_HEADER: &str = "X-Vault-Token";

/// Vault client speaking plain HTTP(S) with a static token.
#[derive(Debug, Clone)]
pub struct HttpVaultClient {
    client: Client,
    address: String,
    token: String,
}

impl HttpVaultClient {
    /// Build a client for the resolved connection settings.
    ///
    /// TLS material is only consulted for `https` addresses.
    pub fn new(connection: &VaultConnection) -> Result<Self> {
        let mut builder = Client::builder().timeout(connection.timeout);

        if connection.address.scheme() == "https" {
            builder = connection.tls.apply(builder)?;
        } else {
            debug!("Created non-TLS client");
        }

        let client = builder.build().map_err(|e| {
            crate::Error::config_with_source("Failed to build Vault HTTP client", Box::new(e))
        })?;

        Ok(Self {
            client,
            address: connection.address.as_str().trim_end_matches('/').to_string(),
            token: connection.token.clone(),
        })
    }

    /// The server address this client talks to.
    pub fn address(&self) -> &str {
        &self.address
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.address, path.trim_start_matches('/'))
    }

    fn request(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.header(TOKEN_HEADER, &self.token)
    }

    /// Send a request and return the decoded body, `None` for empty bodies
    /// and, when `allow_missing` is set, for 404 responses.
    async fn execute(
        &self,
        method: &'static str,
        path: &str,
        request: RequestBuilder,
        allow_missing: bool,
    ) -> VaultResult<Option<Value>> {
        debug!(method = method, path = %path, "Vault request");

        let response = request.send().await.map_err(|source| VaultError::Request {
            method,
            path: path.to_string(),
            source,
        })?;

        let status = response.status();
        trace!(method = method, path = %path, status = %status, "Vault response");

        if status == StatusCode::NOT_FOUND && allow_missing {
            return Ok(None);
        }

        let body = response.text().await.map_err(|source| VaultError::Request {
            method,
            path: path.to_string(),
            source,
        })?;

        if !status.is_success() {
            return Err(VaultError::http(method, path, status.as_u16(), parse_errors(&body)));
        }

        if status == StatusCode::NO_CONTENT || body.trim().is_empty() {
            return Ok(None);
        }

        serde_json::from_str(&body)
            .map(Some)
            .map_err(|e| VaultError::decode(path, format!("invalid JSON body: {}", e)))
    }
}

#[async_trait]
impl VaultBackend for HttpVaultClient {
    async fn list(&self, path: &str) -> VaultResult<Vec<String>> {
        let request = self.request(self.client.get(self.url(path)).query(&[("list", "true")]));
        let body = self.execute("LIST", path, request, true).await?;

        Ok(match decode_envelope(path, body)? {
            Some(data) => get_string_array(&data, "keys", &[]),
            None => Vec::new(),
        })
    }

    async fn read(&self, path: &str) -> VaultResult<Option<VaultData>> {
        let request = self.request(self.client.get(self.url(path)));
        let body = self.execute("GET", path, request, true).await?;
        decode_envelope(path, body)
    }

    async fn write(&self, path: &str, data: VaultData) -> VaultResult<Option<VaultData>> {
        let request = self.request(self.client.post(self.url(path)).json(&data));
        let body = self.execute("POST", path, request, false).await?;
        decode_envelope(path, body)
    }

    async fn delete(&self, path: &str) -> VaultResult<()> {
        let request = self.request(self.client.delete(self.url(path)));
        self.execute("DELETE", path, request, true).await?;
        Ok(())
    }
}

/// Extract the payload from Vault's response envelope.
fn decode_envelope(path: &str, body: Option<Value>) -> VaultResult<Option<VaultData>> {
    let mut object = match body {
        None => return Ok(None),
        Some(Value::Object(object)) => object,
        Some(_) => return Err(VaultError::decode(path, "response body is not a JSON object")),
    };

    match object.remove("data") {
        Some(Value::Object(data)) => Ok(Some(data)),
        Some(Value::Null) | None => {
            for field in ENVELOPE_FIELDS {
                object.remove(*field);
            }
            Ok(if object.is_empty() { None } else { Some(object) })
        }
        Some(_) => Err(VaultError::decode(path, "'data' is not a JSON object")),
    }
}

/// Pull the `errors` array out of an error body, falling back to the raw text.
fn parse_errors(body: &str) -> Vec<String> {
    let parsed: Option<Vec<String>> = serde_json::from_str::<Value>(body).ok().and_then(|v| {
        v.get("errors")?.as_array().map(|errors| {
            errors.iter().map(|e| e.as_str().map(str::to_string).unwrap_or_else(|| e.to_string())).collect()
        })
    });

    match parsed {
        Some(errors) => errors,
        None if body.trim().is_empty() => Vec::new(),
        None => vec![body.trim().to_string()],
    }
}
