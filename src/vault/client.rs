//! Remote state accessor trait.

use async_trait::async_trait;
use serde_json::Value;

use super::error::VaultResult;

/// Key-value payload exchanged with Vault: request bodies and the decoded
/// `data` section of responses.
pub type VaultData = serde_json::Map<String, Value>;

/// List/read/write/delete against Vault's hierarchical path namespace.
///
/// Paths are slash-delimited and relative to the API root (no `/v1/`
/// prefix), e.g. `sys/policy/admin` or `pki/roles/web`. Implementations are
/// expected to be idempotent at the transport layer; reconcilers never retry.
#[async_trait]
pub trait VaultBackend: Send + Sync {
    /// List child keys under `path`. Directory-like children end with `/`.
    ///
    /// A path with nothing to list yields an empty vector rather than an
    /// error. Paths whose engine does not implement listing return an error.
    async fn list(&self, path: &str) -> VaultResult<Vec<String>>;

    /// Read the data stored at `path`; `None` when nothing is there.
    async fn read(&self, path: &str) -> VaultResult<Option<VaultData>>;

    /// Write `data` to `path`, returning the response data if the server sent any.
    async fn write(&self, path: &str, data: VaultData) -> VaultResult<Option<VaultData>>;

    /// Delete whatever lives at `path`.
    async fn delete(&self, path: &str) -> VaultResult<()>;
}

/// Join path segments with `/`, dropping empty segments and stray slashes.
pub fn join_path<I, S>(segments: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    segments
        .into_iter()
        .flat_map(|segment| {
            segment
                .as_ref()
                .split('/')
                .filter(|part| !part.is_empty())
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>()
        .join("/")
}
