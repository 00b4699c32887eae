//! Generic secrets under `secret/`.
//!
//! Every run rewrites all declared secrets and removes every other secret
//! found under the root, even when none are declared.

use std::collections::BTreeSet;

use serde_json::json;
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::model::GenericSecret;
use crate::vault::{join_path, VaultBackend, VaultData};

pub const SECRET_ROOT: &str = "secret";

/// Every secret path under the root, walking directory keys depth first.
pub async fn list_secrets(vault: &dyn VaultBackend) -> Result<BTreeSet<String>> {
    let mut found = BTreeSet::new();
    let mut pending = vec![SECRET_ROOT.to_string()];

    while let Some(dir) = pending.pop() {
        debug!(path = %dir, "Listing secrets");
        for key in vault.list(&dir).await? {
            let full_path = join_path([dir.as_str(), key.as_str()]);
            if key.ends_with('/') {
                pending.push(full_path);
            } else {
                found.insert(full_path);
            }
        }
    }

    debug!(count = found.len(), "Found secrets");
    Ok(found)
}

/// Write one secret's fields as a flat key-value payload.
pub async fn write_secret(vault: &dyn VaultBackend, path: &str, secret: &GenericSecret) -> Result<()> {
    let data: VaultData =
        secret.fields.iter().map(|field| (field.key.clone(), json!(field.value))).collect();
    vault.write(path, data).await?;
    info!(path = %path, "Created secret");
    Ok(())
}

pub async fn reconcile_secrets(vault: &dyn VaultBackend, desired: &[GenericSecret]) -> Result<()> {
    let mut observed = list_secrets(vault).await?;

    if desired.is_empty() {
        info!("No secrets to apply");
    }

    for secret in desired {
        let path = join_path([SECRET_ROOT, secret.path.as_str()]);
        observed.remove(&path);
        write_secret(vault, &path, secret).await?;
    }

    for path in &observed {
        warn!(path = %path, "Deleting leftover secret");
        vault.delete(path).await?;
    }

    Ok(())
}
