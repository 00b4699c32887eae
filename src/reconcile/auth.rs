//! Authentication backends.
//!
//! Unlike secret engine mounts, backends that already exist are
//! reconfigured on every run.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::json;
use tracing::{debug, info, warn};

use super::mounts::{read_mount_table, MountEntry, DEFAULT_CONFIG_SUBPATH};
use crate::errors::{Error, Result};
use crate::model::AuthBackend;
use crate::vault::value::{get_map, get_string};
use crate::vault::{join_path, VaultBackend, VaultData};

/// Backends that are never disabled.
pub const EXCLUDED_AUTH_BACKENDS: &[&str] = &["token"];

/// Currently enabled auth backends.
pub async fn list_auth_backends(vault: &dyn VaultBackend) -> Result<BTreeMap<String, MountEntry>> {
    read_mount_table(vault, "sys/auth").await
}

/// Converge enabled auth backends to `desired`.
pub async fn reconcile_auth_backends(vault: &dyn VaultBackend, desired: &[AuthBackend]) -> Result<()> {
    let mut observed = list_auth_backends(vault).await?;
    let mut handled = BTreeSet::new();

    for backend in desired {
        let mut backend = backend.clone();
        if backend.path.is_empty() {
            backend.path = backend.kind.clone();
        }

        if !handled.insert(backend.path.clone()) {
            warn!(path = %backend.path, "Auth backend declared more than once, keeping the first declaration");
            continue;
        }

        if observed.remove(&backend.path).is_some() {
            info!(path = %backend.path, kind = %backend.kind, "Reconfiguring existing auth backend");
        } else {
            enable_auth_backend(vault, &backend).await?;
        }
        configure_auth_backend(vault, &backend).await?;
    }

    for path in observed.keys() {
        if EXCLUDED_AUTH_BACKENDS.contains(&path.as_str()) {
            continue;
        }
        warn!(path = %path, "Disabling runaway auth backend");
        vault.delete(&join_path(["sys/auth", path])).await?;
    }

    Ok(())
}

async fn enable_auth_backend(vault: &dyn VaultBackend, backend: &AuthBackend) -> Result<()> {
    info!(path = %backend.path, kind = %backend.kind, "Adding new auth backend");

    let mut data = VaultData::new();
    data.insert("type".to_string(), json!(backend.kind));
    data.insert("description".to_string(), json!(backend.description));
    vault.write(&join_path(["sys/auth", &backend.path]), data).await?;
    Ok(())
}

/// Write each config section's `properties` to `auth/<path>/<subpath>`.
async fn configure_auth_backend(vault: &dyn VaultBackend, backend: &AuthBackend) -> Result<()> {
    for section in &backend.config {
        let subpath = get_string(section, "path", DEFAULT_CONFIG_SUBPATH);
        let properties = get_map(section, "properties").ok_or_else(|| {
            Error::invalid("auth backend", backend.path.clone(), "config section has no properties")
        })?;

        let config_path = join_path(["auth", backend.path.as_str(), subpath.as_str()]);
        debug!(path = %config_path, "Writing auth backend properties");
        vault.write(&config_path, properties).await?;
    }
    Ok(())
}
