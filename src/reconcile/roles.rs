//! Roles under secret engine mounts (`<mount>/roles/<name>`).

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::json;
use tracing::{debug, info, warn};

use super::content::resolve_content;
use crate::errors::Result;
use crate::model::{Mount, RolePolicy};
use crate::vault::{join_path, VaultBackend, VaultData};

/// Role names per mount path.
pub type RolesByMount = BTreeMap<String, Vec<String>>;

/// List the roles of one mount. Engines without a roles listing count as
/// having no roles.
pub async fn list_roles(vault: &dyn VaultBackend, mount_path: &str) -> Vec<String> {
    let roles_path = join_path([mount_path, "roles"]);
    match vault.list(&roles_path).await {
        Ok(roles) => roles,
        Err(err) => {
            info!(path = %roles_path, error = %err, "Can't get list of roles");
            Vec::new()
        }
    }
}

/// Existing roles of every declared mount.
pub async fn list_existing_roles(vault: &dyn VaultBackend, mounts: &[Mount]) -> RolesByMount {
    let mut existing = RolesByMount::new();
    for mount in mounts {
        let roles = list_roles(vault, &mount.path).await;
        info!(mount = %mount.path, roles = ?roles, "Detected existing roles");
        existing.insert(mount.path.clone(), roles);
    }
    existing
}

/// Write every declared role, then delete the roles of declared mounts
/// that are no longer declared.
pub async fn reconcile_roles(vault: &dyn VaultBackend, mounts: &[Mount], roles: &[RolePolicy]) -> Result<()> {
    let mut existing = list_existing_roles(vault, mounts).await;
    let encoded_mounts: Vec<&str> =
        mounts.iter().filter(|m| m.policy_base64_encode).map(|m| m.path.as_str()).collect();

    apply_roles(vault, &encoded_mounts, roles, &mut existing).await?;

    for (mount, leftovers) in &existing {
        if leftovers.is_empty() {
            continue;
        }
        warn!(mount = %mount, roles = ?leftovers, "Found runaway roles, deleting");
        delete_roles(vault, mount, leftovers).await?;
    }
    Ok(())
}

/// Write roles and strike each applied name off `existing`.
pub async fn apply_roles(
    vault: &dyn VaultBackend,
    encoded_mounts: &[&str],
    roles: &[RolePolicy],
    existing: &mut RolesByMount,
) -> Result<()> {
    if roles.is_empty() {
        info!("No roles to apply");
        return Ok(());
    }

    for role in roles {
        let role_path = join_path([role.path.as_str(), "roles", role.name.as_str()]);
        let encode = encoded_mounts.contains(&role.path.as_str());

        let mut data = VaultData::new();
        for (property, value) in &role.properties {
            let resolved = resolve_content(value)?;
            let resolved = if encode { STANDARD.encode(resolved) } else { resolved };
            data.insert(property.clone(), json!(resolved));
        }

        info!(path = %role_path, "Applying role");
        if let Some(response) = vault.write(&role_path, data).await? {
            debug!(path = %role_path, fields = response.len(), "Role write returned data");
        }

        if let Some(names) = existing.get_mut(&role.path) {
            names.retain(|name| name != &role.name);
        }
    }
    Ok(())
}

pub async fn delete_roles(vault: &dyn VaultBackend, mount_path: &str, roles: &[String]) -> Result<()> {
    for role in roles {
        let role_path = join_path([mount_path, "roles", role.as_str()]);
        vault.delete(&role_path).await?;
        info!(path = %role_path, "Deleted role");
    }
    Ok(())
}
