//! ACL policies.

use std::collections::BTreeMap;

use serde_json::json;
use tracing::{debug, error, info, warn};

use crate::errors::Result;
use crate::model::PolicyDefinition;
use crate::vault::value::get_string;
use crate::vault::{join_path, VaultBackend, VaultData};

/// Built-in policies that are never deleted.
pub const PROTECTED_POLICIES: &[&str] = &["root", "default", "response-wrapping"];

/// Existing policies with their rule text.
pub async fn list_policies(vault: &dyn VaultBackend) -> Result<BTreeMap<String, String>> {
    let mut policies = BTreeMap::new();
    for name in vault.list("sys/policy").await? {
        let rules = vault
            .read(&join_path(["sys/policy", &name]))
            .await?
            .map(|data| get_string(&data, "rules", ""))
            .unwrap_or_default();
        debug!(name = %name, "Found existing policy");
        policies.insert(name, rules);
    }
    Ok(policies)
}

/// Write new and changed policies, then delete undeclared ones.
///
/// The server lowercases policy names on write, so declared names are
/// matched against observed ones in lowercase.
///
/// `observed` is consumed: whatever is left once the declared policies are
/// accounted for is a deletion candidate. An empty `desired` list leaves
/// policies unmanaged.
pub async fn reconcile_policies(
    vault: &dyn VaultBackend,
    mut observed: BTreeMap<String, String>,
    desired: &[PolicyDefinition],
) -> Result<()> {
    if desired.is_empty() {
        info!("No policies declared, skipping");
        return Ok(());
    }

    for policy in desired {
        let stored_name = policy.name.to_lowercase();
        if policy.is_ignored() {
            info!(name = %policy.name, "Ignoring policy");
            observed.remove(&stored_name);
            continue;
        }

        match observed.remove(&stored_name) {
            Some(rules) if rules == policy.rules => {
                info!(name = %policy.name, "Keeping unmodified policy");
            }
            Some(_) => {
                warn!(name = %policy.name, "Updating policy");
                apply_policy(vault, policy).await?;
            }
            None => {
                info!(name = %policy.name, "Applying new policy");
                apply_policy(vault, policy).await?;
            }
        }
    }

    for name in observed.keys() {
        if PROTECTED_POLICIES.contains(&name.as_str()) {
            debug!(name = %name, "Refusing to delete built-in policy");
            continue;
        }
        error!(name = %name, "Found runaway policy, deleting");
        vault.delete(&join_path(["sys/policy", name])).await?;
    }

    Ok(())
}

async fn apply_policy(vault: &dyn VaultBackend, policy: &PolicyDefinition) -> Result<()> {
    let mut data = VaultData::new();
    data.insert("rules".to_string(), json!(policy.rules));
    vault.write(&join_path(["sys/policy", &policy.name]), data).await?;
    Ok(())
}
