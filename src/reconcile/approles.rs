//! AppRoles under `auth/approle/role`.
//!
//! Listing only yields names, so full role records are read lazily the
//! first time a declared role needs comparing. Duration fields are compared
//! in seconds because the server stores them that way.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::json;
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::model::AppRoleProperties;
use crate::vault::value::{get_bool, get_int, get_string, get_string_array, parse_duration_secs, split_list};
use crate::vault::{join_path, VaultBackend, VaultData};

pub const APPROLE_ROOT: &str = "auth/approle/role";

/// Policy every token carries whether declared or not.
const IMPLICIT_POLICY: &str = "default";

/// Listed AppRole names, hydrated to full records on first access.
#[derive(Debug, Default)]
pub struct AppRoleCache {
    roles: BTreeMap<String, Option<AppRoleProperties>>,
}

impl AppRoleCache {
    /// List existing AppRoles. A missing or unlistable backend yields an empty cache.
    pub async fn load(vault: &dyn VaultBackend) -> Self {
        let names = match vault.list(APPROLE_ROOT).await {
            Ok(names) => names,
            Err(err) => {
                info!(error = %err, "Can't list AppRoles, assuming none");
                Vec::new()
            }
        };
        info!(count = names.len(), "Found AppRoles");
        Self { roles: names.into_iter().map(|name| (name, None)).collect() }
    }

    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.roles.keys()
    }

    /// The stored role, reading it from the server on a cache miss.
    pub async fn get(&mut self, vault: &dyn VaultBackend, name: &str) -> Result<Option<AppRoleProperties>> {
        if let Some(Some(role)) = self.roles.get(name) {
            return Ok(Some(role.clone()));
        }

        let role = read_app_role(vault, name).await?;
        if let Some(role) = &role {
            self.roles.insert(name.to_string(), Some(role.clone()));
        }
        Ok(role)
    }

    fn remember(&mut self, role: &AppRoleProperties) {
        self.roles.insert(role.name.clone(), Some(role.clone()));
    }
}

/// Read one AppRole. Missing fields get values no declaration can match.
pub async fn read_app_role(vault: &dyn VaultBackend, name: &str) -> Result<Option<AppRoleProperties>> {
    debug!(name = %name, "Retrieving AppRole");
    let Some(data) = vault.read(&join_path([APPROLE_ROOT, name])).await? else {
        return Ok(None);
    };

    Ok(Some(AppRoleProperties {
        name: name.to_string(),
        policies: get_string_array(&data, "policies", &[]),
        secret_id_ttl: get_string(&data, "secret_id_ttl", "-1"),
        token_ttl: get_string(&data, "token_ttl", "-1"),
        token_max_ttl: get_string(&data, "token_max_ttl", "-1"),
        secret_id_num_uses: get_int(&data, "secret_id_num_uses", -1),
        bind_secret_id: get_bool(&data, "bind_secret_id", true),
        period: get_string(&data, "period", "-1"),
        bound_cidr_list: get_string_array(&data, "bound_cidr_list", &[]).join(","),
    }))
}

/// Compare two durations in seconds, falling back to the raw text.
fn same_duration(a: &str, b: &str) -> bool {
    match (parse_duration_secs(a), parse_duration_secs(b)) {
        (Some(a), Some(b)) => a == b,
        _ => a == b,
    }
}

/// Set equality, ignoring entries in `ignore` on either side.
fn same_set(left: &[String], right: &[String], ignore: &[&str]) -> bool {
    let keep = |items: &[String]| -> BTreeSet<String> {
        items.iter().filter(|item| !ignore.contains(&item.as_str())).cloned().collect()
    };
    keep(left) == keep(right)
}

/// Whether `observed` already satisfies `desired`.
pub fn matches(observed: &AppRoleProperties, desired: &AppRoleProperties) -> bool {
    same_duration(&observed.secret_id_ttl, &desired.secret_id_ttl)
        && same_duration(&observed.token_ttl, &desired.token_ttl)
        && same_duration(&observed.token_max_ttl, &desired.token_max_ttl)
        && same_duration(&observed.period, &desired.period)
        && observed.secret_id_num_uses == desired.secret_id_num_uses
        && observed.bind_secret_id == desired.bind_secret_id
        && same_set(&split_list(&observed.bound_cidr_list), &split_list(&desired.bound_cidr_list), &[])
        && same_set(&observed.policies, &desired.policies, &[IMPLICIT_POLICY])
}

fn duration_value(value: &str) -> serde_json::Value {
    if value.is_empty() {
        json!("0")
    } else {
        json!(value)
    }
}

/// Create or overwrite an AppRole.
pub async fn write_app_role(vault: &dyn VaultBackend, role: &AppRoleProperties) -> Result<()> {
    let mut data = VaultData::new();
    data.insert("secret_id_ttl".to_string(), duration_value(&role.secret_id_ttl));
    data.insert("token_ttl".to_string(), duration_value(&role.token_ttl));
    data.insert("token_max_ttl".to_string(), duration_value(&role.token_max_ttl));
    data.insert("period".to_string(), duration_value(&role.period));
    data.insert("secret_id_num_uses".to_string(), json!(role.secret_id_num_uses));
    data.insert("bind_secret_id".to_string(), json!(role.bind_secret_id));
    data.insert("bound_cidr_list".to_string(), json!(role.bound_cidr_list));
    data.insert("policies".to_string(), json!(role.policies.join(",")));

    let path = join_path([APPROLE_ROOT, role.name.as_str()]);
    vault.write(&path, data).await?;
    info!(name = %role.name, "Created or updated AppRole");

    // The role id is informational only; the role is already written.
    match vault.read(&join_path([path.as_str(), "role-id"])).await {
        Ok(info) => {
            let role_id = info.map(|info| get_string(&info, "role_id", "")).unwrap_or_default();
            debug!(name = %role.name, role_id = %role_id, "AppRole role id");
        }
        Err(err) => warn!(name = %role.name, error = %err, "Can't read AppRole role id"),
    }
    Ok(())
}

/// Converge AppRoles to `desired`. An empty list leaves AppRoles unmanaged.
pub async fn reconcile_app_roles(vault: &dyn VaultBackend, desired: &[AppRoleProperties]) -> Result<()> {
    if desired.is_empty() {
        info!("No AppRoles to apply");
        return Ok(());
    }

    let mut cache = AppRoleCache::load(vault).await;
    let mut declared = BTreeSet::new();

    for role in desired {
        declared.insert(role.name.clone());

        match cache.get(vault, &role.name).await? {
            Some(current) if matches(&current, role) => {
                debug!(name = %role.name, "AppRole unchanged");
                continue;
            }
            Some(_) => warn!(name = %role.name, "AppRole differs, updating"),
            None => info!(name = %role.name, "Creating AppRole"),
        }

        write_app_role(vault, role).await?;
        cache.remember(role);
    }

    let runaway: Vec<String> = cache.names().filter(|name| !declared.contains(*name)).cloned().collect();
    for name in runaway {
        warn!(name = %name, "Deleting runaway AppRole");
        vault.delete(&join_path([APPROLE_ROOT, name.as_str()])).await?;
    }

    Ok(())
}
