//! Secret engine mounts.
//!
//! Missing mounts are created and configured. Mounts that already exist at
//! a declared path are left alone, including their lease TTLs and config.
//! Undeclared mounts are unmounted unless they are built in.
//!
//! Only `cubbyhole`, `sys` and `secret` count as built in. Servers that also
//! carry an `identity` mount refuse to unmount it, which fails the stage
//! unless that mount is declared.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use super::content::resolve_content;
use crate::errors::Result;
use crate::model::Mount;
use crate::vault::value::{get_map, get_string};
use crate::vault::{join_path, VaultBackend, VaultData};

/// Mounts that exist on every server and are never removed.
pub const EXCLUDED_MOUNTS: &[&str] = &["cubbyhole", "sys", "secret"];

/// Sub-path used for a config section that does not name one.
pub const DEFAULT_CONFIG_SUBPATH: &str = "config";

/// A mount or auth backend as reported by the server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MountEntry {
    pub kind: String,
    pub description: String,
}

/// Read a `sys/mounts` style table into `path -> entry`, without the
/// trailing slash Vault puts on every key.
pub(crate) async fn read_mount_table(
    vault: &dyn VaultBackend,
    table: &str,
) -> Result<BTreeMap<String, MountEntry>> {
    let data = vault.read(table).await?.unwrap_or_default();

    let mut mounts = BTreeMap::new();
    for (path, value) in &data {
        let Value::Object(details) = value else {
            continue;
        };
        let entry = MountEntry {
            kind: get_string(details, "type", ""),
            description: get_string(details, "description", ""),
        };
        info!(table = %table, path = %path, kind = %entry.kind, description = %entry.description, "Found mount");
        mounts.insert(path.trim_end_matches('/').to_string(), entry);
    }
    debug!(table = %table, count = mounts.len(), "Listed mounts");
    Ok(mounts)
}

/// Currently mounted secret engines.
pub async fn list_mounts(vault: &dyn VaultBackend) -> Result<BTreeMap<String, MountEntry>> {
    read_mount_table(vault, "sys/mounts").await
}

/// Converge mounted secret engines to `desired`.
pub async fn reconcile_mounts(vault: &dyn VaultBackend, desired: &[Mount]) -> Result<()> {
    let mut observed = list_mounts(vault).await?;
    let mut handled = BTreeSet::new();

    for mount in desired {
        let mut mount = mount.clone();
        if mount.path.is_empty() {
            mount.path = mount.kind.clone();
        }

        if !handled.insert(mount.path.clone()) {
            warn!(path = %mount.path, "Mount declared more than once, keeping the first declaration");
            continue;
        }

        if observed.remove(&mount.path).is_some() {
            info!(path = %mount.path, kind = %mount.kind, "Skipping existing mount");
            continue;
        }

        add_mount(vault, &mount).await?;

        if let Err(err) = apply_mount_config(vault, &mount).await {
            error!(path = %mount.path, error = %err, "Failed to configure new mount, unmounting");
            unmount(vault, &mount.path).await?;
            return Err(err);
        }
        debug!(path = %mount.path, "Mount has been added");
    }

    for path in observed.keys() {
        if EXCLUDED_MOUNTS.contains(&path.as_str()) {
            continue;
        }
        warn!(path = %path, "Found unmanaged mount, removing");
        unmount(vault, path).await?;
    }

    Ok(())
}

async fn add_mount(vault: &dyn VaultBackend, mount: &Mount) -> Result<()> {
    info!(path = %mount.path, kind = %mount.kind, "Adding new mount");

    let mut config = VaultData::new();
    if !mount.default_lease_ttl.is_empty() {
        config.insert("default_lease_ttl".to_string(), json!(mount.default_lease_ttl));
    }
    if !mount.max_lease_ttl.is_empty() {
        config.insert("max_lease_ttl".to_string(), json!(mount.max_lease_ttl));
    }

    let mut data = VaultData::new();
    data.insert("type".to_string(), json!(mount.kind));
    data.insert("description".to_string(), json!(mount.description));
    data.insert("config".to_string(), Value::Object(config));

    vault.write(&join_path(["sys/mounts", &mount.path]), data).await?;
    Ok(())
}

async fn unmount(vault: &dyn VaultBackend, path: &str) -> Result<()> {
    info!(path = %path, "Unmounting");
    vault.delete(&join_path(["sys/mounts", path])).await?;
    Ok(())
}

/// Write each config section of a freshly created mount to
/// `<mount>/config/<subpath>`.
async fn apply_mount_config(vault: &dyn VaultBackend, mount: &Mount) -> Result<()> {
    for section in &mount.config {
        let subpath = get_string(section, "path", DEFAULT_CONFIG_SUBPATH);
        let config_path = join_path([mount.path.as_str(), "config", subpath.as_str()]);

        let data = if let Some(bundle) = section.get("ca_bundle") {
            let Value::Object(bundle) = bundle else {
                error!(path = %config_path, "Empty or malformed ca_bundle, skipping");
                continue;
            };
            pem_bundle(bundle)?
        } else {
            get_map(section, "properties").unwrap_or_default()
        };

        info!(path = %config_path, "Configuring mount");
        vault.write(&config_path, data).await?;
    }
    Ok(())
}

/// Certificate followed by private key, each with trailing newlines removed.
fn pem_bundle(bundle: &VaultData) -> Result<VaultData> {
    let key = resolve_content(&get_string(bundle, "key", ""))?;
    let cert = resolve_content(&get_string(bundle, "cert", ""))?;

    let mut data = VaultData::new();
    data.insert(
        "pem_bundle".to_string(),
        json!(format!("{}\n{}", cert.trim_end_matches('\n'), key.trim_end_matches('\n'))),
    );
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::{InMemoryVault, Operation};

    fn mount(kind: &str, path: &str) -> Mount {
        Mount { kind: kind.to_string(), path: path.to_string(), ..Default::default() }
    }

    fn section(value: Value) -> VaultData {
        match value {
            Value::Object(map) => map,
            _ => panic!("section must be an object"),
        }
    }

    #[tokio::test]
    async fn test_creates_missing_and_removes_unmanaged() {
        let vault = InMemoryVault::with_defaults();
        vault.write("sys/mounts/old", section(json!({"type": "kv"}))).await.unwrap();

        let mut pki = mount("pki", "");
        pki.max_lease_ttl = "87600h".to_string();
        reconcile_mounts(&vault, &[pki, mount("ssh", "ssh_hosts")]).await.unwrap();

        assert_eq!(vault.mount_paths(), vec!["cubbyhole", "pki", "secret", "ssh_hosts", "sys"]);
        let created = vault.mount("pki").unwrap();
        assert_eq!(created["type"], json!("pki"));
        assert_eq!(created["config"]["max_lease_ttl"], json!("87600h"));
    }

    #[tokio::test]
    async fn test_existing_mount_is_not_touched() {
        let vault = InMemoryVault::with_defaults();
        vault.write("sys/mounts/pki", section(json!({"type": "pki"}))).await.unwrap();
        vault.clear_journal();

        let mut pki = mount("pki", "pki");
        pki.config = vec![section(json!({"path": "urls", "properties": {"a": "b"}}))];
        reconcile_mounts(&vault, &[pki]).await.unwrap();

        assert!(vault.journal().is_empty());
    }

    #[tokio::test]
    async fn test_declared_identity_mount_is_kept() {
        let vault = InMemoryVault::with_defaults();
        vault.write("sys/mounts/identity", section(json!({"type": "identity"}))).await.unwrap();
        vault.clear_journal();

        reconcile_mounts(&vault, &[mount("identity", "")]).await.unwrap();
        assert!(vault.journal().is_empty());

        reconcile_mounts(&vault, &[]).await.unwrap();
        assert_eq!(vault.journal(), vec![Operation::Delete("sys/mounts/identity".to_string())]);
    }

    #[tokio::test]
    async fn test_duplicate_path_is_created_once() {
        let vault = InMemoryVault::with_defaults();
        reconcile_mounts(&vault, &[mount("ssh", "ssh"), mount("ssh", "ssh")]).await.unwrap();

        assert_eq!(vault.journal(), vec![Operation::Write("sys/mounts/ssh".to_string())]);
    }

    #[tokio::test]
    async fn test_config_sections() {
        let dir = tempfile::tempdir().unwrap();
        let key = dir.path().join("ca.key");
        std::fs::write(&key, "-----KEY-----\n\n").unwrap();

        let vault = InMemoryVault::with_defaults();
        let mut pki = mount("pki", "pki");
        pki.config = vec![
            section(json!({"ca_bundle": {"cert": "-----CERT-----\n", "key": format!("@{}", key.display())}})),
            section(json!({"path": "urls", "properties": {"issuing_certificates": "http://vault/ca"}})),
            section(json!({"path": "skipped", "ca_bundle": null})),
        ];
        reconcile_mounts(&vault, &[pki]).await.unwrap();

        let bundle = vault.entry("pki/config/config").unwrap();
        assert_eq!(bundle["pem_bundle"], json!("-----CERT-----\n-----KEY-----"));
        let urls = vault.entry("pki/config/urls").unwrap();
        assert_eq!(urls["issuing_certificates"], json!("http://vault/ca"));
        assert!(vault.entry("pki/config/skipped").is_none());
    }

    #[tokio::test]
    async fn test_failed_config_rolls_back_mount() {
        let vault = InMemoryVault::with_defaults();
        vault.fail_writes_to("pki/config/urls");

        let mut pki = mount("pki", "pki");
        pki.config = vec![section(json!({"path": "urls", "properties": {"a": "b"}}))];
        let result = reconcile_mounts(&vault, &[pki, mount("ssh", "ssh")]).await;

        assert!(result.is_err());
        assert!(vault.mount("pki").is_none());
        assert!(vault.mount("ssh").is_none());
        assert_eq!(vault.journal().last(), Some(&Operation::Delete("sys/mounts/pki".to_string())));
    }

    #[tokio::test]
    async fn test_list_mounts_trims_slashes() {
        let vault = InMemoryVault::with_defaults();
        let mounts = list_mounts(&vault).await.unwrap();

        assert_eq!(mounts.keys().collect::<Vec<_>>(), vec!["cubbyhole", "secret", "sys"]);
        assert_eq!(mounts["secret"].kind, "generic");
    }
}
