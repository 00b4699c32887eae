//! In-memory [`VaultBackend`] that mimics the parts of Vault the reconcilers touch.
//!
//! Supported behaviour:
//! - `sys/mounts` and `sys/auth`: list by reading, enable by writing
//!   `sys/mounts/<path>` / `sys/auth/<path>`, disable by deleting (which drops
//!   everything stored underneath)
//! - `sys/policy`: list, read (`rules`), write (names are lowercased), delete
//! - every other path is a plain key-value entry that must live under an
//!   enabled mount or auth backend
//! - AppRole writes are canonicalised the way Vault does it: TTLs become
//!   seconds and the policy string becomes a list
//!
//! All mutating calls are recorded in a journal so tests can assert on the
//! exact set of writes and deletes issued by a run.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::{json, Value};

use super::client::{VaultBackend, VaultData};
use super::error::{VaultError, VaultResult};
use super::value::{get_string, parse_duration_secs, split_list};

const APPROLE_DURATION_FIELDS: &[&str] = &["secret_id_ttl", "token_ttl", "token_max_ttl", "period"];

/// A mutating call observed by [`InMemoryVault`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Write(String),
    Delete(String),
}

impl Operation {
    pub fn path(&self) -> &str {
        match self {
            Operation::Write(path) | Operation::Delete(path) => path,
        }
    }
}

#[derive(Debug, Default)]
struct State {
    mounts: BTreeMap<String, VaultData>,
    auth: BTreeMap<String, VaultData>,
    policies: BTreeMap<String, String>,
    entries: BTreeMap<String, VaultData>,
    unlistable: BTreeSet<String>,
    failing_writes: BTreeSet<String>,
    journal: Vec<Operation>,
}

/// Thread-safe in-memory Vault.
#[derive(Debug, Default)]
pub struct InMemoryVault {
    state: Mutex<State>,
}

impl InMemoryVault {
    /// An empty server: no mounts, no auth backends, no policies.
    pub fn new() -> Self {
        Self::default()
    }

    /// A server in the state `vault server -dev` starts in.
    pub fn with_defaults() -> Self {
        let vault = Self::new();
        {
            let mut state = vault.lock();
            for (path, kind) in [("cubbyhole", "cubbyhole"), ("secret", "generic"), ("sys", "system")] {
                state.mounts.insert(path.to_string(), mount_entry(kind, ""));
            }
            state.auth.insert("token".to_string(), mount_entry("token", "token based credentials"));
            state.policies.insert("root".to_string(), String::new());
            state.policies.insert("default".to_string(), "path \"auth/token/lookup-self\" {}".to_string());
        }
        vault
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Make `list` fail for `path`, like engines without a list endpoint.
    pub fn set_unlistable(&self, path: &str) {
        self.lock().unlistable.insert(trim(path));
    }

    /// Make every write to `path` fail with a 500.
    pub fn fail_writes_to(&self, path: &str) {
        self.lock().failing_writes.insert(trim(path));
    }

    /// Mutating calls seen so far, in order.
    pub fn journal(&self) -> Vec<Operation> {
        self.lock().journal.clone()
    }

    /// Forget the journal, e.g. between two reconciliation runs.
    pub fn clear_journal(&self) {
        self.lock().journal.clear();
    }

    /// Mounted secret engine paths (without trailing slash).
    pub fn mount_paths(&self) -> Vec<String> {
        self.lock().mounts.keys().cloned().collect()
    }

    /// Mount details as stored: `type`, `description`, `config`.
    pub fn mount(&self, path: &str) -> Option<VaultData> {
        self.lock().mounts.get(&trim(path)).cloned()
    }

    /// Enabled auth backend paths (without trailing slash).
    pub fn auth_paths(&self) -> Vec<String> {
        self.lock().auth.keys().cloned().collect()
    }

    /// Rules of a policy.
    pub fn policy(&self, name: &str) -> Option<String> {
        self.lock().policies.get(name).cloned()
    }

    /// Raw entry stored at a non-system path.
    pub fn entry(&self, path: &str) -> Option<VaultData> {
        self.lock().entries.get(&trim(path)).cloned()
    }

    /// Seed an entry directly, bypassing mount checks and the journal.
    pub fn insert_entry(&self, path: &str, data: VaultData) {
        self.lock().entries.insert(trim(path), data);
    }
}

impl State {
    fn is_routed(&self, path: &str) -> bool {
        if let Some(rest) = path.strip_prefix("auth/") {
            return self.auth.keys().any(|mount| has_prefix(rest, mount));
        }
        self.mounts.keys().any(|mount| has_prefix(path, mount))
    }

    fn is_unlistable(&self, path: &str) -> bool {
        self.unlistable.iter().any(|p| has_prefix(path, p))
    }

    fn drop_subtree(&mut self, prefix: &str) {
        let prefix = format!("{}/", prefix);
        self.entries.retain(|path, _| !path.starts_with(&prefix));
    }

    fn children(&self, path: &str) -> Vec<String> {
        let prefix = if path.is_empty() { String::new() } else { format!("{}/", path) };
        let children: BTreeSet<String> = self
            .entries
            .keys()
            .filter_map(|key| key.strip_prefix(&prefix))
            .map(|rest| match rest.find('/') {
                Some(index) => rest[..=index].to_string(),
                None => rest.to_string(),
            })
            .collect();
        children.into_iter().collect()
    }

    fn is_approle_role(&self, path: &str) -> bool {
        let Some(rest) = path.strip_prefix("auth/") else {
            return false;
        };
        let segments: Vec<&str> = rest.split('/').collect();
        segments.len() == 3
            && segments[1] == "role"
            && self.auth.get(segments[0]).map(|m| get_string(m, "type", "")) == Some("approle".to_string())
    }
}

#[async_trait]
impl VaultBackend for InMemoryVault {
    async fn list(&self, path: &str) -> VaultResult<Vec<String>> {
        let path = trim(path);
        let state = self.lock();

        if state.is_unlistable(&path) {
            return Err(VaultError::http("LIST", path, 405, vec!["unsupported operation".to_string()]));
        }

        match path.as_str() {
            "sys/policy" => Ok(state.policies.keys().cloned().collect()),
            "sys/mounts" | "sys/auth" => Err(VaultError::unsupported("list", path)),
            _ => Ok(state.children(&path)),
        }
    }

    async fn read(&self, path: &str) -> VaultResult<Option<VaultData>> {
        let path = trim(path);
        let state = self.lock();

        if path == "sys/mounts" {
            return Ok(Some(table(&state.mounts)));
        }
        if path == "sys/auth" {
            return Ok(Some(table(&state.auth)));
        }
        if let Some(name) = path.strip_prefix("sys/policy/") {
            return Ok(state.policies.get(name).map(|rules| {
                object(json!({"name": name, "rules": rules}))
            }));
        }

        Ok(state.entries.get(&path).cloned())
    }

    async fn write(&self, path: &str, data: VaultData) -> VaultResult<Option<VaultData>> {
        let path = trim(path);
        let mut state = self.lock();

        if state.failing_writes.contains(&path) {
            return Err(VaultError::http("POST", path, 500, vec!["injected failure".to_string()]));
        }

        if let Some(mount) = path.strip_prefix("sys/mounts/") {
            let mount = trim(mount);
            if state.mounts.contains_key(&mount) {
                return Err(already_in_use(&path, &mount));
            }
            let kind = get_string(&data, "type", "");
            let description = get_string(&data, "description", "");
            let mut entry = mount_entry(&kind, &description);
            if let Some(config) = data.get("config") {
                entry.insert("config".to_string(), config.clone());
            }
            state.mounts.insert(mount, entry);
        } else if let Some(mount) = path.strip_prefix("sys/auth/") {
            let mount = trim(mount);
            if state.auth.contains_key(&mount) {
                return Err(already_in_use(&path, &mount));
            }
            let kind = get_string(&data, "type", "");
            let description = get_string(&data, "description", "");
            state.auth.insert(mount, mount_entry(&kind, &description));
        } else if let Some(name) = path.strip_prefix("sys/policy/") {
            let rules = get_string(&data, "rules", "");
            state.policies.insert(name.to_lowercase(), rules);
        } else if state.is_routed(&path) {
            let data = if state.is_approle_role(&path) { canonical_approle(data) } else { data };
            state.entries.insert(path.clone(), data);
        } else {
            return Err(VaultError::http(
                "POST",
                path.clone(),
                404,
                vec![format!("no handler for route '{}'", path)],
            ));
        }

        state.journal.push(Operation::Write(path));
        Ok(None)
    }

    async fn delete(&self, path: &str) -> VaultResult<()> {
        let path = trim(path);
        let mut state = self.lock();

        if let Some(mount) = path.strip_prefix("sys/mounts/") {
            let mount = trim(mount);
            state.mounts.remove(&mount);
            state.drop_subtree(&mount);
        } else if let Some(mount) = path.strip_prefix("sys/auth/") {
            let mount = trim(mount);
            state.auth.remove(&mount);
            state.drop_subtree(&format!("auth/{}", mount));
        } else if let Some(name) = path.strip_prefix("sys/policy/") {
            state.policies.remove(name);
        } else {
            state.entries.remove(&path);
        }

        state.journal.push(Operation::Delete(path));
        Ok(())
    }
}

fn trim(path: &str) -> String {
    path.trim_matches('/').to_string()
}

fn has_prefix(path: &str, mount: &str) -> bool {
    path == mount || path.starts_with(&format!("{}/", mount))
}

fn object(value: Value) -> VaultData {
    match value {
        Value::Object(map) => map,
        _ => VaultData::new(),
    }
}

fn mount_entry(kind: &str, description: &str) -> VaultData {
    object(json!({"type": kind, "description": description}))
}

fn table(mounts: &BTreeMap<String, VaultData>) -> VaultData {
    mounts.iter().map(|(path, entry)| (format!("{}/", path), Value::Object(entry.clone()))).collect()
}

fn already_in_use(path: &str, mount: &str) -> VaultError {
    VaultError::http("POST", path, 400, vec![format!("path is already in use at {}/", mount)])
}

/// Vault stores AppRole durations as seconds and policies as a list.
fn canonical_approle(mut data: VaultData) -> VaultData {
    for field in APPROLE_DURATION_FIELDS {
        let seconds = match data.get(*field) {
            Some(Value::String(raw)) => parse_duration_secs(raw),
            _ => None,
        };
        if let Some(seconds) = seconds {
            data.insert(field.to_string(), json!(seconds));
        }
    }
    let policies = match data.get("policies") {
        Some(Value::String(raw)) => Some(split_list(raw)),
        _ => None,
    };
    if let Some(policies) = policies {
        data.insert("policies".to_string(), json!(policies));
    }
    data
}
