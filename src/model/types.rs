//! Desired-state document types.
//!
//! Field names follow the YAML document keys. Records observed on the
//! server are rebuilt into the same shapes where the reconcilers compare
//! them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::vault::VaultData;

/// Rules value that takes a policy out of reconciliation.
pub const IGNORE_SENTINEL: &str = "${ignore}";

/// A free-form configuration section attached to a mount or auth backend.
pub type PropertyBag = VaultData;

/// A secret engine mount.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Mount {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Mount point; defaults to the type
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub default_lease_ttl: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub max_lease_ttl: String,
    /// Base64-encode role property values written under this mount
    #[serde(default)]
    pub policy_base64_encode: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub config: Vec<PropertyBag>,
}

/// An authentication backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthBackend {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub config: Vec<PropertyBag>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyDefinition {
    pub name: String,
    #[serde(default)]
    pub rules: String,
}

impl PolicyDefinition {
    pub fn is_ignored(&self) -> bool {
        self.rules == IGNORE_SENTINEL
    }
}

/// A role under a mount, written to `<path>/roles/<name>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolePolicy {
    pub name: String,
    /// Owning mount path
    pub path: String,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

/// A userpass account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policies: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ttl: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub max_ttl: String,
}

fn default_true() -> bool {
    true
}

/// An AppRole definition under `auth/approle/role/<name>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppRoleProperties {
    #[serde(alias = "role")]
    pub name: String,
    #[serde(default)]
    pub policies: Vec<String>,
    #[serde(default)]
    pub secret_id_ttl: String,
    #[serde(default)]
    pub token_ttl: String,
    #[serde(default)]
    pub token_max_ttl: String,
    #[serde(default)]
    pub secret_id_num_uses: i64,
    #[serde(default = "default_true")]
    pub bind_secret_id: bool,
    #[serde(default)]
    pub period: String,
    #[serde(default)]
    pub bound_cidr_list: String,
}

impl Default for AppRoleProperties {
    fn default() -> Self {
        Self {
            name: String::new(),
            policies: Vec::new(),
            secret_id_ttl: String::new(),
            token_ttl: String::new(),
            token_max_ttl: String::new(),
            secret_id_num_uses: 0,
            bind_secret_id: true,
            period: String::new(),
            bound_cidr_list: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldPair {
    pub key: String,
    #[serde(default)]
    pub value: String,
}

/// A generic secret stored under `secret/<path>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenericSecret {
    pub path: String,
    #[serde(default)]
    pub fields: Vec<FieldPair>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitKey {
    pub name: String,
    /// Key type; the server default applies when empty
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
}

/// The whole desired state, possibly merged from several documents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VaultConfig {
    #[serde(default)]
    pub mounts: Vec<Mount>,
    #[serde(default, rename = "auth")]
    pub auth_backends: Vec<AuthBackend>,
    #[serde(default)]
    pub policies: Vec<PolicyDefinition>,
    #[serde(default)]
    pub roles: Vec<RolePolicy>,
    #[serde(default)]
    pub users: Vec<UserAccount>,
    #[serde(default)]
    pub approles: Vec<AppRoleProperties>,
    #[serde(default)]
    pub secrets: Vec<GenericSecret>,
    #[serde(default)]
    pub transit_keys: Vec<TransitKey>,
}

impl VaultConfig {
    /// Append every section of `other`, keeping document order.
    pub fn merge(&mut self, other: VaultConfig) {
        self.mounts.extend(other.mounts);
        self.auth_backends.extend(other.auth_backends);
        self.policies.extend(other.policies);
        self.roles.extend(other.roles);
        self.users.extend(other.users);
        self.approles.extend(other.approles);
        self.secrets.extend(other.secrets);
        self.transit_keys.extend(other.transit_keys);
    }

    /// Copy with defaults filled in: mount and auth paths fall back to the type.
    pub fn normalized(&self) -> VaultConfig {
        let mut config = self.clone();
        for mount in &mut config.mounts {
            if mount.path.is_empty() {
                tracing::debug!(kind = %mount.kind, "Defaulting mount path to its type");
                mount.path = mount.kind.clone();
            }
        }
        for backend in &mut config.auth_backends {
            if backend.path.is_empty() {
                backend.path = backend.kind.clone();
            }
        }
        config
    }

    pub fn is_empty(&self) -> bool {
        self == &VaultConfig::default()
    }
}
