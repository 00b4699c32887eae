//! Userpass accounts. Declared users are overwritten; undeclared users are left alone.

use serde_json::json;
use tracing::info;

use crate::errors::Result;
use crate::model::UserAccount;
use crate::vault::{join_path, VaultBackend, VaultData};

pub const USERS_ROOT: &str = "auth/userpass/users";

/// Payload for one account. Empty fields are left to the server.
fn user_payload(user: &UserAccount) -> VaultData {
    let mut data = VaultData::new();
    if let Some(policies) = &user.policies {
        data.insert("policies".to_string(), json!(policies.join(",")));
    }
    if !user.password.is_empty() {
        data.insert("password".to_string(), json!(user.password));
    }
    if !user.ttl.is_empty() {
        data.insert("ttl".to_string(), json!(user.ttl));
    }
    if !user.max_ttl.is_empty() {
        data.insert("max_ttl".to_string(), json!(user.max_ttl));
    }
    data
}

pub async fn reconcile_users(vault: &dyn VaultBackend, users: &[UserAccount]) -> Result<()> {
    if users.is_empty() {
        return Ok(());
    }

    info!(count = users.len(), "Creating user accounts");
    for user in users {
        let path = join_path([USERS_ROOT, user.name.as_str()]);
        info!(path = %path, "Creating or updating user");
        vault.write(&path, user_payload(user)).await?;
    }
    Ok(())
}
