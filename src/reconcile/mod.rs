//! # Reconciliation
//!
//! One module per category of Vault configuration, plus the orchestrator
//! that runs them in dependency order:
//!
//! auth backends → mounts → policies → roles → users → AppRoles →
//! generic secrets → transit keys
//!
//! The first failing stage aborts the run. Stages that already ran stay
//! applied.

pub mod approles;
pub mod auth;
pub mod content;
pub mod mounts;
pub mod policies;
pub mod roles;
pub mod secrets;
pub mod transit;
pub mod users;

use std::future::Future;

use tracing::{error, info, Instrument};

use crate::errors::{Result, Stage};
use crate::model::VaultConfig;
use crate::vault::VaultBackend;

pub use content::resolve_content;

async fn run_stage<T, F>(stage: Stage, future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    future.instrument(crate::reconcile_span!(stage.as_str())).await.map_err(|err| {
        error!(stage = stage.as_str(), error = %err, "{}", stage);
        err.at_stage(stage)
    })
}

/// Converge the server behind `vault` to `config`.
pub async fn reconcile(vault: &dyn VaultBackend, config: &VaultConfig) -> Result<()> {
    let config = config.normalized();

    run_stage(Stage::AuthBackends, auth::reconcile_auth_backends(vault, &config.auth_backends)).await?;
    run_stage(Stage::Mounts, mounts::reconcile_mounts(vault, &config.mounts)).await?;

    let existing_policies = run_stage(Stage::ListPolicies, policies::list_policies(vault)).await?;
    run_stage(
        Stage::Policies,
        policies::reconcile_policies(vault, existing_policies, &config.policies),
    )
    .await?;

    run_stage(Stage::Roles, roles::reconcile_roles(vault, &config.mounts, &config.roles)).await?;
    run_stage(Stage::Users, users::reconcile_users(vault, &config.users)).await?;
    run_stage(Stage::AppRoles, approles::reconcile_app_roles(vault, &config.approles)).await?;
    run_stage(Stage::Secrets, secrets::reconcile_secrets(vault, &config.secrets)).await?;
    run_stage(Stage::TransitKeys, transit::reconcile_transit_keys(vault, &config.transit_keys)).await?;

    info!("Reconciliation complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Mount, PolicyDefinition, TransitKey};
    use crate::vault::{InMemoryVault, Operation};

    #[tokio::test]
    async fn test_failure_names_the_stage_and_stops() {
        let vault = InMemoryVault::with_defaults();
        vault.fail_writes_to("sys/policy/admin");

        let config = VaultConfig {
            policies: vec![PolicyDefinition { name: "admin".into(), rules: "x".into() }],
            transit_keys: vec![TransitKey { name: "k".into(), kind: String::new() }],
            ..Default::default()
        };
        let err = reconcile(&vault, &config).await.unwrap_err();

        assert_eq!(err.stage(), Some(Stage::Policies));
        assert_eq!(err.to_string(), "Failed to reconcile new and existing policies");
    }

    #[tokio::test]
    async fn test_mounts_are_created_before_roles() {
        let vault = InMemoryVault::with_defaults();
        let config = VaultConfig {
            mounts: vec![Mount { kind: "pki".into(), ..Default::default() }],
            roles: vec![crate::model::RolePolicy {
                name: "web".into(),
                path: "pki".into(),
                properties: [("ttl".to_string(), "1h".to_string())].into_iter().collect(),
            }],
            ..Default::default()
        };
        reconcile(&vault, &config).await.unwrap();

        assert_eq!(
            vault.journal(),
            vec![
                Operation::Write("sys/mounts/pki".to_string()),
                Operation::Write("pki/roles/web".to_string()),
            ]
        );
    }
}
