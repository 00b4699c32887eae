use config2vault::reconcile::reconcile;
use config2vault::vault::VaultBackend;
use config2vault::Stage;
use serde_json::json;

use super::support::{deletes, dev_vault, document, writes, FULL_DOCUMENT};

#[tokio::test]
async fn second_run_only_rewrites_overwrite_categories() {
    let vault = dev_vault();
    let config = document(FULL_DOCUMENT);

    reconcile(&vault, &config).await.unwrap();
    let mounts = vault.mount_paths();
    let auth = vault.auth_paths();
    vault.clear_journal();

    reconcile(&vault, &config).await.unwrap();

    assert!(deletes(&vault).is_empty());
    let mut rewritten = writes(&vault);
    rewritten.sort();
    assert_eq!(
        rewritten,
        vec![
            "auth/userpass/users/alice",
            "pki/roles/web",
            "secret/app/db",
            "ssh_hosts/roles/otp",
            "transit/keys/payments",
            "transit/keys/signing",
        ]
    );
    assert_eq!(vault.mount_paths(), mounts);
    assert_eq!(vault.auth_paths(), auth);
}

#[tokio::test]
async fn declared_mounts_exist_and_unmanaged_are_removed() {
    let vault = dev_vault();
    let mut data = config2vault::vault::VaultData::new();
    data.insert("type".to_string(), json!("kv"));
    vault.write("sys/mounts/scratch", data).await.unwrap();

    reconcile(&vault, &document(FULL_DOCUMENT)).await.unwrap();

    assert_eq!(
        vault.mount_paths(),
        vec!["cubbyhole", "pki", "secret", "ssh_hosts", "sys", "transit"]
    );
    assert_eq!(vault.mount("ssh_hosts").unwrap()["type"], json!("ssh"));
    assert_eq!(vault.entry("pki/config/urls").unwrap()["issuing_certificates"], json!("http://127.0.0.1:8200/v1/pki/ca"));

    let userpass = vault.auth_paths();
    assert_eq!(userpass, vec!["approle", "token", "userpass"]);
}

#[tokio::test]
async fn ignored_policy_is_never_touched() {
    let vault = dev_vault();
    let mut data = config2vault::vault::VaultData::new();
    data.insert("rules".to_string(), json!("path \"legacy/*\" {}"));
    vault.write("sys/policy/legacy", data).await.unwrap();
    vault.clear_journal();

    let config = document(
        r#"
policies:
  - name: legacy
    rules: ${ignore}
  - name: admin
    rules: 'path "*" {}'
"#,
    );
    reconcile(&vault, &config).await.unwrap();
    reconcile(&vault, &config).await.unwrap();

    assert_eq!(vault.policy("legacy").as_deref(), Some("path \"legacy/*\" {}"));
    assert!(!vault.journal().iter().any(|op| op.path() == "sys/policy/legacy"));
}

#[tokio::test]
async fn protected_policies_are_never_deleted() {
    let vault = dev_vault();
    let mut data = config2vault::vault::VaultData::new();
    data.insert("rules".to_string(), json!(""));
    vault.write("sys/policy/response-wrapping", data.clone()).await.unwrap();
    vault.write("sys/policy/stale", data).await.unwrap();

    reconcile(&vault, &document("policies:\n  - name: ops\n    rules: x\n")).await.unwrap();

    for name in ["root", "default", "response-wrapping", "ops"] {
        assert!(vault.policy(name).is_some(), "{} should remain", name);
    }
    assert!(vault.policy("stale").is_none());
}

#[tokio::test]
async fn approle_update_reflects_new_ttl() {
    let vault = dev_vault();
    let before = r#"
auth:
  - type: approle
approles:
  - name: r1
    policies: [deploy]
    secret_id_ttl: 10m
  - name: r2
    secret_id_ttl: 1h
"#;
    reconcile(&vault, &document(before)).await.unwrap();
    assert_eq!(vault.entry("auth/approle/role/r1").unwrap()["secret_id_ttl"], json!(600));

    vault.clear_journal();
    reconcile(&vault, &document(&before.replace("10m", "20m"))).await.unwrap();

    assert_eq!(writes(&vault), vec!["auth/approle/role/r1"]);
    assert_eq!(vault.entry("auth/approle/role/r1").unwrap()["secret_id_ttl"], json!(1200));
}

#[tokio::test]
async fn undeclared_secrets_are_deleted() {
    let vault = dev_vault();
    let declared = "secrets:\n  - path: test/foo\n    fields:\n      - key: value\n        value: bar\n";

    reconcile(&vault, &document(declared)).await.unwrap();
    assert_eq!(vault.list("secret/test").await.unwrap(), vec!["foo"]);

    reconcile(&vault, &document("secrets: []\n")).await.unwrap();
    assert!(vault.entry("secret/test/foo").is_none());
    assert!(vault.list("secret").await.unwrap().is_empty());
}

#[tokio::test]
async fn undeclared_roles_are_deleted() {
    let vault = dev_vault();
    let both = r#"
mounts:
  - type: pki
roles:
  - name: web
    path: pki
    properties:
      max_ttl: 72h
  - name: internal
    path: pki
    properties:
      max_ttl: 24h
"#;
    reconcile(&vault, &document(both)).await.unwrap();
    assert_eq!(vault.list("pki/roles").await.unwrap(), vec!["internal", "web"]);

    let one = r#"
mounts:
  - type: pki
roles:
  - name: web
    path: pki
    properties:
      max_ttl: 72h
"#;
    reconcile(&vault, &document(one)).await.unwrap();
    assert_eq!(vault.list("pki/roles").await.unwrap(), vec!["web"]);
}

#[tokio::test]
async fn failed_mount_config_rolls_back_and_stops_the_run() {
    let vault = dev_vault();
    vault.fail_writes_to("pki/config/urls");

    let err = reconcile(&vault, &document(FULL_DOCUMENT)).await.unwrap_err();

    assert_eq!(err.stage(), Some(Stage::Mounts));
    assert_eq!(err.to_string(), "Failed to update mounts");
    assert!(vault.mount("pki").is_none());
    // Auth backends ran first and stay applied
    assert!(vault.auth_paths().contains(&"approle".to_string()));
    assert!(vault.policy("admin").is_none());
}

#[tokio::test]
async fn duplicate_policy_declarations_apply_in_order() {
    let vault = dev_vault();
    let config = document(
        r#"
policies:
  - name: ops
    rules: first
  - name: ops
    rules: second
"#,
    );
    reconcile(&vault, &config).await.unwrap();

    assert_eq!(vault.policy("ops").as_deref(), Some("second"));
}

#[tokio::test]
async fn duplicate_roles_keep_the_last_declaration() {
    let vault = dev_vault();
    let config = document(
        r#"
mounts:
  - type: pki
roles:
  - name: web
    path: pki
    properties:
      max_ttl: 1h
  - name: web
    path: pki
    properties:
      max_ttl: 2h
"#,
    );

    reconcile(&vault, &config).await.unwrap();
    vault.clear_journal();
    reconcile(&vault, &config).await.unwrap();

    assert_eq!(vault.entry("pki/roles/web").unwrap(), json!({"max_ttl": "2h"}).as_object().cloned().unwrap());
    assert!(deletes(&vault).is_empty());
}

#[tokio::test]
async fn duplicate_approles_compare_against_the_earlier_declaration() {
    let vault = dev_vault();
    let differing = r#"
auth:
  - type: approle
approles:
  - name: ci
    secret_id_ttl: 10m
  - name: ci
    secret_id_ttl: 20m
"#;
    reconcile(&vault, &document(differing)).await.unwrap();

    let approle_writes: Vec<_> =
        writes(&vault).into_iter().filter(|path| path == "auth/approle/role/ci").collect();
    assert_eq!(approle_writes.len(), 2);
    assert_eq!(vault.entry("auth/approle/role/ci").unwrap()["secret_id_ttl"], json!(1200));
    assert!(deletes(&vault).is_empty());

    let identical = r#"
auth:
  - type: approle
approles:
  - name: ci
    secret_id_ttl: 20m
  - name: ci
    secret_id_ttl: 20m
"#;
    vault.clear_journal();
    reconcile(&vault, &document(identical)).await.unwrap();

    assert!(!writes(&vault).contains(&"auth/approle/role/ci".to_string()));
}
