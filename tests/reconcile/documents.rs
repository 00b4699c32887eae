use config2vault::model::load_path;
use config2vault::reconcile::reconcile;
use serde_json::json;

use super::support::dev_vault;

#[tokio::test]
async fn directory_documents_merge_before_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let policy_file = dir.path().join("consul-reader.hcl");
    std::fs::write(&policy_file, "key \"\" { policy = \"read\" }\n").unwrap();

    std::fs::write(
        dir.path().join("00-mounts.yml"),
        "mounts:\n  - type: consul\n    policy_base64_encode: true\n  - type: transit\n",
    )
    .unwrap();
    std::fs::write(
        dir.path().join("10-roles.yaml"),
        format!(
            "roles:\n  - name: reader\n    path: consul\n    properties:\n      policy: \"@{}\"\ntransit_keys:\n  - name: payments\n",
            policy_file.display()
        ),
    )
    .unwrap();
    std::fs::write(dir.path().join("README.md"), "not a document").unwrap();

    let config = load_path(dir.path()).unwrap();
    assert_eq!(config.mounts.len(), 2);
    assert_eq!(config.transit_keys.len(), 1);

    let vault = dev_vault();
    reconcile(&vault, &config).await.unwrap();

    // "key \"\" { policy = \"read\" }\n" in standard base64
    assert_eq!(
        vault.entry("consul/roles/reader").unwrap()["policy"],
        json!("a2V5ICIiIHsgcG9saWN5ID0gInJlYWQiIH0K")
    );
    assert!(vault.entry("transit/keys/payments").is_some());
}

#[tokio::test]
async fn content_file_failure_names_the_roles_stage() {
    let vault = dev_vault();
    let config = serde_yaml::from_str(
        "mounts:\n  - type: pki\nroles:\n  - name: web\n    path: pki\n    properties:\n      policy: '@/nonexistent/policy.hcl'\n",
    )
    .unwrap();

    let err = reconcile(&vault, &config).await.unwrap_err();
    assert_eq!(err.to_string(), "Failed to apply roles");
    assert!(vault.mount("pki").is_some());
}
