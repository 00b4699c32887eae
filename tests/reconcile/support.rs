use config2vault::vault::{InMemoryVault, Operation};
use config2vault::VaultConfig;

/// Parse an inline YAML document.
pub fn document(yaml: &str) -> VaultConfig {
    serde_yaml::from_str(yaml).expect("valid test document")
}

/// A server as `vault server -dev` leaves it.
pub fn dev_vault() -> InMemoryVault {
    InMemoryVault::with_defaults()
}

/// Writes recorded by the journal, by path.
pub fn writes(vault: &InMemoryVault) -> Vec<String> {
    vault
        .journal()
        .into_iter()
        .filter_map(|op| match op {
            Operation::Write(path) => Some(path),
            Operation::Delete(_) => None,
        })
        .collect()
}

/// Deletes recorded by the journal, by path.
pub fn deletes(vault: &InMemoryVault) -> Vec<String> {
    vault
        .journal()
        .into_iter()
        .filter_map(|op| match op {
            Operation::Delete(path) => Some(path),
            Operation::Write(_) => None,
        })
        .collect()
}

/// A document touching every category.
pub const FULL_DOCUMENT: &str = r#"
auth:
  - type: approle
  - type: userpass
    description: Human operators
mounts:
  - type: pki
    max_lease_ttl: 87600h
    config:
      - path: urls
        properties:
          issuing_certificates: http://127.0.0.1:8200/v1/pki/ca
  - type: transit
  - type: ssh
    path: ssh_hosts
policies:
  - name: admin
    rules: 'path "*" { capabilities = ["create", "read", "update", "delete", "list", "sudo"] }'
  - name: deploy
    rules: 'path "secret/app/*" { capabilities = ["read"] }'
roles:
  - name: web
    path: pki
    properties:
      allowed_domains: example.com
      allow_subdomains: "true"
  - name: otp
    path: ssh_hosts
    properties:
      key_type: otp
      default_user: ubuntu
users:
  - name: alice
    password: correct-horse
    policies: [admin]
approles:
  - role: ci
    policies: [deploy]
    secret_id_ttl: 10m
    token_ttl: 20m
    token_max_ttl: 30m
    secret_id_num_uses: 40
secrets:
  - path: app/db
    fields:
      - key: username
        value: app
      - key: password
        value: s3cr3t
transit_keys:
  - name: payments
  - name: signing
    type: ed25519
"#;
