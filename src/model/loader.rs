use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::types::VaultConfig;
use crate::errors::{Error, Result};

/// Load one YAML document.
pub fn load_file(path: &Path) -> Result<VaultConfig> {
    info!(path = %path.display(), "Loading file");

    let contents = std::fs::read_to_string(path)
        .map_err(|e| Error::io(e, format!("Failed to read config file {}", path.display())))?;

    if contents.trim().is_empty() {
        return Ok(VaultConfig::default());
    }

    serde_yaml::from_str(&contents).map_err(|source| Error::Parse { path: path.to_path_buf(), source })
}

/// Load a YAML file, or every `.yml`/`.yaml` file directly inside a
/// directory in file name order, merged into one document.
pub fn load_path(path: &Path) -> Result<VaultConfig> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| Error::io(e, format!("Can't access rules path {}", path.display())))?;

    if !metadata.is_dir() {
        return load_file(path);
    }

    let mut files: Vec<PathBuf> = Vec::new();
    let entries = std::fs::read_dir(path)
        .map_err(|e| Error::io(e, format!("Failed to read directory {}", path.display())))?;
    for entry in entries {
        let entry = entry?;
        let file = entry.path();
        if file.is_dir() {
            continue;
        }
        match file.extension().and_then(|ext| ext.to_str()) {
            Some("yml") | Some("yaml") => files.push(file),
            _ => debug!(path = %file.display(), "Skipping non-YAML file"),
        }
    }
    files.sort();

    let mut config = VaultConfig::default();
    for file in files {
        config.merge(load_file(&file)?);
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_directory_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.yaml"), "policies:\n  - name: second\n    rules: b\n").unwrap();
        std::fs::write(dir.path().join("a.yml"), "policies:\n  - name: first\n    rules: a\n").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "policies: [").unwrap();
        std::fs::write(dir.path().join("empty.yml"), "").unwrap();
        std::fs::create_dir(dir.path().join("nested.yml")).unwrap();

        let config = load_path(dir.path()).unwrap();
        let names: Vec<_> = config.policies.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["first", "second"]);
    }

    #[test]
    fn test_load_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("vault.yml");
        std::fs::write(&file, "transit_keys:\n  - name: k\n    type: rsa-2048\n").unwrap();

        let config = load_path(&file).unwrap();
        assert_eq!(config.transit_keys[0].kind, "rsa-2048");
    }

    #[test]
    fn test_malformed_document() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("bad.yml");
        std::fs::write(&file, "mounts: {type: [").unwrap();

        let err = load_path(&file).unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[test]
    fn test_missing_path() {
        let err = load_path(Path::new("/nonexistent/rules.yml")).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
