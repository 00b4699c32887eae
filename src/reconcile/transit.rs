//! Transit encryption keys. Writes are idempotent creates; keys are never deleted.

use serde_json::json;
use tracing::{debug, info};

use crate::errors::Result;
use crate::model::TransitKey;
use crate::vault::{join_path, VaultBackend, VaultData};

pub const TRANSIT_KEYS_ROOT: &str = "transit/keys";

pub async fn reconcile_transit_keys(vault: &dyn VaultBackend, desired: &[TransitKey]) -> Result<()> {
    if desired.is_empty() {
        info!("No transit keys to apply");
        return Ok(());
    }

    for key in desired {
        let path = join_path([TRANSIT_KEYS_ROOT, key.name.as_str()]);
        debug!(path = %path, "Creating transit key");

        let mut data = VaultData::new();
        if !key.kind.is_empty() {
            data.insert("type".to_string(), json!(key.kind));
        }
        vault.write(&path, data).await?;
        info!(name = %key.name, "Created transit key");
    }
    Ok(())
}
