use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use crate::snapshot::SnapshotError;

// Serializable, comparable, explicit defaults.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SnapshotConfig {
    pub version: String,
    pub hash_algorithm: String,
}

impl SnapshotConfig {
    pub fn v0() -> Self {
        Self {
            version: "1".into(),
            hash_algorithm: "sha256".into(),
        }
    }

    /// Content version of a payload written under this config.
    ///
    /// The config itself is part of the hash, so changing the format version
    /// changes every snapshot version.
    pub fn version_of(&self, payload: &[u8]) -> Result<String, SnapshotError> {
        let mut hasher = Sha256::new();
        hasher.update(serde_json::to_vec(self)?);
        hasher.update(payload);
        Ok(format!("sha256:{}", hex::encode(hasher.finalize())))
    }
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self::v0()
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SnapshotManifest {
    pub snapshot_version: String,
    pub kind: String,
    pub build_config: SnapshotConfig,
    pub created_at: DateTime<Utc>, // informational only
    pub payload_file: String,
    pub payload_bytes: usize,
}
