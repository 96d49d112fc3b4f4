use std::fs;
use std::io::Write;
use std::path::Path;

use chrono::Utc;
use serde::Serialize;
use tracing::info;

use crate::snapshot::versioning::{SnapshotConfig, SnapshotManifest};
use crate::snapshot::SnapshotError;

pub(crate) const PAYLOAD_FILE: &str = "payload.json";
pub(crate) const MANIFEST_FILE: &str = "manifest.json";

/// Writes a serializable value as a versioned snapshot directory.
///
/// SnapshotWriter is single-threaded and non-reentrant.
pub struct SnapshotWriter {
    config: SnapshotConfig,
}

impl SnapshotWriter {
    pub fn new(config: SnapshotConfig) -> Self {
        Self { config }
    }

    pub fn write<T: Serialize>(
        &self,
        value: &T,
        kind: &str,
        output_dir: &Path,
    ) -> Result<SnapshotManifest, SnapshotError> {
        if output_dir.exists() {
            return Err(SnapshotError::OutputExists(output_dir.to_path_buf()));
        }

        // 1. Serialize once; the version is computed over these exact bytes
        let payload = serde_json::to_vec(value)?;
        let snapshot_version = self.config.version_of(&payload)?;

        // Note: created_at is strictly informational
        let manifest = SnapshotManifest {
            snapshot_version: snapshot_version.clone(),
            kind: kind.to_string(),
            build_config: self.config.clone(),
            created_at: Utc::now(),
            payload_file: PAYLOAD_FILE.to_string(),
            payload_bytes: payload.len(),
        };

        // 2. Write to a temp dir named after the version
        let temp_suffix = format!("tmp.{}", &snapshot_version[7..19]);
        let temp_dir = output_dir.with_extension(temp_suffix);

        // Clean up any stale temp dir from a crashed previous run of this version
        if temp_dir.exists() {
            fs::remove_dir_all(&temp_dir)?;
        }
        fs::create_dir_all(&temp_dir)?;

        let mut f_payload = fs::File::create(temp_dir.join(PAYLOAD_FILE))?;
        f_payload.write_all(&payload)?;
        f_payload.sync_all()?;

        let manifest_path = temp_dir.join(MANIFEST_FILE);
        let f_man = fs::File::create(manifest_path)?;
        serde_json::to_writer_pretty(&f_man, &manifest)?;
        f_man.sync_all()?;

        // 3. Atomic rename
        fs::rename(&temp_dir, output_dir)?;

        info!(
            kind,
            version = %snapshot_version,
            bytes = payload.len(),
            dir = %output_dir.display(),
            "snapshot written"
        );
        Ok(manifest)
    }
}

/// Write `value` with the default snapshot config.
pub fn write_snapshot<T: Serialize>(
    value: &T,
    kind: &str,
    output_dir: &Path,
) -> Result<SnapshotManifest, SnapshotError> {
    SnapshotWriter::new(SnapshotConfig::v0()).write(value, kind, output_dir)
}
