// Read-only:
// no mutation of the snapshot directory
// the payload is trusted only after its hash matches the manifest

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use tracing::info;

use crate::snapshot::versioning::SnapshotManifest;
use crate::snapshot::writer::MANIFEST_FILE;
use crate::snapshot::SnapshotError;

/// Load and verify a snapshot of `expected_kind`.
pub fn read_snapshot<T: DeserializeOwned>(
    dir: &Path,
    expected_kind: &str,
) -> Result<(T, SnapshotManifest), SnapshotError> {
    let f_man = fs::File::open(dir.join(MANIFEST_FILE))?;
    let manifest: SnapshotManifest = serde_json::from_reader(f_man)?;

    if manifest.kind != expected_kind {
        return Err(SnapshotError::KindMismatch {
            expected: expected_kind.to_string(),
            found: manifest.kind,
        });
    }

    let payload = fs::read(dir.join(&manifest.payload_file))?;

    // Verify version matches manifest (recompute from payload)
    let actual = manifest.build_config.version_of(&payload)?;
    if actual != manifest.snapshot_version {
        return Err(SnapshotError::VersionMismatch {
            manifest: manifest.snapshot_version,
            actual,
        });
    }

    let value: T = serde_json::from_slice(&payload)?;
    info!(
        kind = expected_kind,
        version = %manifest.snapshot_version,
        dir = %dir.display(),
        "snapshot loaded"
    );
    Ok((value, manifest))
}
