pub mod reader;
pub mod versioning;
pub mod writer;

pub use reader::read_snapshot;
pub use versioning::{SnapshotConfig, SnapshotManifest};
pub use writer::{write_snapshot, SnapshotWriter};

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Output directory already exists: {0}")]
    OutputExists(PathBuf),
    #[error("Snapshot holds a {found}, expected a {expected}")]
    KindMismatch { expected: String, found: String },
    #[error("Snapshot version mismatch: manifest says {manifest}, payload hashes to {actual}")]
    VersionMismatch { manifest: String, actual: String },
}
