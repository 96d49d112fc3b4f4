pub mod extractors;
pub mod manager;
pub mod storage;

pub use extractors::{EmbeddingScoreExtractor, FeatureExtractor, KeySelector, StaticFeatureExtractor};
pub use manager::{Enrich, FeatureManager};
pub use storage::FeatureStorage;

use thiserror::Error;

use crate::types::{FeatureKey, FeatureKind, KindConflict};

#[derive(Debug, Error)]
pub enum FeatureError {
    #[error("Feature {0} was never registered")]
    UnknownFeature(String),
    #[error("Feature {name} for key {key} is a {found}, expected {expected}")]
    KindMismatch {
        key: FeatureKey,
        name: String,
        expected: FeatureKind,
        found: FeatureKind,
    },
    #[error("Feature {0} has a non-finite value, which cannot be persisted")]
    NonFinite(String),
    #[error("Embedding {name} has dimension {left} on the context side and {right} on the candidate side")]
    DimensionMismatch {
        name: String,
        left: usize,
        right: usize,
    },
}

impl From<KindConflict> for FeatureError {
    fn from(conflict: KindConflict) -> Self {
        FeatureError::KindMismatch {
            key: FeatureKey::Object(conflict.candidate),
            name: conflict.name,
            expected: conflict.existing,
            found: conflict.new,
        }
    }
}
