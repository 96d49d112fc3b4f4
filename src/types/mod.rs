pub mod actions;
pub mod identifiers;
pub mod primitives;

pub use actions::Action;
pub use identifiers::{FeatureKey, ObjectId};
pub use primitives::{Candidate, Embedding, Feature, FeatureKind, FeatureMap, KindConflict};
