use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a user or an item.
///
/// Ordering is significant: ascending id is the tie-break used by every
/// ordering in the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(u64);

impl ObjectId {
    pub const fn new(raw: u64) -> Self {
        ObjectId(raw)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for ObjectId {
    fn from(raw: u64) -> Self {
        ObjectId(raw)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lookup key of a feature storage: a single object, or a (context, candidate) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureKey {
    Object(ObjectId),
    Pair(ObjectId, ObjectId),
}

impl From<ObjectId> for FeatureKey {
    fn from(id: ObjectId) -> Self {
        FeatureKey::Object(id)
    }
}

impl From<u64> for FeatureKey {
    fn from(raw: u64) -> Self {
        FeatureKey::Object(ObjectId(raw))
    }
}

impl From<(ObjectId, ObjectId)> for FeatureKey {
    fn from((left, right): (ObjectId, ObjectId)) -> Self {
        FeatureKey::Pair(left, right)
    }
}

impl From<(u64, u64)> for FeatureKey {
    fn from((left, right): (u64, u64)) -> Self {
        FeatureKey::Pair(ObjectId(left), ObjectId(right))
    }
}

impl fmt::Display for FeatureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureKey::Object(id) => write!(f, "{id}"),
            FeatureKey::Pair(left, right) => write!(f, "({left}, {right})"),
        }
    }
}
