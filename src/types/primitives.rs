use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::identifiers::ObjectId;

/// Named feature values attached to a candidate or stored per key.
pub type FeatureMap = BTreeMap<String, Feature>;

/// A fixed-length vector representing an entity for similarity search.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Embedding(Vec<f32>);

impl Embedding {
    pub fn new(values: Vec<f32>) -> Self {
        Embedding(values)
    }

    pub fn dim(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// Dot product, or `None` when the dimensionalities differ.
    pub fn dot(&self, other: &Embedding) -> Option<f32> {
        if self.0.len() != other.0.len() {
            return None;
        }
        Some(self.0.iter().zip(&other.0).map(|(a, b)| a * b).sum())
    }
}

impl From<Vec<f32>> for Embedding {
    fn from(values: Vec<f32>) -> Self {
        Embedding(values)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureKind {
    Number,
    Category,
    Embedding,
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FeatureKind::Number => "number",
            FeatureKind::Category => "category",
            FeatureKind::Embedding => "embedding",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Feature {
    Number(f64),
    Category(String),
    Embedding(Embedding),
}

impl Feature {
    pub fn kind(&self) -> FeatureKind {
        match self {
            Feature::Number(_) => FeatureKind::Number,
            Feature::Category(_) => FeatureKind::Category,
            Feature::Embedding(_) => FeatureKind::Embedding,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Feature::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_category(&self) -> Option<&str> {
        match self {
            Feature::Category(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_embedding(&self) -> Option<&Embedding> {
        match self {
            Feature::Embedding(value) => Some(value),
            _ => None,
        }
    }
}

impl From<f64> for Feature {
    fn from(value: f64) -> Self {
        Feature::Number(value)
    }
}

impl From<f32> for Feature {
    fn from(value: f32) -> Self {
        Feature::Number(value as f64)
    }
}

impl From<&str> for Feature {
    fn from(value: &str) -> Self {
        Feature::Category(value.to_string())
    }
}

impl From<String> for Feature {
    fn from(value: String) -> Self {
        Feature::Category(value)
    }
}

impl From<Embedding> for Feature {
    fn from(value: Embedding) -> Self {
        Feature::Embedding(value)
    }
}

/// An item flowing through the funnel, accumulating features stage by stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    id: ObjectId,
    #[serde(default)]
    features: FeatureMap,
}

impl Candidate {
    pub fn new(id: impl Into<ObjectId>) -> Self {
        Self {
            id: id.into(),
            features: FeatureMap::new(),
        }
    }

    /// Builder form of [`Candidate::set_feature`] for a fresh candidate.
    ///
    /// Replaces any earlier value of `name`, whatever its kind.
    pub fn with_feature(mut self, name: impl Into<String>, value: impl Into<Feature>) -> Self {
        self.features.insert(name.into(), value.into());
        self
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn features(&self) -> &FeatureMap {
        &self.features
    }

    pub fn feature(&self, name: &str) -> Option<&Feature> {
        self.features.get(name)
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        self.features.get(name).and_then(Feature::as_number)
    }

    /// Store `value` under `name`. A feature never changes kind once set.
    pub fn set_feature(&mut self, name: impl Into<String>, value: impl Into<Feature>) -> Result<(), KindConflict> {
        let name = name.into();
        let value = value.into();
        self.check_kind(&name, &value)?;
        self.features.insert(name, value);
        Ok(())
    }

    /// Merge another feature map into this one, overriding common keys.
    ///
    /// Nothing is written if any value would change the kind of an existing
    /// feature.
    pub fn merge(&mut self, other: FeatureMap) -> Result<(), KindConflict> {
        for (name, value) in &other {
            self.check_kind(name, value)?;
        }
        self.features.extend(other);
        Ok(())
    }

    fn check_kind(&self, name: &str, value: &Feature) -> Result<(), KindConflict> {
        match self.features.get(name) {
            Some(existing) if existing.kind() != value.kind() => Err(KindConflict {
                candidate: self.id,
                name: name.to_string(),
                existing: existing.kind(),
                new: value.kind(),
            }),
            _ => Ok(()),
        }
    }
}

/// A write that would change the kind of a candidate's feature.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Feature {name} on candidate {candidate} is a {existing}, cannot store a {new}")]
pub struct KindConflict {
    pub candidate: ObjectId,
    pub name: String,
    pub existing: FeatureKind,
    pub new: FeatureKind,
}
