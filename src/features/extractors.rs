use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::features::{FeatureError, FeatureStorage};
use crate::types::{Embedding, Feature, FeatureKey, FeatureKind, FeatureMap, ObjectId};

/// How an extractor derives its storage key from a (context, candidate) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeySelector {
    Context,
    #[default]
    Candidate,
    Pair,
}

impl KeySelector {
    pub fn key(self, context: ObjectId, candidate: ObjectId) -> FeatureKey {
        match self {
            KeySelector::Context => FeatureKey::Object(context),
            KeySelector::Candidate => FeatureKey::Object(candidate),
            KeySelector::Pair => FeatureKey::Pair(context, candidate),
        }
    }
}

/// Looks up a fixed list of features in a storage, filling in defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticFeatureExtractor {
    storage: Arc<FeatureStorage>,
    features: Vec<String>,
    key: KeySelector,
}

impl StaticFeatureExtractor {
    /// Fails if any requested feature was never registered in `storage`,
    /// since such a feature could never be filled.
    pub fn new<S>(
        storage: Arc<FeatureStorage>,
        features: impl IntoIterator<Item = S>,
        key: KeySelector,
    ) -> Result<Self, FeatureError>
    where
        S: Into<String>,
    {
        let features: Vec<String> = features.into_iter().map(Into::into).collect();
        for name in &features {
            storage.get_feature_default(name)?;
        }
        Ok(Self {
            storage,
            features,
            key,
        })
    }

    pub fn feature_names(&self) -> &[String] {
        &self.features
    }

    pub fn key_selector(&self) -> KeySelector {
        self.key
    }

    pub fn extract(&self, key: FeatureKey) -> Result<FeatureMap, FeatureError> {
        let stored = self.storage.get(key);
        let mut result = FeatureMap::new();
        for name in &self.features {
            let value = match stored.get(name) {
                Some(value) => value.clone(),
                None => self.storage.get_feature_default(name)?.clone(),
            };
            result.insert(name.clone(), value);
        }
        Ok(result)
    }
}

/// Scores a candidate against the context by the dot product of their
/// embeddings, looked up at extraction time.
///
/// The context side is keyed by the context id in `left`, the candidate side
/// by the candidate id in `right`. Each embedding name yields one numeric
/// feature of the same name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingScoreExtractor {
    left: Arc<FeatureStorage>,
    right: Arc<FeatureStorage>,
    embedding_names: Vec<String>,
}

impl EmbeddingScoreExtractor {
    pub fn new<S>(
        left: Arc<FeatureStorage>,
        right: Arc<FeatureStorage>,
        embedding_names: impl IntoIterator<Item = S>,
    ) -> Self
    where
        S: Into<String>,
    {
        Self {
            left,
            right,
            embedding_names: embedding_names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn embedding_names(&self) -> &[String] {
        &self.embedding_names
    }

    pub fn extract(&self, context: ObjectId, candidate: ObjectId) -> Result<FeatureMap, FeatureError> {
        let mut result = FeatureMap::new();
        for name in &self.embedding_names {
            let left = embedding(&self.left, FeatureKey::Object(context), name)?;
            let right = embedding(&self.right, FeatureKey::Object(candidate), name)?;
            let score = left.dot(right).ok_or_else(|| FeatureError::DimensionMismatch {
                name: name.clone(),
                left: left.dim(),
                right: right.dim(),
            })?;
            result.insert(name.clone(), Feature::Number(score as f64));
        }
        Ok(result)
    }
}

fn embedding<'a>(
    storage: &'a FeatureStorage,
    key: FeatureKey,
    name: &str,
) -> Result<&'a Embedding, FeatureError> {
    let value = storage.value(key, name)?;
    value.as_embedding().ok_or_else(|| FeatureError::KindMismatch {
        key,
        name: name.to_string(),
        expected: FeatureKind::Embedding,
        found: value.kind(),
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeatureExtractor {
    Static(StaticFeatureExtractor),
    EmbeddingScore(EmbeddingScoreExtractor),
}

impl FeatureExtractor {
    pub fn extract(&self, context: ObjectId, candidate: ObjectId) -> Result<FeatureMap, FeatureError> {
        match self {
            FeatureExtractor::Static(extractor) => {
                extractor.extract(extractor.key_selector().key(context, candidate))
            }
            FeatureExtractor::EmbeddingScore(extractor) => extractor.extract(context, candidate),
        }
    }
}

impl From<StaticFeatureExtractor> for FeatureExtractor {
    fn from(extractor: StaticFeatureExtractor) -> Self {
        FeatureExtractor::Static(extractor)
    }
}

impl From<EmbeddingScoreExtractor> for FeatureExtractor {
    fn from(extractor: EmbeddingScoreExtractor) -> Self {
        FeatureExtractor::EmbeddingScore(extractor)
    }
}
