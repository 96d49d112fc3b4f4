use std::fmt;
use std::path::Path;
use std::sync::Arc;

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ranking::select::{select_top_n, Order};
use crate::ranking::RankingError;
use crate::types::{Candidate, Feature, FeatureKind, ObjectId};

/// Value used for a numeric schema feature a candidate does not carry.
pub const NUMERIC_FILL_VALUE: f32 = -9_999_999.0;
/// Value used for a categorical schema feature a candidate does not carry.
pub const CATEGORICAL_FILL_VALUE: &str = "EMPTY";

/// Fixed-schema feature rows submitted to a scoring model, one row per candidate.
#[derive(Debug, Clone)]
pub struct FeatureBatch {
    pub numeric: Array2<f32>,
    pub categorical: Vec<Vec<String>>,
    pub numeric_names: Vec<String>,
    pub categorical_names: Vec<String>,
}

impl FeatureBatch {
    pub fn rows(&self) -> usize {
        self.numeric.nrows()
    }
}

/// A trained model that scores feature rows. Training happens elsewhere.
pub trait ScoringModel: Send + Sync {
    /// One score per row of `batch`.
    fn predict(&self, batch: &FeatureBatch) -> Result<Array1<f32>, RankingError>;
}

/// Weighted sum of the numeric features plus a bias.
///
/// Categorical features are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearScorer {
    pub weights: Vec<f32>,
    #[serde(default)]
    pub bias: f32,
}

impl LinearScorer {
    pub fn new(weights: Vec<f32>, bias: f32) -> Self {
        Self { weights, bias }
    }

    /// Load weights exported as JSON: `{"weights": [...], "bias": 0.0}`.
    pub fn load(path: &Path) -> Result<Self, RankingError> {
        let load_error = |reason: String| RankingError::ModelLoad {
            path: path.to_path_buf(),
            reason,
        };
        let f = std::fs::File::open(path).map_err(|e| load_error(e.to_string()))?;
        let scorer: LinearScorer =
            serde_json::from_reader(f).map_err(|e| load_error(e.to_string()))?;
        debug!(path = %path.display(), weights = scorer.weights.len(), "linear scorer loaded");
        Ok(scorer)
    }
}

impl ScoringModel for LinearScorer {
    fn predict(&self, batch: &FeatureBatch) -> Result<Array1<f32>, RankingError> {
        if batch.numeric.ncols() != self.weights.len() {
            return Err(RankingError::Model(format!(
                "expected {} numeric features, got {}",
                self.weights.len(),
                batch.numeric.ncols()
            )));
        }
        let weights = Array1::from(self.weights.clone());
        Ok(batch.numeric.dot(&weights) + self.bias)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelRankerConfig {
    pub numeric_features: Vec<String>,
    #[serde(default)]
    pub categorical_features: Vec<String>,
    #[serde(default = "default_score_feature")]
    pub score_feature: String,
}

fn default_score_feature() -> String {
    "model_relevance".into()
}

impl ModelRankerConfig {
    pub fn new<S: Into<String>>(numeric_features: impl IntoIterator<Item = S>) -> Self {
        Self {
            numeric_features: numeric_features.into_iter().map(Into::into).collect(),
            categorical_features: Vec::new(),
            score_feature: default_score_feature(),
        }
    }
}

/// Scores candidates with an external model and keeps the best `n`.
///
/// The model's score is written onto every candidate under
/// `score_feature`, so later stages can reuse it.
pub struct ModelRanker {
    model: Arc<dyn ScoringModel>,
    config: ModelRankerConfig,
}

impl ModelRanker {
    pub fn new(model: Arc<dyn ScoringModel>, config: ModelRankerConfig) -> Self {
        Self { model, config }
    }

    pub fn config(&self) -> &ModelRankerConfig {
        &self.config
    }

    pub fn build_features(&self, candidates: &[Candidate]) -> Result<FeatureBatch, RankingError> {
        let numeric_names = &self.config.numeric_features;
        let categorical_names = &self.config.categorical_features;

        let mut numeric = Vec::with_capacity(candidates.len() * numeric_names.len());
        let mut categorical = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            for name in numeric_names {
                let value = match candidate.feature(name) {
                    None => NUMERIC_FILL_VALUE,
                    Some(Feature::Number(value)) => *value as f32,
                    Some(other) => return Err(wrong_kind(candidate, name, FeatureKind::Number, other)),
                };
                numeric.push(value);
            }

            let mut row = Vec::with_capacity(categorical_names.len());
            for name in categorical_names {
                let value = match candidate.feature(name) {
                    None => CATEGORICAL_FILL_VALUE.to_string(),
                    Some(Feature::Category(value)) => value.clone(),
                    Some(Feature::Number(value)) => value.to_string(),
                    Some(other) => {
                        return Err(wrong_kind(candidate, name, FeatureKind::Category, other))
                    }
                };
                row.push(value);
            }
            categorical.push(row);
        }

        Ok(FeatureBatch {
            numeric: Array2::from_shape_vec((candidates.len(), numeric_names.len()), numeric)?,
            categorical,
            numeric_names: numeric_names.clone(),
            categorical_names: categorical_names.clone(),
        })
    }

    pub fn rank(
        &self,
        context: ObjectId,
        mut candidates: Vec<Candidate>,
        n: usize,
    ) -> Result<Vec<Candidate>, RankingError> {
        if candidates.is_empty() {
            return Ok(candidates);
        }

        let batch = self.build_features(&candidates)?;
        let scores = self.model.predict(&batch)?;
        if scores.len() != candidates.len() {
            return Err(RankingError::ScoreCountMismatch {
                expected: candidates.len(),
                found: scores.len(),
            });
        }

        for (candidate, score) in candidates.iter_mut().zip(scores.iter()) {
            candidate.set_feature(self.config.score_feature.clone(), *score)?;
        }
        debug!(context = %context, scored = candidates.len(), n, "model ranking");
        select_top_n(candidates, &self.config.score_feature, n, Order::Descending)
    }
}

impl fmt::Debug for ModelRanker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelRanker")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn wrong_kind(candidate: &Candidate, feature: &str, expected: FeatureKind, found: &Feature) -> RankingError {
    RankingError::WrongKind {
        candidate: candidate.id(),
        feature: feature.to_string(),
        expected,
        found: found.kind(),
    }
}
