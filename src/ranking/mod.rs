pub mod feature;
pub mod model;
pub mod pipeline;
pub mod select;
pub mod softmax;

pub use feature::FeatureRanker;
pub use model::{FeatureBatch, LinearScorer, ModelRanker, ModelRankerConfig, ScoringModel};
pub use pipeline::RankingPipeline;
pub use select::{select_top_n, Order};
pub use softmax::{SoftmaxSampler, SoftmaxSamplerConfig};

use std::path::PathBuf;

use thiserror::Error;

use crate::types::{Candidate, FeatureKind, KindConflict, ObjectId};

#[derive(Debug, Error)]
pub enum RankingError {
    #[error("Candidate {candidate} has no feature {feature}")]
    MissingFeature { candidate: ObjectId, feature: String },
    #[error("Feature {feature} on candidate {candidate} is a {found}, expected {expected}")]
    WrongKind {
        candidate: ObjectId,
        feature: String,
        expected: FeatureKind,
        found: FeatureKind,
    },
    #[error("Pipeline has {stages} stages but {targets} target counts")]
    StageCountMismatch { stages: usize, targets: usize },
    #[error("Scoring model returned {found} scores for {expected} candidates")]
    ScoreCountMismatch { expected: usize, found: usize },
    #[error("Temperature must be finite and non-negative, got {0}")]
    InvalidTemperature(f64),
    #[error("Scoring model failed: {0}")]
    Model(String),
    #[error("Failed to load scoring model from {path}: {reason}")]
    ModelLoad { path: PathBuf, reason: String },
    #[error("Invalid exploration noise: {0}")]
    Noise(String),
    #[error("Feature matrix shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),
}

impl From<KindConflict> for RankingError {
    fn from(conflict: KindConflict) -> Self {
        RankingError::WrongKind {
            candidate: conflict.candidate,
            feature: conflict.name,
            expected: conflict.existing,
            found: conflict.new,
        }
    }
}

/// One stage of the funnel.
///
/// Every variant takes the candidates of the previous stage and returns at
/// most `n` of them, best first. Stages may write their own score onto the
/// candidates they see.
#[derive(Debug)]
pub enum Ranker {
    Feature(FeatureRanker),
    Model(ModelRanker),
    Softmax(SoftmaxSampler),
    Pipeline(RankingPipeline),
}

impl Ranker {
    pub fn rank(
        &self,
        context: ObjectId,
        candidates: Vec<Candidate>,
        n: usize,
    ) -> Result<Vec<Candidate>, RankingError> {
        match self {
            Ranker::Feature(ranker) => ranker.rank(context, candidates, n),
            Ranker::Model(ranker) => ranker.rank(context, candidates, n),
            Ranker::Softmax(ranker) => ranker.rank(context, candidates, n),
            Ranker::Pipeline(ranker) => ranker.rank(context, candidates, n),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Ranker::Feature(_) => "feature",
            Ranker::Model(_) => "model",
            Ranker::Softmax(_) => "softmax",
            Ranker::Pipeline(_) => "pipeline",
        }
    }
}

impl From<FeatureRanker> for Ranker {
    fn from(ranker: FeatureRanker) -> Self {
        Ranker::Feature(ranker)
    }
}

impl From<ModelRanker> for Ranker {
    fn from(ranker: ModelRanker) -> Self {
        Ranker::Model(ranker)
    }
}

impl From<SoftmaxSampler> for Ranker {
    fn from(ranker: SoftmaxSampler) -> Self {
        Ranker::Softmax(ranker)
    }
}

impl From<RankingPipeline> for Ranker {
    fn from(ranker: RankingPipeline) -> Self {
        Ranker::Pipeline(ranker)
    }
}
