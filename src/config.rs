//! Declarative description of a ranking funnel and its evaluation.
//!
//! ```json
//! {
//!   "num_candidates": 200,
//!   "stages": [
//!     { "target": 50, "ranker": { "kind": "model", "model_path": "linear.json",
//!                                 "numeric_features": ["als_score", "popularity"] } },
//!     { "target": 10, "ranker": { "kind": "softmax", "temperature": 0.05, "seed": 7 } }
//!   ],
//!   "evaluation": {
//!     "batch_size": 64,
//!     "metrics": [ { "metric": "precision", "k": 10 }, { "metric": "ndcg", "k": 10 } ]
//!   }
//! }
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::metrics::{ItemCategories, Metric, NoveltyTable, Reduction, UserHistory};
use crate::ranking::{
    FeatureRanker, LinearScorer, ModelRanker, ModelRankerConfig, Ranker, RankingError, RankingPipeline,
    SoftmaxSampler, SoftmaxSamplerConfig,
};
use crate::types::Action;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid ranking stage: {0}")]
    Ranking(#[from] RankingError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_num_candidates")]
    pub num_candidates: usize,
    #[serde(default)]
    pub stages: Vec<StageConfig>,
    #[serde(default)]
    pub evaluation: EvaluationConfig,
}

fn default_num_candidates() -> usize {
    100
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            num_candidates: default_num_candidates(),
            stages: Vec::new(),
            evaluation: EvaluationConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageConfig {
    pub target: usize,
    pub ranker: RankerConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RankerConfig {
    Feature(FeatureRanker),
    Softmax(SoftmaxSamplerConfig),
    Model(ModelStageConfig),
}

/// A model stage scored by a [`LinearScorer`] loaded from `model_path`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelStageConfig {
    pub model_path: PathBuf,
    pub numeric_features: Vec<String>,
    #[serde(default)]
    pub categorical_features: Vec<String>,
    #[serde(default)]
    pub score_feature: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default)]
    pub metrics: Vec<MetricSpec>,
}

fn default_batch_size() -> usize {
    1
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            metrics: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricName {
    Precision,
    Recall,
    Map,
    Dcg,
    Ndcg,
    Auc,
    Novelty,
    Serendipity,
    CategoryDiversity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricSpec {
    pub metric: MetricName,
    #[serde(default)]
    pub k: Option<usize>,
    #[serde(default)]
    pub reduction: Reduction,
    /// Overrides the default `<metric>@<k>` display name.
    #[serde(default)]
    pub name: Option<String>,
}

impl PipelineConfig {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let f = std::fs::File::open(path)?;
        Ok(serde_json::from_reader(f)?)
    }

    /// Build the ranking funnel. Model paths are resolved relative to `base_dir`.
    pub fn build_pipeline(&self, base_dir: &Path) -> Result<RankingPipeline, ConfigError> {
        let mut stages = Vec::with_capacity(self.stages.len());
        for stage in &self.stages {
            let ranker: Ranker = match &stage.ranker {
                RankerConfig::Feature(ranker) => ranker.clone().into(),
                RankerConfig::Softmax(config) => SoftmaxSampler::new(config.clone())?.into(),
                RankerConfig::Model(model) => {
                    let scorer = LinearScorer::load(&base_dir.join(&model.model_path))?;
                    let mut config = ModelRankerConfig::new(model.numeric_features.iter().cloned());
                    config.categorical_features = model.categorical_features.clone();
                    if let Some(score_feature) = &model.score_feature {
                        config.score_feature = score_feature.clone();
                    }
                    ModelRanker::new(Arc::new(scorer), config).into()
                }
            };
            stages.push((ranker, stage.target));
        }
        Ok(RankingPipeline::from_stages(stages))
    }

    /// Build the configured metrics. Aspect metrics draw their tables from
    /// `history`, the training log.
    pub fn build_metrics(&self, history: &[Action]) -> Vec<Metric> {
        let mut novelty = None;
        let mut users = None;
        let mut categories = None;

        self.evaluation
            .metrics
            .iter()
            .map(|spec| {
                let metric = match spec.metric {
                    MetricName::Precision => Metric::precision(spec.k),
                    MetricName::Recall => Metric::recall(spec.k),
                    MetricName::Map => Metric::map(spec.k),
                    MetricName::Dcg => Metric::dcg(spec.k),
                    MetricName::Ndcg => Metric::ndcg(spec.k),
                    MetricName::Auc => Metric::auc(spec.k),
                    MetricName::Novelty => {
                        let table = novelty
                            .get_or_insert_with(|| Arc::new(NoveltyTable::from_actions(history)))
                            .clone();
                        Metric::novelty(table, spec.k)
                    }
                    MetricName::Serendipity => {
                        let table = users
                            .get_or_insert_with(|| Arc::new(UserHistory::from_actions(history)))
                            .clone();
                        Metric::serendipity(table, spec.k)
                    }
                    MetricName::CategoryDiversity => {
                        let table = categories
                            .get_or_insert_with(|| Arc::new(ItemCategories::from_actions(history)))
                            .clone();
                        Metric::category_diversity(table, spec.k)
                    }
                };
                let metric = metric.with_reduction(spec.reduction);
                match &spec.name {
                    Some(name) => metric.with_name(name.clone()),
                    None => metric,
                }
            })
            .collect()
    }
}
