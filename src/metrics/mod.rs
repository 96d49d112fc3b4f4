//! Per-request recommendation metrics and their reductions.
//!
//! A [`Metric`] scores one request's top-`k` predictions against the items the
//! user actually interacted with. Quality metrics only need the predictions and
//! positives; the aspect metrics (novelty, serendipity, category diversity)
//! also carry lookup tables built from a training log.

pub mod aspects;
pub mod quality;

pub use aspects::{ItemCategories, NoveltyTable, UserHistory};
pub use quality::{PairwiseAuc, RankConsistency};

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{Candidate, ObjectId};

#[derive(Debug, Error)]
pub enum MetricError {
    #[error("{metric} is undefined for an empty prediction list")]
    EmptyPredictions { metric: String },
    #[error("{metric} is undefined for an empty positive set")]
    EmptyPositives { metric: String },
    #[error("{metric} needs the user the predictions were made for")]
    MissingContext { metric: String },
    #[error("No interaction history for user {0}")]
    UnknownUser(ObjectId),
    #[error("No category for item {0}")]
    MissingCategory(ObjectId),
    #[error("Unknown reduction: {0}")]
    UnknownReduction(String),
}

/// How per-request values are combined into one reported score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reduction {
    #[default]
    Mean,
    Sum,
    Max,
    Min,
}

impl Reduction {
    /// `None` for an empty slice.
    pub fn apply(self, values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }
        let reduced = match self {
            Reduction::Mean => values.iter().sum::<f64>() / values.len() as f64,
            Reduction::Sum => values.iter().sum(),
            Reduction::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Reduction::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
        };
        Some(reduced)
    }
}

impl FromStr for Reduction {
    type Err = MetricError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mean" => Ok(Reduction::Mean),
            "sum" => Ok(Reduction::Sum),
            "max" => Ok(Reduction::Max),
            "min" => Ok(Reduction::Min),
            other => Err(MetricError::UnknownReduction(other.to_string())),
        }
    }
}

impl fmt::Display for Reduction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Reduction::Mean => "mean",
            Reduction::Sum => "sum",
            Reduction::Max => "max",
            Reduction::Min => "min",
        };
        f.write_str(name)
    }
}

#[derive(Clone)]
pub enum MetricKind {
    Precision,
    Recall,
    AveragePrecision,
    Dcg,
    Ndcg,
    Auc(Arc<dyn RankConsistency>),
    Novelty(Arc<NoveltyTable>),
    Serendipity(Arc<UserHistory>),
    CategoryDiversity(Arc<ItemCategories>),
}

impl MetricKind {
    pub fn base_name(&self) -> &'static str {
        match self {
            MetricKind::Precision => "precision",
            MetricKind::Recall => "recall",
            MetricKind::AveragePrecision => "MAP",
            MetricKind::Dcg => "DCG",
            MetricKind::Ndcg => "NDCG",
            MetricKind::Auc(_) => "AUC",
            MetricKind::Novelty(_) => "novelty",
            MetricKind::Serendipity(_) => "serendipity",
            MetricKind::CategoryDiversity(_) => "category_diversity",
        }
    }
}

impl fmt::Debug for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.base_name())
    }
}

/// A metric with its cutoff, reduction and display name.
#[derive(Debug, Clone)]
pub struct Metric {
    kind: MetricKind,
    k: Option<usize>,
    reduction: Reduction,
    name: String,
}

impl Metric {
    /// Display name is `<base>@<k>`, or just `<base>` without a cutoff.
    pub fn new(kind: MetricKind, k: impl Into<Option<usize>>) -> Self {
        let k = k.into();
        let name = match k {
            Some(k) => format!("{}@{k}", kind.base_name()),
            None => kind.base_name().to_string(),
        };
        Self {
            kind,
            k,
            reduction: Reduction::Mean,
            name,
        }
    }

    pub fn precision(k: impl Into<Option<usize>>) -> Self {
        Self::new(MetricKind::Precision, k)
    }

    pub fn recall(k: impl Into<Option<usize>>) -> Self {
        Self::new(MetricKind::Recall, k)
    }

    pub fn map(k: impl Into<Option<usize>>) -> Self {
        Self::new(MetricKind::AveragePrecision, k)
    }

    pub fn dcg(k: impl Into<Option<usize>>) -> Self {
        Self::new(MetricKind::Dcg, k)
    }

    pub fn ndcg(k: impl Into<Option<usize>>) -> Self {
        Self::new(MetricKind::Ndcg, k)
    }

    /// AUC scored by the built-in pairwise evaluator.
    pub fn auc(k: impl Into<Option<usize>>) -> Self {
        Self::auc_with(Arc::new(PairwiseAuc), k)
    }

    pub fn auc_with(evaluator: Arc<dyn RankConsistency>, k: impl Into<Option<usize>>) -> Self {
        Self::new(MetricKind::Auc(evaluator), k)
    }

    pub fn novelty(table: Arc<NoveltyTable>, k: impl Into<Option<usize>>) -> Self {
        Self::new(MetricKind::Novelty(table), k)
    }

    pub fn serendipity(history: Arc<UserHistory>, k: impl Into<Option<usize>>) -> Self {
        Self::new(MetricKind::Serendipity(history), k)
    }

    pub fn category_diversity(categories: Arc<ItemCategories>, k: impl Into<Option<usize>>) -> Self {
        Self::new(MetricKind::CategoryDiversity(categories), k)
    }

    pub fn with_reduction(mut self, reduction: Reduction) -> Self {
        self.reduction = reduction;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn kind(&self) -> &MetricKind {
        &self.kind
    }

    pub fn k(&self) -> Option<usize> {
        self.k
    }

    pub fn reduction(&self) -> Reduction {
        self.reduction
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Score one request. `predictions` is cut to this metric's `k` first.
    pub fn compute(
        &self,
        predictions: &[Candidate],
        positives: &BTreeSet<ObjectId>,
        context: Option<ObjectId>,
    ) -> Result<f64, MetricError> {
        let cutoff = self.k.map_or(predictions.len(), |k| k.min(predictions.len()));
        let predicted: Vec<ObjectId> = predictions[..cutoff].iter().map(Candidate::id).collect();

        match &self.kind {
            MetricKind::Precision => quality::precision(&predicted, positives)
                .ok_or_else(|| MetricError::EmptyPredictions { metric: self.name.clone() }),
            MetricKind::Recall => quality::recall(&predicted, positives)
                .ok_or_else(|| MetricError::EmptyPositives { metric: self.name.clone() }),
            MetricKind::AveragePrecision => {
                let k = self.k.unwrap_or(predicted.len());
                Ok(quality::average_precision(&predicted, positives, k))
            }
            MetricKind::Dcg => Ok(quality::dcg(&quality::relevance(&predicted, positives))),
            MetricKind::Ndcg => Ok(quality::ndcg(&quality::relevance(&predicted, positives))),
            MetricKind::Auc(evaluator) => Ok(quality::auc(evaluator.as_ref(), &predicted, positives)),
            MetricKind::Novelty(table) => Ok(table.novelty(&predicted)),
            MetricKind::Serendipity(history) => {
                let user = context.ok_or_else(|| MetricError::MissingContext { metric: self.name.clone() })?;
                history.serendipity(user, &predicted, positives)
            }
            MetricKind::CategoryDiversity(categories) => categories.diversity(&predicted),
        }
    }
}
