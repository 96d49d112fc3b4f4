pub mod requests;

pub use requests::{group_requests, read_actions, Request};

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::metrics::{Metric, MetricError};
use crate::recommender::{RecommendError, Recommender};
use crate::types::{Action, Candidate, ObjectId};

#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error("At least one metric must declare a cutoff k")]
    NoBoundedMetric,
    #[error("Metric name {0} is configured twice")]
    DuplicateMetric(String),
    #[error("No test requests loaded")]
    NoRequests,
    #[error("Batch size must be at least 1")]
    InvalidBatchSize,
    #[error("Recommender returned {found} result lists for a batch of {expected}")]
    BatchSizeMismatch { expected: usize, found: usize },
    #[error("Metric {metric} failed on request {request_id}: {source}")]
    Metric {
        metric: String,
        request_id: u64,
        #[source]
        source: MetricError,
    },
    #[error("Recommendation failed: {0}")]
    Recommend(#[from] RecommendError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid action on line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Aggregated metric values of one evaluation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub requests: usize,
    pub metrics: BTreeMap<String, f64>,
}

impl EvaluationReport {
    pub fn get(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).copied()
    }
}

/// Replays held-out requests through a recommender and scores the results.
#[derive(Debug)]
pub struct Evaluator {
    metrics: Vec<Metric>,
    max_k: usize,
    requests: Vec<Request>,
}

impl Evaluator {
    pub fn new(metrics: Vec<Metric>) -> Result<Self, EvaluationError> {
        let mut names = BTreeSet::new();
        for metric in &metrics {
            if !names.insert(metric.name()) {
                return Err(EvaluationError::DuplicateMetric(metric.name().to_string()));
            }
        }
        let max_k = metrics
            .iter()
            .filter_map(Metric::k)
            .max()
            .ok_or(EvaluationError::NoBoundedMetric)?;

        Ok(Self {
            metrics,
            max_k,
            requests: Vec::new(),
        })
    }

    /// Number of recommendations requested per user: the largest metric cutoff.
    pub fn max_k(&self) -> usize {
        self.max_k
    }

    pub fn metrics(&self) -> &[Metric] {
        &self.metrics
    }

    pub fn requests(&self) -> &[Request] {
        &self.requests
    }

    /// Replace the test requests with the ones grouped from `actions`.
    pub fn load_test_actions(&mut self, actions: &[Action]) {
        self.requests = group_requests(actions);
        debug!(
            actions = actions.len(),
            requests = self.requests.len(),
            "test actions loaded"
        );
    }

    /// Call `recommend(user, max_k)` once per request.
    pub fn evaluate<F>(&self, mut recommend: F) -> Result<EvaluationReport, EvaluationError>
    where
        F: FnMut(ObjectId, usize) -> Vec<Candidate>,
    {
        self.ensure_requests()?;
        let predictions = self
            .requests
            .iter()
            .map(|request| recommend(request.user_id, self.max_k))
            .collect();
        self.score(predictions)
    }

    /// Call `recommend(users, max_k)` once per chunk of `batch_size` requests.
    ///
    /// Produces the same per-request values as [`Evaluator::evaluate`] for a
    /// callback whose batched and single answers agree.
    pub fn evaluate_batched<F>(&self, mut recommend: F, batch_size: usize) -> Result<EvaluationReport, EvaluationError>
    where
        F: FnMut(&[ObjectId], usize) -> Vec<Vec<Candidate>>,
    {
        self.ensure_requests()?;
        if batch_size == 0 {
            return Err(EvaluationError::InvalidBatchSize);
        }

        let mut predictions = Vec::with_capacity(self.requests.len());
        for chunk in self.requests.chunks(batch_size) {
            let users: Vec<ObjectId> = chunk.iter().map(|r| r.user_id).collect();
            let batch = recommend(&users, self.max_k);
            if batch.len() != users.len() {
                return Err(EvaluationError::BatchSizeMismatch {
                    expected: users.len(),
                    found: batch.len(),
                });
            }
            predictions.extend(batch);
        }
        self.score(predictions)
    }

    /// Evaluate a [`Recommender`], batching when `batch_size > 1`.
    pub fn evaluate_recommender<R>(&self, recommender: &R, batch_size: usize) -> Result<EvaluationReport, EvaluationError>
    where
        R: Recommender + ?Sized,
    {
        self.ensure_requests()?;
        if batch_size == 0 {
            return Err(EvaluationError::InvalidBatchSize);
        }

        let mut predictions = Vec::with_capacity(self.requests.len());
        if batch_size == 1 {
            for request in &self.requests {
                predictions.push(recommender.recommend(request.user_id, self.max_k)?);
            }
        } else {
            for chunk in self.requests.chunks(batch_size) {
                let users: Vec<ObjectId> = chunk.iter().map(|r| r.user_id).collect();
                let batch = recommender.recommend_batch(&users, self.max_k)?;
                if batch.len() != users.len() {
                    return Err(EvaluationError::BatchSizeMismatch {
                        expected: users.len(),
                        found: batch.len(),
                    });
                }
                predictions.extend(batch);
            }
        }
        self.score(predictions)
    }

    fn ensure_requests(&self) -> Result<(), EvaluationError> {
        if self.requests.is_empty() {
            return Err(EvaluationError::NoRequests);
        }
        info!(
            requests = self.requests.len(),
            metrics = self.metrics.len(),
            max_k = self.max_k,
            "evaluation started"
        );
        Ok(())
    }

    // predictions[i] answers self.requests[i]
    fn score(&self, predictions: Vec<Vec<Candidate>>) -> Result<EvaluationReport, EvaluationError> {
        let mut metrics = BTreeMap::new();
        for metric in &self.metrics {
            let mut values = Vec::with_capacity(self.requests.len());
            for (prediction, request) in predictions.iter().zip(&self.requests) {
                let value = metric
                    .compute(prediction, &request.positives, Some(request.user_id))
                    .map_err(|source| EvaluationError::Metric {
                        metric: metric.name().to_string(),
                        request_id: request.request_id,
                        source,
                    })?;
                values.push(value);
            }
            let aggregated = metric
                .reduction()
                .apply(&values)
                .ok_or(EvaluationError::NoRequests)?;
            debug!(metric = metric.name(), reduction = %metric.reduction(), value = aggregated, "metric aggregated");
            metrics.insert(metric.name().to_string(), aggregated);
        }

        info!(requests = predictions.len(), "evaluation finished");
        Ok(EvaluationReport {
            requests: predictions.len(),
            metrics,
        })
    }
}
