use thiserror::Error;
use tracing::debug;

use crate::candidates::{CandidateGenerator, RetrievalError};
use crate::features::{FeatureError, FeatureManager};
use crate::ranking::{Ranker, RankingError};
use crate::types::{Candidate, ObjectId};

#[derive(Debug, Error)]
pub enum RecommendError {
    #[error("Candidate retrieval failed: {0}")]
    Retrieval(#[from] RetrievalError),
    #[error("Feature extraction failed: {0}")]
    Feature(#[from] FeatureError),
    #[error("Ranking failed: {0}")]
    Ranking(#[from] RankingError),
}

pub trait Recommender {
    fn recommend(&self, user: ObjectId, n: usize) -> Result<Vec<Candidate>, RecommendError>;

    /// One list per user, in input order.
    fn recommend_batch(&self, users: &[ObjectId], n: usize) -> Result<Vec<Vec<Candidate>>, RecommendError> {
        users.iter().map(|&user| self.recommend(user, n)).collect()
    }
}

/// Retrieval, feature enrichment and ranking wired into one recommender.
#[derive(Debug)]
pub struct FunnelRecommender<G> {
    generator: G,
    features: FeatureManager,
    ranker: Ranker,
    num_candidates: usize,
}

impl<G: CandidateGenerator> FunnelRecommender<G> {
    /// `num_candidates` is the retrieval size; it is raised to `n` when a
    /// caller asks for more.
    pub fn new(generator: G, features: FeatureManager, ranker: impl Into<Ranker>, num_candidates: usize) -> Self {
        Self {
            generator,
            features,
            ranker: ranker.into(),
            num_candidates,
        }
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    pub fn features(&self) -> &FeatureManager {
        &self.features
    }

    pub fn ranker(&self) -> &Ranker {
        &self.ranker
    }

    fn rerank(&self, user: ObjectId, retrieved: Vec<Candidate>, n: usize) -> Result<Vec<Candidate>, RecommendError> {
        let enriched = self
            .features
            .extract(user, retrieved)
            .collect::<Result<Vec<_>, _>>()?;
        let ranked = self.ranker.rank(user, enriched, n)?;
        debug!(user = %user, n, returned = ranked.len(), "recommendations ready");
        Ok(ranked)
    }
}

impl<G: CandidateGenerator> Recommender for FunnelRecommender<G> {
    fn recommend(&self, user: ObjectId, n: usize) -> Result<Vec<Candidate>, RecommendError> {
        let retrieved = self
            .generator
            .extract_candidates(user, self.num_candidates.max(n))?;
        self.rerank(user, retrieved, n)
    }

    fn recommend_batch(&self, users: &[ObjectId], n: usize) -> Result<Vec<Vec<Candidate>>, RecommendError> {
        let retrieved = self
            .generator
            .batch_extract_candidates(users, self.num_candidates.max(n))?;
        users
            .iter()
            .zip(retrieved)
            .map(|(&user, candidates)| self.rerank(user, candidates, n))
            .collect()
    }
}
