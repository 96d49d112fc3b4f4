pub mod knn;

pub use knn::DotProductKnn;

use std::collections::BTreeMap;

use thiserror::Error;

use crate::types::{Candidate, Embedding, ObjectId};

/// Trained embeddings keyed by object id, in ascending id order.
pub type EmbeddingTable = BTreeMap<ObjectId, Embedding>;

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("No embedding for object {0}")]
    MissingEmbedding(ObjectId),
    #[error("Embedding for object {id} has dimension {found}, expected {expected}")]
    DimensionMismatch {
        id: ObjectId,
        expected: usize,
        found: usize,
    },
    #[error("Embedding matrix shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),
}

/// First stage of the funnel: a bounded candidate set for a context.
pub trait CandidateGenerator {
    /// At most `n` candidates, best first.
    fn extract_candidates(&self, context: ObjectId, n: usize) -> Result<Vec<Candidate>, RetrievalError>;

    /// One result list per context, in input order.
    fn batch_extract_candidates(
        &self,
        contexts: &[ObjectId],
        n: usize,
    ) -> Result<Vec<Vec<Candidate>>, RetrievalError> {
        contexts
            .iter()
            .map(|&context| self.extract_candidates(context, n))
            .collect()
    }
}
