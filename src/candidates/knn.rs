use std::cmp::Ordering;
use std::sync::Arc;

use ndarray::{Array2, ArrayView1};
use tracing::debug;

use crate::candidates::{CandidateGenerator, EmbeddingTable, RetrievalError};
use crate::types::{Candidate, Embedding, ObjectId};

/// Exact nearest-neighbour retrieval by dot product.
///
/// Every right-side embedding is scored against the left-side query. Results
/// are ordered by descending score, ties by ascending id. When both tables are
/// the same (item-to-item similarity) the query id is removed from its own
/// result after truncation, so such a result may hold `n - 1` candidates.
#[derive(Debug, Clone)]
pub struct DotProductKnn {
    left: Arc<EmbeddingTable>,
    matrix: Array2<f32>,
    row_ids: Vec<ObjectId>,
    dim: usize,
    remove_self: bool,
}

impl DotProductKnn {
    pub fn new(left: Arc<EmbeddingTable>, right: Arc<EmbeddingTable>) -> Result<Self, RetrievalError> {
        let dim = right
            .values()
            .chain(left.values())
            .next()
            .map_or(0, Embedding::dim);
        check_dimensions(&left, dim)?;
        check_dimensions(&right, dim)?;

        // Row order is ascending id (BTreeMap iteration order)
        let mut row_ids = Vec::with_capacity(right.len());
        let mut values = Vec::with_capacity(right.len() * dim);
        for (id, embedding) in right.iter() {
            row_ids.push(*id);
            values.extend_from_slice(embedding.as_slice());
        }
        let matrix = Array2::from_shape_vec((row_ids.len(), dim), values)?;

        let remove_self = Arc::ptr_eq(&left, &right) || left == right;
        debug!(
            rows = row_ids.len(),
            dim,
            self_similarity = remove_self,
            "dot-product index built"
        );

        Ok(Self {
            left,
            matrix,
            row_ids,
            dim,
            remove_self,
        })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of right-side objects that can be retrieved.
    pub fn len(&self) -> usize {
        self.row_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.row_ids.is_empty()
    }

    pub fn is_self_similarity(&self) -> bool {
        self.remove_self
    }

    fn query(&self, context: ObjectId) -> Result<&Embedding, RetrievalError> {
        self.left
            .get(&context)
            .ok_or(RetrievalError::MissingEmbedding(context))
    }

    fn top_n(&self, scores: ArrayView1<'_, f32>, n: usize, context: ObjectId) -> Vec<Candidate> {
        let compare = |a: &usize, b: &usize| -> Ordering {
            // Descending score, then ascending id
            scores[*b]
                .total_cmp(&scores[*a])
                .then_with(|| self.row_ids[*a].cmp(&self.row_ids[*b]))
        };

        let take = n.min(self.row_ids.len());
        if take == 0 {
            return Vec::new();
        }

        let mut rows: Vec<usize> = (0..self.row_ids.len()).collect();
        if take < rows.len() {
            rows.select_nth_unstable_by(take - 1, compare);
            rows.truncate(take);
        }
        rows.sort_unstable_by(compare);

        rows.into_iter()
            .map(|row| self.row_ids[row])
            .filter(|id| !(self.remove_self && *id == context))
            .map(Candidate::new)
            .collect()
    }
}

impl CandidateGenerator for DotProductKnn {
    fn extract_candidates(&self, context: ObjectId, n: usize) -> Result<Vec<Candidate>, RetrievalError> {
        let query = ArrayView1::from(self.query(context)?.as_slice());
        let scores = self.matrix.dot(&query);
        Ok(self.top_n(scores.view(), n, context))
    }

    fn batch_extract_candidates(
        &self,
        contexts: &[ObjectId],
        n: usize,
    ) -> Result<Vec<Vec<Candidate>>, RetrievalError> {
        // One column per query: (rows x dim) . (dim x batch)
        let mut queries = Array2::<f32>::zeros((self.dim, contexts.len()));
        for (col, &context) in contexts.iter().enumerate() {
            let embedding = self.query(context)?;
            queries
                .column_mut(col)
                .assign(&ArrayView1::from(embedding.as_slice()));
        }
        let scores = self.matrix.dot(&queries);

        Ok(contexts
            .iter()
            .enumerate()
            .map(|(col, &context)| self.top_n(scores.column(col), n, context))
            .collect())
    }
}

fn check_dimensions(table: &EmbeddingTable, dim: usize) -> Result<(), RetrievalError> {
    for (id, embedding) in table {
        if embedding.dim() != dim {
            return Err(RetrievalError::DimensionMismatch {
                id: *id,
                expected: dim,
                found: embedding.dim(),
            });
        }
    }
    Ok(())
}
