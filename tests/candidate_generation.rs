use std::sync::Arc;

use recsys_core::candidates::{CandidateGenerator, DotProductKnn, EmbeddingTable, RetrievalError};
use recsys_core::types::{Candidate, Embedding, ObjectId};

fn table(rows: &[(u64, Vec<f32>)]) -> Arc<EmbeddingTable> {
    Arc::new(
        rows.iter()
            .map(|(id, values)| (ObjectId::new(*id), Embedding::new(values.clone())))
            .collect(),
    )
}

fn ids(candidates: &[Candidate]) -> Vec<u64> {
    candidates.iter().map(|c| c.id().get()).collect()
}

fn users() -> Arc<EmbeddingTable> {
    table(&[(1, vec![1.0, 0.0]), (2, vec![0.0, 1.0]), (3, vec![1.0, 1.0])])
}

fn items() -> Arc<EmbeddingTable> {
    table(&[
        (10, vec![0.75, 0.25]),
        (11, vec![0.5, 0.5]),
        (12, vec![0.25, 0.75]),
        (13, vec![1.0, 0.0]),
        (14, vec![0.0, 0.125]),
    ])
}

#[test]
fn test_extract_orders_by_descending_dot_product() {
    let items = items();
    let knn = DotProductKnn::new(users(), items.clone()).unwrap();
    assert!(!knn.is_self_similarity());

    let result = knn.extract_candidates(ObjectId::new(1), 3).unwrap();
    assert_eq!(ids(&result), vec![13, 10, 11]);

    let query = Embedding::new(vec![1.0, 0.0]);
    let scores: Vec<f32> = result
        .iter()
        .map(|c| items[&c.id()].dot(&query).unwrap())
        .collect();
    assert!(scores.windows(2).all(|w| w[0] >= w[1]), "scores must be non-increasing");
}

#[test]
fn test_extract_returns_exactly_n_when_enough_items() {
    let knn = DotProductKnn::new(users(), items()).unwrap();
    for n in 0..=5 {
        let result = knn.extract_candidates(ObjectId::new(2), n).unwrap();
        assert_eq!(result.len(), n);
    }
}

#[test]
fn test_extract_larger_n_returns_every_item() {
    let knn = DotProductKnn::new(users(), items()).unwrap();
    let result = knn.extract_candidates(ObjectId::new(2), 100).unwrap();
    assert_eq!(ids(&result), vec![12, 11, 10, 14, 13]);
}

#[test]
fn test_ties_break_by_ascending_id() {
    let items = table(&[(7, vec![1.0, 1.0]), (3, vec![1.0, 1.0]), (5, vec![1.0, 1.0]), (1, vec![0.0, 0.0])]);
    let knn = DotProductKnn::new(users(), items).unwrap();

    let result = knn.extract_candidates(ObjectId::new(3), 3).unwrap();
    assert_eq!(ids(&result), vec![3, 5, 7]);
}

#[test]
fn invariant_self_similarity_never_returns_query() {
    let items = items();
    let knn = DotProductKnn::new(items.clone(), items.clone()).unwrap();
    assert!(knn.is_self_similarity());

    for id in items.keys() {
        let result = knn.extract_candidates(*id, 5).unwrap();
        assert!(!ids(&result).contains(&id.get()), "item {id} returned for itself");
    }
}

#[test]
fn test_self_exclusion_happens_after_truncation() {
    let items = items();
    let knn = DotProductKnn::new(items.clone(), items).unwrap();

    // Top 2 for item 13 are [13, 10]; dropping 13 leaves a single candidate
    let result = knn.extract_candidates(ObjectId::new(13), 2).unwrap();
    assert_eq!(ids(&result), vec![10]);
}

#[test]
fn test_equal_tables_enable_self_similarity() {
    let knn = DotProductKnn::new(items(), items()).unwrap();
    assert!(knn.is_self_similarity());
}

#[test]
fn invariant_batch_matches_single_extraction() {
    let users = users();
    let knn = DotProductKnn::new(users.clone(), items()).unwrap();
    let contexts: Vec<ObjectId> = vec![ObjectId::new(3), ObjectId::new(1), ObjectId::new(2)];

    let batched = knn.batch_extract_candidates(&contexts, 3).unwrap();
    assert_eq!(batched.len(), contexts.len());
    for (context, batch_result) in contexts.iter().zip(&batched) {
        let single = knn.extract_candidates(*context, 3).unwrap();
        assert_eq!(ids(batch_result), ids(&single), "batch result differs for {context}");
    }
}

#[test]
fn invariant_batch_matches_single_in_self_similarity_mode() {
    let items = items();
    let knn = DotProductKnn::new(items.clone(), items.clone()).unwrap();
    let contexts: Vec<ObjectId> = items.keys().copied().collect();

    let batched = knn.batch_extract_candidates(&contexts, 3).unwrap();
    for (context, batch_result) in contexts.iter().zip(&batched) {
        let single = knn.extract_candidates(*context, 3).unwrap();
        assert_eq!(ids(batch_result), ids(&single));
    }
}

#[test]
fn test_unknown_context_is_missing_key() {
    let knn = DotProductKnn::new(users(), items()).unwrap();

    match knn.extract_candidates(ObjectId::new(99), 3) {
        Err(RetrievalError::MissingEmbedding(id)) => assert_eq!(id, ObjectId::new(99)),
        other => panic!("expected missing embedding error, got {other:?}"),
    }

    let batch = knn.batch_extract_candidates(&[ObjectId::new(1), ObjectId::new(99)], 3);
    assert!(matches!(batch, Err(RetrievalError::MissingEmbedding(_))));
}

#[test]
fn test_mixed_dimensions_rejected_at_construction() {
    let items = table(&[(10, vec![1.0, 0.0]), (11, vec![1.0, 0.0, 0.0])]);

    match DotProductKnn::new(users(), items) {
        Err(RetrievalError::DimensionMismatch { id, expected, found }) => {
            assert_eq!(id, ObjectId::new(11));
            assert_eq!(expected, 2);
            assert_eq!(found, 3);
        }
        other => panic!("expected dimension mismatch, got {other:?}"),
    }
}
