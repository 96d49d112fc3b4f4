use std::collections::BTreeSet;

use crate::types::ObjectId;

/// External ranking-consistency evaluator used by AUC.
pub trait RankConsistency: Send + Sync {
    /// `labels[i]` is the relevance of item `i`, `ranks[i]` its predicted
    /// rank score (higher means ranked earlier).
    fn score(&self, labels: &[f64], ranks: &[f64]) -> f64;
}

/// Ranking AUC: the share of (relevant, irrelevant) pairs in which the
/// relevant item is ranked earlier. Ties count one half.
///
/// Without at least one such pair the ordering carries no information and the
/// score is 0.5.
#[derive(Debug, Clone, Copy, Default)]
pub struct PairwiseAuc;

impl RankConsistency for PairwiseAuc {
    fn score(&self, labels: &[f64], ranks: &[f64]) -> f64 {
        let mut pairs = 0usize;
        let mut concordant = 0.0;
        for (i, (&label_i, &rank_i)) in labels.iter().zip(ranks).enumerate() {
            for (&label_j, &rank_j) in labels[i + 1..].iter().zip(&ranks[i + 1..]) {
                if label_i == label_j {
                    continue;
                }
                let (relevant, irrelevant) = if label_i > label_j {
                    (rank_i, rank_j)
                } else {
                    (rank_j, rank_i)
                };
                pairs += 1;
                if relevant > irrelevant {
                    concordant += 1.0;
                } else if relevant == irrelevant {
                    concordant += 0.5;
                }
            }
        }
        if pairs == 0 {
            0.5
        } else {
            concordant / pairs as f64
        }
    }
}

fn hits(predicted: &[ObjectId], positives: &BTreeSet<ObjectId>) -> usize {
    let unique: BTreeSet<ObjectId> = predicted.iter().copied().collect();
    unique.intersection(positives).count()
}

/// `|P ∩ A| / |P|`, `None` when nothing was predicted.
pub fn precision(predicted: &[ObjectId], positives: &BTreeSet<ObjectId>) -> Option<f64> {
    if predicted.is_empty() {
        return None;
    }
    Some(hits(predicted, positives) as f64 / predicted.len() as f64)
}

/// `|P ∩ A| / |A|`, `None` when there are no positives.
pub fn recall(predicted: &[ObjectId], positives: &BTreeSet<ObjectId>) -> Option<f64> {
    if positives.is_empty() {
        return None;
    }
    Some(hits(predicted, positives) as f64 / positives.len() as f64)
}

/// Average precision at `k`.
///
/// Only the first occurrence of a repeated prediction counts as a hit. An
/// empty positive set scores 1.
pub fn average_precision(predicted: &[ObjectId], positives: &BTreeSet<ObjectId>, k: usize) -> f64 {
    if positives.is_empty() {
        return 1.0;
    }
    let denom = positives.len().min(k);
    if denom == 0 {
        return 0.0;
    }

    let mut seen = BTreeSet::new();
    let mut num_hits = 0usize;
    let mut score = 0.0;
    for (i, id) in predicted.iter().enumerate() {
        if positives.contains(id) && seen.insert(*id) {
            num_hits += 1;
            score += num_hits as f64 / (i + 1) as f64;
        }
    }
    score / denom as f64
}

/// Binary relevance of each prediction.
pub fn relevance(predicted: &[ObjectId], positives: &BTreeSet<ObjectId>) -> Vec<f64> {
    predicted
        .iter()
        .map(|id| if positives.contains(id) { 1.0 } else { 0.0 })
        .collect()
}

/// `Σ rel_i / ln(i + 2)` over 0-indexed positions.
pub fn dcg(relevance: &[f64]) -> f64 {
    relevance
        .iter()
        .enumerate()
        .map(|(i, rel)| rel / ((i + 2) as f64).ln())
        .sum()
}

/// DCG normalised by the DCG of the ideal ordering; 0 when that is 0.
pub fn ndcg(relevance: &[f64]) -> f64 {
    let mut ideal = relevance.to_vec();
    ideal.sort_by(|a, b| b.total_cmp(a));
    let ideal_dcg = dcg(&ideal);
    if ideal_dcg == 0.0 {
        0.0
    } else {
        dcg(relevance) / ideal_dcg
    }
}

/// AUC of the predicted order: the first prediction gets the highest rank score.
pub fn auc(evaluator: &dyn RankConsistency, predicted: &[ObjectId], positives: &BTreeSet<ObjectId>) -> f64 {
    let labels = relevance(predicted, positives);
    let ranks: Vec<f64> = (1..=predicted.len()).rev().map(|rank| rank as f64).collect();
    evaluator.score(&labels, &ranks)
}
