use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use serde::{Deserialize, Serialize};

use crate::ranking::RankingError;
use crate::types::{Candidate, FeatureKind, ObjectId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Order {
    #[default]
    Descending,
    Ascending,
}

/// Read `feature` from `candidate` as a number.
pub(crate) fn numeric_feature(candidate: &Candidate, feature: &str) -> Result<f64, RankingError> {
    let value = candidate
        .feature(feature)
        .ok_or_else(|| RankingError::MissingFeature {
            candidate: candidate.id(),
            feature: feature.to_string(),
        })?;
    value.as_number().ok_or_else(|| RankingError::WrongKind {
        candidate: candidate.id(),
        feature: feature.to_string(),
        expected: FeatureKind::Number,
        found: value.kind(),
    })
}

// Greater means ranked earlier.
#[derive(Debug)]
struct Ranked {
    key: f64,
    id: ObjectId,
    slot: usize,
    order: Order,
}

impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> Ordering {
        let by_key = match self.order {
            Order::Descending => self.key.total_cmp(&other.key),
            Order::Ascending => other.key.total_cmp(&self.key),
        };
        // Ascending id wins ties
        by_key.then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Ranked {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Ranked {}

/// The `n` best candidates by a numeric feature every candidate must carry.
///
/// Keeps a heap of at most `n` entries, so the cost is O(count · log n).
/// Ties are broken by ascending candidate id.
pub fn select_top_n(
    candidates: Vec<Candidate>,
    feature: &str,
    n: usize,
    order: Order,
) -> Result<Vec<Candidate>, RankingError> {
    let mut heap = BinaryHeap::with_capacity(n.min(candidates.len()) + 1);
    for (slot, candidate) in candidates.iter().enumerate() {
        let key = numeric_feature(candidate, feature)?;
        if n == 0 {
            continue;
        }
        heap.push(Reverse(Ranked {
            key,
            id: candidate.id(),
            slot,
            order,
        }));
        if heap.len() > n {
            heap.pop();
        }
    }

    let mut slots: Vec<Option<Candidate>> = candidates.into_iter().map(Some).collect();
    // Ascending Reverse order is best-first
    Ok(heap
        .into_sorted_vec()
        .into_iter()
        .filter_map(|Reverse(ranked)| slots[ranked.slot].take())
        .collect())
}
