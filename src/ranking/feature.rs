use serde::{Deserialize, Serialize};

use crate::ranking::select::{select_top_n, Order};
use crate::ranking::RankingError;
use crate::types::{Candidate, ObjectId};

/// Orders candidates by one feature they already carry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureRanker {
    pub feature: String,
    #[serde(default)]
    pub order: Order,
}

impl FeatureRanker {
    pub fn new(feature: impl Into<String>, order: Order) -> Self {
        Self {
            feature: feature.into(),
            order,
        }
    }

    pub fn descending(feature: impl Into<String>) -> Self {
        Self::new(feature, Order::Descending)
    }

    pub fn ascending(feature: impl Into<String>) -> Self {
        Self::new(feature, Order::Ascending)
    }

    pub fn rank(
        &self,
        _context: ObjectId,
        candidates: Vec<Candidate>,
        n: usize,
    ) -> Result<Vec<Candidate>, RankingError> {
        select_top_n(candidates, &self.feature, n, self.order)
    }
}
