use std::collections::{BTreeSet, HashMap};

use crate::metrics::MetricError;
use crate::types::{Action, ObjectId};

/// Per-item novelty: `1 - distinct users / all users` in a training log.
#[derive(Debug, Clone, Default)]
pub struct NoveltyTable {
    novelty: HashMap<ObjectId, f64>,
}

impl NoveltyTable {
    pub fn from_actions(actions: &[Action]) -> Self {
        let users: BTreeSet<ObjectId> = actions.iter().map(|a| a.user_id).collect();
        let mut audience: HashMap<ObjectId, BTreeSet<ObjectId>> = HashMap::new();
        for action in actions {
            audience.entry(action.item_id).or_default().insert(action.user_id);
        }

        let num_users = users.len() as f64;
        let novelty = audience
            .into_iter()
            .map(|(item, item_users)| (item, 1.0 - item_users.len() as f64 / num_users))
            .collect();
        Self { novelty }
    }

    /// Items never seen in training are fully novel.
    pub fn get(&self, item: ObjectId) -> f64 {
        self.novelty.get(&item).copied().unwrap_or(1.0)
    }

    /// Mean novelty of `predicted`; 0 for an empty list.
    pub fn novelty(&self, predicted: &[ObjectId]) -> f64 {
        if predicted.is_empty() {
            return 0.0;
        }
        predicted.iter().map(|id| self.get(*id)).sum::<f64>() / predicted.len() as f64
    }
}

/// Items each user interacted with in a training log.
#[derive(Debug, Clone, Default)]
pub struct UserHistory {
    history: HashMap<ObjectId, BTreeSet<ObjectId>>,
}

impl UserHistory {
    pub fn from_actions(actions: &[Action]) -> Self {
        let mut history: HashMap<ObjectId, BTreeSet<ObjectId>> = HashMap::new();
        for action in actions {
            history.entry(action.user_id).or_default().insert(action.item_id);
        }
        Self { history }
    }

    pub fn get(&self, user: ObjectId) -> Option<&BTreeSet<ObjectId>> {
        self.history.get(&user)
    }

    /// Share of the relevant predictions the user had not seen before.
    ///
    /// 0 when nothing relevant was predicted.
    pub fn serendipity(
        &self,
        user: ObjectId,
        predicted: &[ObjectId],
        positives: &BTreeSet<ObjectId>,
    ) -> Result<f64, MetricError> {
        if predicted.is_empty() {
            return Ok(0.0);
        }
        let seen = self.get(user).ok_or(MetricError::UnknownUser(user))?;

        let mut numer = 0usize;
        let mut denom = 0usize;
        for id in predicted.iter().filter(|id| positives.contains(*id)) {
            denom += 1;
            if !seen.contains(id) {
                numer += 1;
            }
        }
        if denom == 0 {
            Ok(0.0)
        } else {
            Ok(numer as f64 / denom as f64)
        }
    }
}

/// Category of every item.
#[derive(Debug, Clone, Default)]
pub struct ItemCategories {
    categories: HashMap<ObjectId, String>,
}

impl ItemCategories {
    /// Actions without a category are skipped; the last category seen for an
    /// item wins.
    pub fn from_actions(actions: &[Action]) -> Self {
        Self::from_pairs(
            actions
                .iter()
                .filter_map(|a| a.category.as_ref().map(|c| (a.item_id, c.clone()))),
        )
    }

    pub fn from_pairs<C: Into<String>>(pairs: impl IntoIterator<Item = (ObjectId, C)>) -> Self {
        Self {
            categories: pairs.into_iter().map(|(id, c)| (id, c.into())).collect(),
        }
    }

    pub fn get(&self, item: ObjectId) -> Option<&str> {
        self.categories.get(&item).map(String::as_str)
    }

    /// Distinct categories per prediction; 0 for an empty list.
    pub fn diversity(&self, predicted: &[ObjectId]) -> Result<f64, MetricError> {
        if predicted.is_empty() {
            return Ok(0.0);
        }
        let mut unique = BTreeSet::new();
        for id in predicted {
            let category = self.get(*id).ok_or(MetricError::MissingCategory(*id))?;
            unique.insert(category);
        }
        Ok(unique.len() as f64 / predicted.len() as f64)
    }
}
