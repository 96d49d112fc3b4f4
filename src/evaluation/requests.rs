use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::evaluation::EvaluationError;
use crate::types::{Action, ObjectId};

/// One held-out request: a user and the items they interacted with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub request_id: u64,
    pub user_id: ObjectId,
    pub positives: BTreeSet<ObjectId>,
}

/// Group actions by `(request_id, user_id)`.
///
/// Requests come out in ascending `(request_id, user_id)` order, regardless of
/// the order of the log.
pub fn group_requests(actions: &[Action]) -> Vec<Request> {
    let mut grouped: BTreeMap<(u64, ObjectId), BTreeSet<ObjectId>> = BTreeMap::new();
    for action in actions {
        grouped
            .entry((action.request_id, action.user_id))
            .or_default()
            .insert(action.item_id);
    }
    grouped
        .into_iter()
        .map(|((request_id, user_id), positives)| Request {
            request_id,
            user_id,
            positives,
        })
        .collect()
}

/// Read an action log stored as JSON lines. Blank lines are skipped.
pub fn read_actions(path: &Path) -> Result<Vec<Action>, EvaluationError> {
    let reader = BufReader::new(File::open(path)?);
    let mut actions = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let action = serde_json::from_str(&line).map_err(|source| EvaluationError::Parse {
            line: index + 1,
            source,
        })?;
        actions.push(action);
    }
    Ok(actions)
}
