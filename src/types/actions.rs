use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::identifiers::ObjectId;

/// One row of a historical interaction log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub request_id: u64,
    pub user_id: ObjectId,
    pub item_id: ObjectId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl Action {
    pub fn new(request_id: u64, user_id: impl Into<ObjectId>, item_id: impl Into<ObjectId>) -> Self {
        Self {
            request_id,
            user_id: user_id.into(),
            item_id: item_id.into(),
            timestamp: None,
            category: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}
