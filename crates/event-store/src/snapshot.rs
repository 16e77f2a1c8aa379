use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AggregateId, Version};

/// Aggregate state captured at a version, stored next to the log.
///
/// Unlike the events, a snapshot holds the *decrypted* state, so it must be
/// overwritten whenever a subject is forgotten. There is one snapshot per
/// aggregate; saving replaces the previous one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub aggregate_id: AggregateId,
    pub aggregate_type: String,
    /// Last event version folded into `state`.
    pub version: Version,
    pub taken_at: DateTime<Utc>,
    pub state: serde_json::Value,
}

impl Snapshot {
    /// Serializes `state` as the aggregate's state at `version`.
    pub fn capture<T: Serialize>(
        aggregate_id: AggregateId,
        aggregate_type: impl Into<String>,
        version: Version,
        state: &T,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            aggregate_id,
            aggregate_type: aggregate_type.into(),
            version,
            taken_at: Utc::now(),
            state: serde_json::to_value(state)?,
        })
    }

    /// Rebuilds the aggregate the snapshot was captured from.
    pub fn restore<T: for<'de> Deserialize<'de>>(self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.state)
    }
}
