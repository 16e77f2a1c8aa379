//! Competition domain events.

use chrono::{DateTime, Utc};
use common::AggregateId;
use crypto::FieldEncryption;
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;

use super::PhotoId;

/// Events that can occur on a competition aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum CompetitionEvent {
    CompetitionCreated(CompetitionCreatedData),
    PhotoEnteredIntoCompetition(PhotoEnteredIntoCompetitionData),
    CompetitionEnded(CompetitionEndedData),
}

impl DomainEvent for CompetitionEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CompetitionEvent::CompetitionCreated(_) => "CompetitionCreated",
            CompetitionEvent::PhotoEnteredIntoCompetition(_) => "PhotoEnteredIntoCompetition",
            CompetitionEvent::CompetitionEnded(_) => "CompetitionEnded",
        }
    }

    /// Submission notes belong to the submitter, not the competition.
    fn encryption(&self) -> Option<FieldEncryption> {
        match self {
            CompetitionEvent::PhotoEnteredIntoCompetition(_) => Some(FieldEncryption::new(
                "submitted_by",
                ["submission_notes"],
            )),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompetitionCreatedData {
    pub competition_id: AggregateId,
    pub description: String,
    pub created_by: AggregateId,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhotoEnteredIntoCompetitionData {
    pub competition_id: AggregateId,
    pub photo_id: PhotoId,
    pub submitted_by: AggregateId,
    /// `None` once the submitter has been forgotten.
    pub submission_notes: Option<String>,
    pub entered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompetitionEndedData {
    pub competition_id: AggregateId,
    pub ended_by: AggregateId,
    pub ended_at: DateTime<Utc>,
}
