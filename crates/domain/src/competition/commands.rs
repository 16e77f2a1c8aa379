//! Competition commands.

use common::AggregateId;

use crate::command::Command;
use crate::validation::ValidatableCommand;

use super::{Competition, PhotoId};

#[derive(Debug, Clone)]
pub struct CreateCompetition {
    pub competition_id: AggregateId,
    pub requested_by: AggregateId,
    pub description: String,
}

impl CreateCompetition {
    /// Creates the command with a generated competition ID.
    pub fn new(requested_by: AggregateId, description: impl Into<String>) -> Self {
        Self {
            competition_id: AggregateId::new(),
            requested_by,
            description: description.into(),
        }
    }
}

impl Command for CreateCompetition {
    type Aggregate = Competition;

    fn aggregate_id(&self) -> AggregateId {
        self.competition_id
    }
}

impl ValidatableCommand for CreateCompetition {
    fn command_name(&self) -> &'static str {
        "CreateCompetition"
    }
}

#[derive(Debug, Clone)]
pub struct EnterPhoto {
    pub competition_id: AggregateId,
    pub photo_id: PhotoId,
    pub submitted_by: AggregateId,
    pub submission_notes: Option<String>,
}

impl EnterPhoto {
    pub fn new(
        competition_id: AggregateId,
        photo_id: PhotoId,
        submitted_by: AggregateId,
        submission_notes: Option<String>,
    ) -> Self {
        Self {
            competition_id,
            photo_id,
            submitted_by,
            submission_notes,
        }
    }
}

impl Command for EnterPhoto {
    type Aggregate = Competition;

    fn aggregate_id(&self) -> AggregateId {
        self.competition_id
    }
}

impl ValidatableCommand for EnterPhoto {
    fn command_name(&self) -> &'static str {
        "EnterPhoto"
    }
}

#[derive(Debug, Clone)]
pub struct EndCompetition {
    pub competition_id: AggregateId,
    pub requested_by: AggregateId,
}

impl EndCompetition {
    pub fn new(competition_id: AggregateId, requested_by: AggregateId) -> Self {
        Self {
            competition_id,
            requested_by,
        }
    }
}

impl Command for EndCompetition {
    type Aggregate = Competition;

    fn aggregate_id(&self) -> AggregateId {
        self.competition_id
    }
}

impl ValidatableCommand for EndCompetition {
    fn command_name(&self) -> &'static str {
        "EndCompetition"
    }
}
