//! Competition aggregate implementation.

use std::collections::BTreeSet;

use chrono::Utc;
use common::AggregateId;
use event_store::Version;
use serde::{Deserialize, Serialize};

use crate::aggregate::{Aggregate, SnapshotCapable};

use super::{
    CompetitionError, CompetitionEvent, CompetitionState, PhotoId,
    events::{CompetitionCreatedData, CompetitionEndedData, PhotoEnteredIntoCompetitionData},
};

/// Competition aggregate root.
///
/// Only photo ids are kept; submission notes are read-side data.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Competition {
    id: Option<AggregateId>,

    #[serde(default)]
    version: Version,

    description: String,
    state: CompetitionState,
    entered_photos: BTreeSet<PhotoId>,
}

impl Aggregate for Competition {
    type Event = CompetitionEvent;
    type Error = CompetitionError;

    fn aggregate_type() -> &'static str {
        "Competition"
    }

    fn id(&self) -> Option<AggregateId> {
        self.id
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn apply(&mut self, event: Self::Event) {
        match event {
            CompetitionEvent::CompetitionCreated(data) => {
                self.id = Some(data.competition_id);
                self.description = data.description;
                self.state = CompetitionState::Open;
            }
            CompetitionEvent::PhotoEnteredIntoCompetition(data) => {
                self.entered_photos.insert(data.photo_id);
            }
            CompetitionEvent::CompetitionEnded(_) => {
                self.state = CompetitionState::Ended;
            }
        }
    }
}

impl SnapshotCapable for Competition {
    fn snapshot_interval() -> usize {
        50
    }
}

// Query methods
impl Competition {
    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn state(&self) -> CompetitionState {
        self.state
    }

    pub fn entry_count(&self) -> usize {
        self.entered_photos.len()
    }

    pub fn has_entry(&self, photo_id: PhotoId) -> bool {
        self.entered_photos.contains(&photo_id)
    }
}

// Command methods (return events)
impl Competition {
    pub fn create(
        &self,
        competition_id: AggregateId,
        description: &str,
        requested_by: AggregateId,
    ) -> Result<Vec<CompetitionEvent>, CompetitionError> {
        if self.id.is_some() {
            return Err(CompetitionError::AlreadyCreated);
        }
        let description = description.trim();
        if description.is_empty() {
            return Err(CompetitionError::DescriptionRequired);
        }

        Ok(vec![CompetitionEvent::CompetitionCreated(
            CompetitionCreatedData {
                competition_id,
                description: description.to_string(),
                created_by: requested_by,
                created_at: Utc::now(),
            },
        )])
    }

    /// A photo may be entered once, and only while the competition is open.
    pub fn enter_photo(
        &self,
        photo_id: PhotoId,
        submitted_by: AggregateId,
        submission_notes: Option<String>,
    ) -> Result<Vec<CompetitionEvent>, CompetitionError> {
        let competition_id = self.ensure_open("enter photo")?;
        if self.entered_photos.contains(&photo_id) {
            return Err(CompetitionError::PhotoAlreadyEntered { photo_id });
        }

        Ok(vec![CompetitionEvent::PhotoEnteredIntoCompetition(
            PhotoEnteredIntoCompetitionData {
                competition_id,
                photo_id,
                submitted_by,
                submission_notes,
                entered_at: Utc::now(),
            },
        )])
    }

    pub fn end(&self, requested_by: AggregateId) -> Result<Vec<CompetitionEvent>, CompetitionError> {
        let competition_id = self.ensure_open("end")?;

        Ok(vec![CompetitionEvent::CompetitionEnded(CompetitionEndedData {
            competition_id,
            ended_by: requested_by,
            ended_at: Utc::now(),
        })])
    }

    fn ensure_open(&self, action: &'static str) -> Result<AggregateId, CompetitionError> {
        let Some(competition_id) = self.id else {
            return Err(CompetitionError::NotFound);
        };
        if !self.state.accepts_entries() {
            return Err(CompetitionError::InvalidStateTransition {
                current_state: self.state,
                action,
            });
        }
        Ok(competition_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn created() -> Competition {
        let mut competition = Competition::default();
        let events = competition
            .create(AggregateId::new(), "Harbour at night", AggregateId::new())
            .unwrap();
        competition.apply_events(events);
        competition
    }

    #[test]
    fn test_create_competition() {
        let competition = created();
        assert!(competition.id().is_some());
        assert_eq!(competition.description(), "Harbour at night");
        assert_eq!(competition.state(), CompetitionState::Open);
    }

    #[test]
    fn test_photo_entered_once() {
        let mut competition = created();
        let photo = PhotoId::new();
        let events = competition
            .enter_photo(photo, AggregateId::new(), Some("notes".to_string()))
            .unwrap();
        competition.apply_events(events);
        assert!(competition.has_entry(photo));

        let result = competition.enter_photo(photo, AggregateId::new(), None);
        assert!(matches!(
            result,
            Err(CompetitionError::PhotoAlreadyEntered { photo_id }) if photo_id == photo
        ));
    }

    #[test]
    fn test_ended_competition_rejects_entries() {
        let mut competition = created();
        competition.apply_events(competition.end(AggregateId::new()).unwrap());

        assert_eq!(competition.state(), CompetitionState::Ended);
        assert!(matches!(
            competition.enter_photo(PhotoId::new(), AggregateId::new(), None),
            Err(CompetitionError::InvalidStateTransition { .. })
        ));
        assert!(matches!(
            competition.end(AggregateId::new()),
            Err(CompetitionError::InvalidStateTransition { .. })
        ));
    }

    #[test]
    fn test_missing_competition() {
        let competition = Competition::default();
        assert!(matches!(
            competition.enter_photo(PhotoId::new(), AggregateId::new(), None),
            Err(CompetitionError::NotFound)
        ));
    }
}
