//! Competition entries read model.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::AggregateId;
use domain::{Aggregate, Competition, CompetitionEvent, CompetitionState, PhotoId, User, UserEvent};
use event_store::EventEnvelope;
use tokio::sync::RwLock;

use crate::Result;
use crate::projection::{Projection, ProjectionPosition};

/// One photo entered into a competition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompetitionEntryRecord {
    pub photo_id: PhotoId,
    pub submitted_by: AggregateId,
    /// `None` once the submitter has been forgotten.
    pub submission_notes: Option<String>,
    pub entered_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CompetitionRecord {
    pub competition_id: AggregateId,
    pub description: String,
    pub state: CompetitionState,
    pub entries: Vec<CompetitionEntryRecord>,
    pub created_at: DateTime<Utc>,
}

#[derive(Default)]
struct CompetitionEntriesState {
    competitions: HashMap<AggregateId, CompetitionRecord>,
    position: ProjectionPosition,
}

/// Read model view of competitions and their entries.
///
/// Also follows user deletions: notes held in memory for a forgotten
/// submitter are dropped, matching what a replay would produce.
#[derive(Clone, Default)]
pub struct CompetitionEntriesView {
    state: Arc<RwLock<CompetitionEntriesState>>,
}

impl CompetitionEntriesView {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, competition_id: AggregateId) -> Option<CompetitionRecord> {
        self.state
            .read()
            .await
            .competitions
            .get(&competition_id)
            .cloned()
    }

    pub async fn entries(&self, competition_id: AggregateId) -> Vec<CompetitionEntryRecord> {
        self.get(competition_id)
            .await
            .map(|c| c.entries)
            .unwrap_or_default()
    }

    /// All entries by one submitter across competitions.
    pub async fn entries_by(&self, submitter: AggregateId) -> Vec<CompetitionEntryRecord> {
        self.state
            .read()
            .await
            .competitions
            .values()
            .flat_map(|c| c.entries.iter())
            .filter(|e| e.submitted_by == submitter)
            .cloned()
            .collect()
    }

    pub async fn open_competitions(&self) -> Vec<CompetitionRecord> {
        self.state
            .read()
            .await
            .competitions
            .values()
            .filter(|c| c.state == CompetitionState::Open)
            .cloned()
            .collect()
    }
}

fn apply_competition_event(
    state: &mut CompetitionEntriesState,
    competition_id: AggregateId,
    event: CompetitionEvent,
) {
    match event {
        CompetitionEvent::CompetitionCreated(data) => {
            state.competitions.insert(
                competition_id,
                CompetitionRecord {
                    competition_id,
                    description: data.description,
                    state: CompetitionState::Open,
                    entries: Vec::new(),
                    created_at: data.created_at,
                },
            );
        }
        CompetitionEvent::PhotoEnteredIntoCompetition(data) => {
            if let Some(competition) = state.competitions.get_mut(&competition_id) {
                competition.entries.push(CompetitionEntryRecord {
                    photo_id: data.photo_id,
                    submitted_by: data.submitted_by,
                    submission_notes: data.submission_notes,
                    entered_at: data.entered_at,
                });
            }
        }
        CompetitionEvent::CompetitionEnded(_) => {
            if let Some(competition) = state.competitions.get_mut(&competition_id) {
                competition.state = CompetitionState::Ended;
            }
        }
    }
}

#[async_trait]
impl Projection for CompetitionEntriesView {
    fn name(&self) -> &'static str {
        "CompetitionEntriesView"
    }

    async fn handle(&self, event: &EventEnvelope) -> Result<()> {
        let mut state = self.state.write().await;
        if let Some(position) = event.position {
            state.position = state.position.advance_to(position);
        }

        if event.aggregate_type == Competition::aggregate_type() {
            let competition_event: CompetitionEvent =
                serde_json::from_value(event.payload.clone())?;
            apply_competition_event(&mut state, event.aggregate_id, competition_event);
        } else if event.aggregate_type == User::aggregate_type() {
            let user_event: UserEvent = serde_json::from_value(event.payload.clone())?;
            if let UserEvent::UserDeletedAndForgotten(data) = user_event {
                for entry in state
                    .competitions
                    .values_mut()
                    .flat_map(|c| c.entries.iter_mut())
                    .filter(|e| e.submitted_by == data.user_id)
                {
                    entry.submission_notes = None;
                }
            }
        }

        Ok(())
    }

    async fn position(&self) -> ProjectionPosition {
        self.state.read().await.position
    }

    async fn reset(&self) -> Result<()> {
        *self.state.write().await = CompetitionEntriesState::default();
        Ok(())
    }
}
