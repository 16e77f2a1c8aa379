//! Competition service wrapping the command handler.

use async_trait::async_trait;
use common::AggregateId;
use crypto::CryptoShreddingCodec;
use event_store::EventStore;

use crate::command::{CommandHandler, CommandResult};
use crate::error::DomainError;
use crate::gateway::{CommandGateway, Dispatch};

use super::{Competition, CompetitionError, CreateCompetition, EndCompetition, EnterPhoto};

impl From<CompetitionError> for DomainError {
    fn from(e: CompetitionError) -> Self {
        DomainError::Competition(e)
    }
}

/// Service for managing competitions.
pub struct CompetitionService<S: EventStore> {
    handler: CommandHandler<S, Competition>,
}

impl<S: EventStore> CompetitionService<S> {
    pub fn new(store: S, codec: CryptoShreddingCodec) -> Self {
        Self {
            handler: CommandHandler::new(store, codec),
        }
    }

    pub fn with_snapshot_interval(self, interval: usize) -> Self {
        Self {
            handler: self.handler.with_snapshot_interval(interval),
        }
    }

    pub fn handler(&self) -> &CommandHandler<S, Competition> {
        &self.handler
    }

    #[tracing::instrument(skip(self))]
    pub async fn create_competition(
        &self,
        cmd: CreateCompetition,
    ) -> Result<CommandResult<Competition>, DomainError> {
        let competition_id = cmd.competition_id;

        self.handler
            .execute_with_snapshot(competition_id, |competition| {
                competition.create(competition_id, &cmd.description, cmd.requested_by)
            })
            .await
    }

    /// Enters a photo. The submission notes are encrypted under the
    /// submitter's key on append.
    #[tracing::instrument(
        skip(self, cmd),
        fields(competition_id = %cmd.competition_id, photo_id = %cmd.photo_id)
    )]
    pub async fn enter_photo(
        &self,
        cmd: EnterPhoto,
    ) -> Result<CommandResult<Competition>, DomainError> {
        let EnterPhoto {
            competition_id,
            photo_id,
            submitted_by,
            submission_notes,
        } = cmd;

        self.handler
            .execute_with_snapshot(competition_id, |competition| {
                competition.enter_photo(photo_id, submitted_by, submission_notes)
            })
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn end_competition(
        &self,
        cmd: EndCompetition,
    ) -> Result<CommandResult<Competition>, DomainError> {
        self.handler
            .execute_with_snapshot(cmd.competition_id, |competition| {
                competition.end(cmd.requested_by)
            })
            .await
    }

    pub async fn get_competition(
        &self,
        competition_id: AggregateId,
    ) -> Result<Option<Competition>, DomainError> {
        self.handler.load_existing(competition_id).await
    }
}

#[async_trait]
impl<S: EventStore + Clone + 'static> Dispatch<S> for CreateCompetition {
    type Aggregate = Competition;

    async fn dispatch(
        self,
        gateway: &CommandGateway<S>,
    ) -> Result<CommandResult<Competition>, DomainError> {
        gateway.competitions().create_competition(self).await
    }
}

#[async_trait]
impl<S: EventStore + Clone + 'static> Dispatch<S> for EnterPhoto {
    type Aggregate = Competition;

    async fn dispatch(
        self,
        gateway: &CommandGateway<S>,
    ) -> Result<CommandResult<Competition>, DomainError> {
        gateway.competitions().enter_photo(self).await
    }
}

#[async_trait]
impl<S: EventStore + Clone + 'static> Dispatch<S> for EndCompetition {
    type Aggregate = Competition;

    async fn dispatch(
        self,
        gateway: &CommandGateway<S>,
    ) -> Result<CommandResult<Competition>, DomainError> {
        gateway.competitions().end_competition(self).await
    }
}
