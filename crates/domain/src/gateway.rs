//! Command gateway: the validated entry point for every command.

use async_trait::async_trait;
use crypto::CryptoShreddingCodec;
use event_store::EventStore;

use crate::aggregate::Aggregate;
use crate::command::CommandResult;
use crate::competition::CompetitionService;
use crate::error::DomainError;
use crate::organization::OrganizationService;
use crate::user::UserService;
use crate::validation::{CommandValidator, ValidatableCommand};

/// Routes a command to the service owning its aggregate.
#[async_trait]
pub trait Dispatch<S>: ValidatableCommand + Sized + 'static
where
    S: EventStore + Clone + 'static,
{
    type Aggregate: Aggregate;

    async fn dispatch(
        self,
        gateway: &CommandGateway<S>,
    ) -> Result<CommandResult<Self::Aggregate>, DomainError>;
}

/// Validates commands and dispatches them to their aggregates.
///
/// `send` returns once the resulting events are appended. Projections and
/// sagas observe them later.
pub struct CommandGateway<S: EventStore> {
    validator: CommandValidator,
    organizations: OrganizationService<S>,
    users: UserService<S>,
    competitions: CompetitionService<S>,
}

impl<S> CommandGateway<S>
where
    S: EventStore + Clone + 'static,
{
    pub fn new(store: S, codec: CryptoShreddingCodec, validator: CommandValidator) -> Self {
        Self {
            validator,
            organizations: OrganizationService::new(store.clone(), codec.clone()),
            users: UserService::new(store.clone(), codec.clone()),
            competitions: CompetitionService::new(store, codec),
        }
    }

    /// Overrides the snapshot interval of every aggregate.
    pub fn with_snapshot_interval(self, interval: usize) -> Self {
        Self {
            validator: self.validator,
            organizations: self.organizations.with_snapshot_interval(interval),
            users: self.users.with_snapshot_interval(interval),
            competitions: self.competitions.with_snapshot_interval(interval),
        }
    }

    /// Validates the command, then executes it.
    ///
    /// A validation failure is returned as [`DomainError::Validation`] and
    /// nothing is appended.
    #[tracing::instrument(skip_all, fields(command = command.command_name()))]
    pub async fn send<C>(&self, command: C) -> Result<CommandResult<C::Aggregate>, DomainError>
    where
        C: Dispatch<S>,
    {
        self.validator.validate(&command).await?;
        command.dispatch(self).await
    }

    pub fn validator(&self) -> &CommandValidator {
        &self.validator
    }

    pub fn organizations(&self) -> &OrganizationService<S> {
        &self.organizations
    }

    pub fn users(&self) -> &UserService<S> {
        &self.users
    }

    pub fn competitions(&self) -> &CompetitionService<S> {
        &self.competitions
    }
}
