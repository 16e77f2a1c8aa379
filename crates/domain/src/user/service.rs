//! User service wrapping the command handler.

use async_trait::async_trait;
use common::AggregateId;
use crypto::CryptoShreddingCodec;
use event_store::{EventStore, Snapshot, Version};

use crate::aggregate::Aggregate;
use crate::command::{CommandHandler, CommandResult};
use crate::error::DomainError;
use crate::gateway::{CommandGateway, Dispatch};

use super::{CreateUser, DeleteAndForgetUser, UpdateUserDetails, UpdateUserRoles, User, UserError};

impl From<UserError> for DomainError {
    fn from(e: UserError) -> Self {
        DomainError::User(e)
    }
}

/// Service for managing users.
///
/// Calls made directly on the service skip validation; go through
/// [`CommandGateway`] for the validated path.
pub struct UserService<S: EventStore> {
    handler: CommandHandler<S, User>,
}

impl<S: EventStore> UserService<S> {
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

    pub fn handler(&self) -> &CommandHandler<S, User> {
        &self.handler
    }

    #[tracing::instrument(skip(self, cmd), fields(user_id = %cmd.user_id))]
    pub async fn create_user(&self, cmd: CreateUser) -> Result<CommandResult<User>, DomainError> {
        let CreateUser {
            user_id,
            organization_id,
            requested_by,
            email,
            display_name,
            roles,
        } = cmd;

        self.handler
            .execute_with_snapshot(user_id, |user| {
                user.create(
                    user_id,
                    organization_id,
                    &email,
                    &display_name,
                    roles,
                    requested_by,
                )
            })
            .await
    }

    #[tracing::instrument(skip(self, cmd), fields(user_id = %cmd.user_id))]
    pub async fn update_user_details(
        &self,
        cmd: UpdateUserDetails,
    ) -> Result<CommandResult<User>, DomainError> {
        let UpdateUserDetails {
            user_id,
            requested_by,
            email_change,
            display_name_change,
        } = cmd;

        self.handler
            .execute_with_snapshot(user_id, |user| {
                user.update_details(email_change, display_name_change, requested_by)
            })
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn update_user_roles(
        &self,
        cmd: UpdateUserRoles,
    ) -> Result<CommandResult<User>, DomainError> {
        let UpdateUserRoles {
            user_id,
            requested_by,
            roles,
        } = cmd;

        self.handler
            .execute_with_snapshot(user_id, |user| user.update_roles(roles, requested_by))
            .await
    }

    /// Appends the deletion, then destroys the user's key.
    ///
    /// The key goes only after the event is durable, so a failed append
    /// leaves the user intact and readable. The snapshot is overwritten as
    /// well since snapshots hold decrypted state.
    ///
    /// Sending the command again for a user who is already forgotten appends
    /// nothing and repeats the key destruction and snapshot rewrite, so an
    /// erasure that failed after the append can be completed by retrying.
    #[tracing::instrument(skip(self))]
    pub async fn delete_and_forget_user(
        &self,
        cmd: DeleteAndForgetUser,
    ) -> Result<CommandResult<User>, DomainError> {
        let user_id = cmd.user_id;

        if let Some(user) = self.get_user(user_id).await?
            && user.is_forgotten()
        {
            tracing::info!(%user_id, "user already forgotten, completing erasure");
            let new_version = user.version();
            self.erase(user_id, new_version, &user).await?;
            return Ok(CommandResult {
                aggregate: user,
                events: vec![],
                new_version,
            });
        }

        let result = self
            .handler
            .execute_with_snapshot(user_id, |user| {
                user.delete_and_forget(&cmd.request_reason, cmd.requested_by)
            })
            .await?;
        self.erase(user_id, result.new_version, &result.aggregate)
            .await?;
        tracing::info!(%user_id, "user forgotten");

        Ok(result)
    }

    /// Destroys the key and replaces the snapshot with the forgotten state.
    /// Both steps are idempotent.
    async fn erase(
        &self,
        user_id: AggregateId,
        version: Version,
        user: &User,
    ) -> Result<(), DomainError> {
        self.handler.codec().destroy_key(user_id).await?;
        let snapshot = Snapshot::capture(user_id, User::aggregate_type(), version, user)?;
        self.handler.store().save_snapshot(snapshot).await?;
        Ok(())
    }

    /// Gets a user by ID, or None if it was never created.
    pub async fn get_user(&self, user_id: AggregateId) -> Result<Option<User>, DomainError> {
        self.handler.load_existing(user_id).await
    }
}

#[async_trait]
impl<S: EventStore + Clone + 'static> Dispatch<S> for CreateUser {
    type Aggregate = User;

    async fn dispatch(self, gateway: &CommandGateway<S>) -> Result<CommandResult<User>, DomainError> {
        gateway.users().create_user(self).await
    }
}

#[async_trait]
impl<S: EventStore + Clone + 'static> Dispatch<S> for UpdateUserDetails {
    type Aggregate = User;

    async fn dispatch(self, gateway: &CommandGateway<S>) -> Result<CommandResult<User>, DomainError> {
        gateway.users().update_user_details(self).await
    }
}

#[async_trait]
impl<S: EventStore + Clone + 'static> Dispatch<S> for UpdateUserRoles {
    type Aggregate = User;

    async fn dispatch(self, gateway: &CommandGateway<S>) -> Result<CommandResult<User>, DomainError> {
        gateway.users().update_user_roles(self).await
    }
}

#[async_trait]
impl<S: EventStore + Clone + 'static> Dispatch<S> for DeleteAndForgetUser {
    type Aggregate = User;

    async fn dispatch(self, gateway: &CommandGateway<S>) -> Result<CommandResult<User>, DomainError> {
        gateway.users().delete_and_forget_user(self).await
    }
}
