//! Organization service wrapping the command handler.

use async_trait::async_trait;
use crypto::CryptoShreddingCodec;
use event_store::EventStore;

use crate::command::{CommandHandler, CommandResult};
use crate::error::DomainError;
use crate::gateway::{CommandGateway, Dispatch};

use super::{
    CreateOrganization, DeregisterOrganization, Organization, OrganizationError,
    ReregisterOrganization, UpdateOrganization,
};

impl From<OrganizationError> for DomainError {
    fn from(e: OrganizationError) -> Self {
        DomainError::Organization(e)
    }
}

/// Service for managing organizations.
///
/// Calls made directly on the service skip validation; go through
/// [`CommandGateway`] for the validated path.
pub struct OrganizationService<S: EventStore> {
    handler: CommandHandler<S, Organization>,
}

impl<S: EventStore> OrganizationService<S> {
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

    pub fn handler(&self) -> &CommandHandler<S, Organization> {
        &self.handler
    }

    #[tracing::instrument(skip(self))]
    pub async fn create_organization(
        &self,
        cmd: CreateOrganization,
    ) -> Result<CommandResult<Organization>, DomainError> {
        let CreateOrganization {
            organization_id,
            requested_by,
            name,
            contact_email,
        } = cmd;

        self.handler
            .execute_with_snapshot(organization_id, |org| {
                org.create(organization_id, &name, contact_email, requested_by)
            })
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn update_organization(
        &self,
        cmd: UpdateOrganization,
    ) -> Result<CommandResult<Organization>, DomainError> {
        let UpdateOrganization {
            organization_id,
            requested_by,
            name_change,
            contact_email_change,
        } = cmd;

        self.handler
            .execute_with_snapshot(organization_id, |org| {
                org.update_details(name_change, contact_email_change, requested_by)
            })
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn deregister_organization(
        &self,
        cmd: DeregisterOrganization,
    ) -> Result<CommandResult<Organization>, DomainError> {
        self.handler
            .execute_with_snapshot(cmd.organization_id, |org| {
                org.deregister(cmd.requested_by)
            })
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn reregister_organization(
        &self,
        cmd: ReregisterOrganization,
    ) -> Result<CommandResult<Organization>, DomainError> {
        self.handler
            .execute_with_snapshot(cmd.organization_id, |org| {
                org.reregister(cmd.requested_by)
            })
            .await
    }

    /// Gets an organization by ID, or None if it was never created.
    pub async fn get_organization(
        &self,
        organization_id: common::AggregateId,
    ) -> Result<Option<Organization>, DomainError> {
        self.handler.load_existing(organization_id).await
    }
}

#[async_trait]
impl<S: EventStore + Clone + 'static> Dispatch<S> for CreateOrganization {
    type Aggregate = Organization;

    async fn dispatch(
        self,
        gateway: &CommandGateway<S>,
    ) -> Result<CommandResult<Organization>, DomainError> {
        gateway.organizations().create_organization(self).await
    }
}

#[async_trait]
impl<S: EventStore + Clone + 'static> Dispatch<S> for UpdateOrganization {
    type Aggregate = Organization;

    async fn dispatch(
        self,
        gateway: &CommandGateway<S>,
    ) -> Result<CommandResult<Organization>, DomainError> {
        gateway.organizations().update_organization(self).await
    }
}

#[async_trait]
impl<S: EventStore + Clone + 'static> Dispatch<S> for DeregisterOrganization {
    type Aggregate = Organization;

    async fn dispatch(
        self,
        gateway: &CommandGateway<S>,
    ) -> Result<CommandResult<Organization>, DomainError> {
        gateway.organizations().deregister_organization(self).await
    }
}

#[async_trait]
impl<S: EventStore + Clone + 'static> Dispatch<S> for ReregisterOrganization {
    type Aggregate = Organization;

    async fn dispatch(
        self,
        gateway: &CommandGateway<S>,
    ) -> Result<CommandResult<Organization>, DomainError> {
        gateway.organizations().reregister_organization(self).await
    }
}
