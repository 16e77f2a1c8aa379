//! Organization commands.

use common::AggregateId;

use crate::command::Command;
use crate::validation::{EmailAddressValidatable, ValidatableCommand};

use super::Organization;

#[derive(Debug, Clone)]
pub struct CreateOrganization {
    pub organization_id: AggregateId,
    pub requested_by: AggregateId,
    pub name: String,
    pub contact_email: Option<String>,
}

impl CreateOrganization {
    /// Creates the command with a generated organization ID.
    pub fn new(
        requested_by: AggregateId,
        name: impl Into<String>,
        contact_email: Option<String>,
    ) -> Self {
        Self {
            organization_id: AggregateId::new(),
            requested_by,
            name: name.into(),
            contact_email,
        }
    }
}

impl Command for CreateOrganization {
    type Aggregate = Organization;

    fn aggregate_id(&self) -> AggregateId {
        self.organization_id
    }
}

impl EmailAddressValidatable for CreateOrganization {
    fn email_address(&self) -> Option<&str> {
        self.contact_email.as_deref()
    }
}

impl ValidatableCommand for CreateOrganization {
    fn command_name(&self) -> &'static str {
        "CreateOrganization"
    }

    fn as_email_address(&self) -> Option<&dyn EmailAddressValidatable> {
        Some(self)
    }
}

#[derive(Debug, Clone)]
pub struct UpdateOrganization {
    pub organization_id: AggregateId,
    pub requested_by: AggregateId,
    pub name_change: Option<String>,
    pub contact_email_change: Option<String>,
}

impl UpdateOrganization {
    pub fn new(
        organization_id: AggregateId,
        requested_by: AggregateId,
        name_change: Option<String>,
        contact_email_change: Option<String>,
    ) -> Self {
        Self {
            organization_id,
            requested_by,
            name_change,
            contact_email_change,
        }
    }
}

impl Command for UpdateOrganization {
    type Aggregate = Organization;

    fn aggregate_id(&self) -> AggregateId {
        self.organization_id
    }
}

impl EmailAddressValidatable for UpdateOrganization {
    fn email_address(&self) -> Option<&str> {
        self.contact_email_change.as_deref()
    }
}

impl ValidatableCommand for UpdateOrganization {
    fn command_name(&self) -> &'static str {
        "UpdateOrganization"
    }

    fn as_email_address(&self) -> Option<&dyn EmailAddressValidatable> {
        Some(self)
    }
}

#[derive(Debug, Clone)]
pub struct DeregisterOrganization {
    pub organization_id: AggregateId,
    pub requested_by: AggregateId,
}

impl DeregisterOrganization {
    pub fn new(organization_id: AggregateId, requested_by: AggregateId) -> Self {
        Self {
            organization_id,
            requested_by,
        }
    }
}

impl Command for DeregisterOrganization {
    type Aggregate = Organization;

    fn aggregate_id(&self) -> AggregateId {
        self.organization_id
    }
}

impl ValidatableCommand for DeregisterOrganization {
    fn command_name(&self) -> &'static str {
        "DeregisterOrganization"
    }
}

#[derive(Debug, Clone)]
pub struct ReregisterOrganization {
    pub organization_id: AggregateId,
    pub requested_by: AggregateId,
}

impl ReregisterOrganization {
    pub fn new(organization_id: AggregateId, requested_by: AggregateId) -> Self {
        Self {
            organization_id,
            requested_by,
        }
    }
}

impl Command for ReregisterOrganization {
    type Aggregate = Organization;

    fn aggregate_id(&self) -> AggregateId {
        self.organization_id
    }
}

impl ValidatableCommand for ReregisterOrganization {
    fn command_name(&self) -> &'static str {
        "ReregisterOrganization"
    }
}
