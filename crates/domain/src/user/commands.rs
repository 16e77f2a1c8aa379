//! User commands.

use common::{AggregateId, RoleSet};

use crate::command::Command;
use crate::validation::{
    EmailAddressValidatable, OrganizationStatusValidatable, UniqueEmailValidatable,
    ValidatableCommand,
};

use super::User;

/// Creates a user inside an organization.
///
/// Requires a well-formed, unused email and a registered organization.
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub user_id: AggregateId,
    pub organization_id: AggregateId,
    pub requested_by: AggregateId,
    pub email: String,
    pub display_name: String,
    pub roles: RoleSet,
}

impl CreateUser {
    /// Creates the command with a generated user ID.
    pub fn new(
        organization_id: AggregateId,
        requested_by: AggregateId,
        email: impl Into<String>,
        display_name: impl Into<String>,
        roles: RoleSet,
    ) -> Self {
        Self {
            user_id: AggregateId::new(),
            organization_id,
            requested_by,
            email: email.into(),
            display_name: display_name.into(),
            roles,
        }
    }
}

impl Command for CreateUser {
    type Aggregate = User;

    fn aggregate_id(&self) -> AggregateId {
        self.user_id
    }
}

impl EmailAddressValidatable for CreateUser {
    fn email_address(&self) -> Option<&str> {
        Some(&self.email)
    }
}

impl UniqueEmailValidatable for CreateUser {
    fn unique_email(&self) -> Option<&str> {
        Some(&self.email)
    }
}

impl OrganizationStatusValidatable for CreateUser {
    fn organization_id(&self) -> AggregateId {
        self.organization_id
    }
}

impl ValidatableCommand for CreateUser {
    fn command_name(&self) -> &'static str {
        "CreateUser"
    }

    fn as_email_address(&self) -> Option<&dyn EmailAddressValidatable> {
        Some(self)
    }

    fn as_unique_email(&self) -> Option<&dyn UniqueEmailValidatable> {
        Some(self)
    }

    fn as_organization_status(&self) -> Option<&dyn OrganizationStatusValidatable> {
        Some(self)
    }
}

/// Changes a user's email and/or display name. `None` leaves a field as is.
#[derive(Debug, Clone)]
pub struct UpdateUserDetails {
    pub user_id: AggregateId,
    pub requested_by: AggregateId,
    pub email_change: Option<String>,
    pub display_name_change: Option<String>,
}

impl UpdateUserDetails {
    pub fn new(
        user_id: AggregateId,
        requested_by: AggregateId,
        email_change: Option<String>,
        display_name_change: Option<String>,
    ) -> Self {
        Self {
            user_id,
            requested_by,
            email_change,
            display_name_change,
        }
    }
}

impl Command for UpdateUserDetails {
    type Aggregate = User;

    fn aggregate_id(&self) -> AggregateId {
        self.user_id
    }
}

impl EmailAddressValidatable for UpdateUserDetails {
    fn email_address(&self) -> Option<&str> {
        self.email_change.as_deref()
    }
}

impl UniqueEmailValidatable for UpdateUserDetails {
    fn unique_email(&self) -> Option<&str> {
        self.email_change.as_deref()
    }

    fn email_owner(&self) -> Option<AggregateId> {
        Some(self.user_id)
    }
}

impl ValidatableCommand for UpdateUserDetails {
    fn command_name(&self) -> &'static str {
        "UpdateUserDetails"
    }

    fn as_email_address(&self) -> Option<&dyn EmailAddressValidatable> {
        Some(self)
    }

    fn as_unique_email(&self) -> Option<&dyn UniqueEmailValidatable> {
        Some(self)
    }
}

#[derive(Debug, Clone)]
pub struct UpdateUserRoles {
    pub user_id: AggregateId,
    pub requested_by: AggregateId,
    pub roles: RoleSet,
}

impl UpdateUserRoles {
    pub fn new(user_id: AggregateId, requested_by: AggregateId, roles: RoleSet) -> Self {
        Self {
            user_id,
            requested_by,
            roles,
        }
    }
}

impl Command for UpdateUserRoles {
    type Aggregate = User;

    fn aggregate_id(&self) -> AggregateId {
        self.user_id
    }
}

impl ValidatableCommand for UpdateUserRoles {
    fn command_name(&self) -> &'static str {
        "UpdateUserRoles"
    }
}

/// Deletes a user and destroys their encryption key.
#[derive(Debug, Clone)]
pub struct DeleteAndForgetUser {
    pub user_id: AggregateId,
    pub requested_by: AggregateId,
    pub request_reason: String,
}

impl DeleteAndForgetUser {
    pub fn new(
        user_id: AggregateId,
        requested_by: AggregateId,
        request_reason: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            requested_by,
            request_reason: request_reason.into(),
        }
    }
}

impl Command for DeleteAndForgetUser {
    type Aggregate = User;

    fn aggregate_id(&self) -> AggregateId {
        self.user_id
    }
}

impl ValidatableCommand for DeleteAndForgetUser {
    fn command_name(&self) -> &'static str {
        "DeleteAndForgetUser"
    }
}
