//! User aggregate implementation.

use chrono::Utc;
use common::{AggregateId, RoleSet};
use event_store::Version;
use serde::{Deserialize, Serialize};

use crate::aggregate::{Aggregate, SnapshotCapable};

use super::{
    UserError, UserEvent, UserState,
    events::{
        UserCreatedData, UserDeletedAndForgottenData, UserDetailsUpdatedData,
        UserRolesUpdatedData,
    },
};

/// User aggregate root.
///
/// Email and display name are `None` when rebuilt after the user was
/// forgotten, since the events carrying them can no longer be decrypted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct User {
    id: Option<AggregateId>,

    #[serde(default)]
    version: Version,

    organization_id: Option<AggregateId>,
    email: Option<String>,
    display_name: Option<String>,
    roles: RoleSet,
    state: UserState,
}

impl Aggregate for User {
    type Event = UserEvent;
    type Error = UserError;

    fn aggregate_type() -> &'static str {
        "User"
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
            UserEvent::UserCreated(data) => {
                self.id = Some(data.user_id);
                self.organization_id = Some(data.organization_id);
                self.email = data.email;
                self.display_name = data.display_name;
                self.roles = data.roles;
                self.state = UserState::Active;
            }
            UserEvent::UserDetailsUpdated(data) => {
                if data.email_change.is_some() {
                    self.email = data.email_change;
                }
                if data.display_name_change.is_some() {
                    self.display_name = data.display_name_change;
                }
            }
            UserEvent::UserRolesUpdated(data) => {
                self.roles = data.roles;
            }
            UserEvent::UserDeletedAndForgotten(_) => {
                self.email = None;
                self.display_name = None;
                self.state = UserState::Forgotten;
            }
        }
    }
}

impl SnapshotCapable for User {}

// Query methods
impl User {
    pub fn organization_id(&self) -> Option<AggregateId> {
        self.organization_id
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    pub fn roles(&self) -> &RoleSet {
        &self.roles
    }

    pub fn state(&self) -> UserState {
        self.state
    }

    pub fn is_forgotten(&self) -> bool {
        self.state.is_terminal()
    }
}

// Command methods (return events)
impl User {
    pub fn create(
        &self,
        user_id: AggregateId,
        organization_id: AggregateId,
        email: &str,
        display_name: &str,
        roles: RoleSet,
        requested_by: AggregateId,
    ) -> Result<Vec<UserEvent>, UserError> {
        if self.id.is_some() {
            return Err(UserError::AlreadyCreated);
        }
        let display_name = display_name.trim();
        if display_name.is_empty() {
            return Err(UserError::DisplayNameRequired);
        }

        Ok(vec![UserEvent::UserCreated(UserCreatedData {
            user_id,
            organization_id,
            email: Some(email.to_string()),
            display_name: Some(display_name.to_string()),
            roles,
            created_by: requested_by,
            created_at: Utc::now(),
        })])
    }

    pub fn update_details(
        &self,
        email_change: Option<String>,
        display_name_change: Option<String>,
        requested_by: AggregateId,
    ) -> Result<Vec<UserEvent>, UserError> {
        let user_id = self.ensure_active("update details")?;

        let display_name_change = match display_name_change.map(|n| n.trim().to_string()) {
            Some(name) if name.is_empty() => return Err(UserError::DisplayNameRequired),
            other => other,
        };
        if email_change.is_none() && display_name_change.is_none() {
            return Err(UserError::NoChangesRequested);
        }

        Ok(vec![UserEvent::UserDetailsUpdated(UserDetailsUpdatedData {
            user_id,
            email_change,
            display_name_change,
            updated_by: requested_by,
            updated_at: Utc::now(),
        })])
    }

    pub fn update_roles(
        &self,
        roles: RoleSet,
        requested_by: AggregateId,
    ) -> Result<Vec<UserEvent>, UserError> {
        let user_id = self.ensure_active("update roles")?;
        if roles == self.roles {
            return Err(UserError::NoChangesRequested);
        }

        Ok(vec![UserEvent::UserRolesUpdated(UserRolesUpdatedData {
            user_id,
            roles,
            updated_by: requested_by,
            updated_at: Utc::now(),
        })])
    }

    pub fn delete_and_forget(
        &self,
        request_reason: &str,
        requested_by: AggregateId,
    ) -> Result<Vec<UserEvent>, UserError> {
        let user_id = self.ensure_active("delete")?;

        Ok(vec![UserEvent::UserDeletedAndForgotten(
            UserDeletedAndForgottenData {
                user_id,
                deleted_by: requested_by,
                request_reason: request_reason.to_string(),
                deleted_at: Utc::now(),
            },
        )])
    }

    fn ensure_active(&self, action: &'static str) -> Result<AggregateId, UserError> {
        let Some(user_id) = self.id else {
            return Err(UserError::NotFound);
        };
        if self.state.is_terminal() {
            return Err(UserError::InvalidStateTransition {
                current_state: self.state,
                action,
            });
        }
        Ok(user_id)
    }
}
