//! User domain events.
//!
//! Email addresses and display names are personal data. They are encrypted
//! under the user's own key and read back as `None` once the user has been
//! forgotten.

use chrono::{DateTime, Utc};
use common::{AggregateId, RoleSet};
use crypto::FieldEncryption;
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;

/// Events that can occur on a user aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum UserEvent {
    UserCreated(UserCreatedData),
    UserDetailsUpdated(UserDetailsUpdatedData),
    UserRolesUpdated(UserRolesUpdatedData),
    UserDeletedAndForgotten(UserDeletedAndForgottenData),
}

impl DomainEvent for UserEvent {
    fn event_type(&self) -> &'static str {
        match self {
            UserEvent::UserCreated(_) => "UserCreated",
            UserEvent::UserDetailsUpdated(_) => "UserDetailsUpdated",
            UserEvent::UserRolesUpdated(_) => "UserRolesUpdated",
            UserEvent::UserDeletedAndForgotten(_) => "UserDeletedAndForgotten",
        }
    }

    fn encryption(&self) -> Option<FieldEncryption> {
        match self {
            UserEvent::UserCreated(_) => {
                Some(FieldEncryption::new("user_id", ["email", "display_name"]))
            }
            UserEvent::UserDetailsUpdated(_) => Some(FieldEncryption::new(
                "user_id",
                ["email_change", "display_name_change"],
            )),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserCreatedData {
    pub user_id: AggregateId,
    pub organization_id: AggregateId,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub roles: RoleSet,
    pub created_by: AggregateId,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDetailsUpdatedData {
    pub user_id: AggregateId,
    pub email_change: Option<String>,
    pub display_name_change: Option<String>,
    pub updated_by: AggregateId,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRolesUpdatedData {
    pub user_id: AggregateId,
    pub roles: RoleSet,
    pub updated_by: AggregateId,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDeletedAndForgottenData {
    pub user_id: AggregateId,
    pub deleted_by: AggregateId,
    pub request_reason: String,
    pub deleted_at: DateTime<Utc>,
}

impl UserEvent {
    /// The user this event is about.
    pub fn user_id(&self) -> AggregateId {
        match self {
            UserEvent::UserCreated(data) => data.user_id,
            UserEvent::UserDetailsUpdated(data) => data.user_id,
            UserEvent::UserRolesUpdated(data) => data.user_id,
            UserEvent::UserDeletedAndForgotten(data) => data.user_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use common::Role;

    use super::*;

    #[test]
    fn test_personal_fields_are_declared_for_encryption() {
        let user_id = AggregateId::new();
        let created = UserEvent::UserCreated(UserCreatedData {
            user_id,
            organization_id: AggregateId::new(),
            email: Some("ada@example.com".to_string()),
            display_name: Some("Ada".to_string()),
            roles: RoleSet::from([Role::OrgUser]),
            created_by: AggregateId::new(),
            created_at: Utc::now(),
        });
        let spec = created.encryption().unwrap();
        assert_eq!(spec.key_identifier_field, "user_id");
        assert!(spec.encrypted_fields.contains(&"email".to_string()));

        let roles = UserEvent::UserRolesUpdated(UserRolesUpdatedData {
            user_id,
            roles: RoleSet::from([Role::Admin]),
            updated_by: AggregateId::new(),
            updated_at: Utc::now(),
        });
        assert!(roles.encryption().is_none());
        assert_eq!(roles.user_id(), user_id);
    }

    #[test]
    fn test_roles_serialize_as_names() {
        let event = UserEvent::UserRolesUpdated(UserRolesUpdatedData {
            user_id: AggregateId::new(),
            roles: RoleSet::from([Role::OrgAdmin, Role::OrgUser]),
            updated_by: AggregateId::new(),
            updated_at: Utc::now(),
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "UserRolesUpdated");
        assert_eq!(json["data"]["roles"], serde_json::json!(["ORG_ADMIN", "ORG_USER"]));
    }
}
