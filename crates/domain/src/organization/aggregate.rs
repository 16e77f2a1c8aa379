//! Organization aggregate implementation.

use common::AggregateId;
use event_store::Version;
use serde::{Deserialize, Serialize};

use crate::aggregate::{Aggregate, SnapshotCapable};

use super::{OrganizationError, OrganizationEvent, OrganizationState};

/// Organization aggregate root.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Organization {
    id: Option<AggregateId>,

    #[serde(default)]
    version: Version,

    name: String,
    contact_email: Option<String>,
    state: OrganizationState,
}

impl Aggregate for Organization {
    type Event = OrganizationEvent;
    type Error = OrganizationError;

    fn aggregate_type() -> &'static str {
        "Organization"
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
            OrganizationEvent::OrganizationCreated(data) => {
                self.id = Some(data.organization_id);
                self.name = data.name;
                self.contact_email = data.contact_email;
                self.state = OrganizationState::Registered;
            }
            OrganizationEvent::OrganizationDetailsUpdated(data) => {
                if let Some(name) = data.name_change {
                    self.name = name;
                }
                if let Some(email) = data.contact_email_change {
                    self.contact_email = Some(email);
                }
            }
            OrganizationEvent::OrganizationDeregistered(_) => {
                self.state = OrganizationState::Deregistered;
            }
            OrganizationEvent::OrganizationReregistered(_) => {
                self.state = OrganizationState::Registered;
            }
        }
    }
}

impl SnapshotCapable for Organization {}

// Query methods
impl Organization {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn contact_email(&self) -> Option<&str> {
        self.contact_email.as_deref()
    }

    pub fn state(&self) -> OrganizationState {
        self.state
    }

    pub fn is_deregistered(&self) -> bool {
        self.state == OrganizationState::Deregistered
    }
}

// Command methods (return events)
impl Organization {
    pub fn create(
        &self,
        organization_id: AggregateId,
        name: &str,
        contact_email: Option<String>,
        requested_by: AggregateId,
    ) -> Result<Vec<OrganizationEvent>, OrganizationError> {
        if self.id.is_some() {
            return Err(OrganizationError::AlreadyCreated);
        }
        let name = name.trim();
        if name.is_empty() {
            return Err(OrganizationError::NameRequired);
        }

        Ok(vec![OrganizationEvent::organization_created(
            organization_id,
            name,
            contact_email,
            requested_by,
        )])
    }

    pub fn update_details(
        &self,
        name_change: Option<String>,
        contact_email_change: Option<String>,
        requested_by: AggregateId,
    ) -> Result<Vec<OrganizationEvent>, OrganizationError> {
        self.ensure_accepts("update details")?;

        let name_change = match name_change.map(|n| n.trim().to_string()) {
            Some(name) if name.is_empty() => return Err(OrganizationError::NameRequired),
            other => other.filter(|name| *name != self.name),
        };
        let contact_email_change =
            contact_email_change.filter(|email| Some(email.as_str()) != self.contact_email());

        if name_change.is_none() && contact_email_change.is_none() {
            return Err(OrganizationError::NoChangesRequested);
        }

        Ok(vec![OrganizationEvent::details_updated(
            name_change,
            contact_email_change,
            requested_by,
        )])
    }

    pub fn deregister(
        &self,
        requested_by: AggregateId,
    ) -> Result<Vec<OrganizationEvent>, OrganizationError> {
        self.ensure_accepts("deregister")?;
        Ok(vec![OrganizationEvent::deregistered(requested_by)])
    }

    pub fn reregister(
        &self,
        requested_by: AggregateId,
    ) -> Result<Vec<OrganizationEvent>, OrganizationError> {
        if self.id.is_none() {
            return Err(OrganizationError::NotFound);
        }
        if !self.state.can_reregister() {
            return Err(OrganizationError::InvalidStateTransition {
                current_state: self.state,
                action: "reregister",
            });
        }
        Ok(vec![OrganizationEvent::reregistered(requested_by)])
    }

    fn ensure_accepts(&self, action: &'static str) -> Result<(), OrganizationError> {
        if self.id.is_none() {
            return Err(OrganizationError::NotFound);
        }
        if !self.state.accepts_business_commands() {
            return Err(OrganizationError::InvalidStateTransition {
                current_state: self.state,
                action,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn created() -> (Organization, AggregateId) {
        let mut org = Organization::default();
        let actor = AggregateId::new();
        let events = org
            .create(
                AggregateId::new(),
                "Acme Photography",
                Some("hello@acme.test".to_string()),
                actor,
            )
            .unwrap();
        org.apply_events(events);
        (org, actor)
    }

    #[test]
    fn test_create_organization() {
        let (org, _) = created();
        assert!(org.id().is_some());
        assert_eq!(org.name(), "Acme Photography");
        assert_eq!(org.contact_email(), Some("hello@acme.test"));
        assert_eq!(org.state(), OrganizationState::Registered);
    }

    #[test]
    fn test_create_twice_fails() {
        let (org, actor) = created();
        let result = org.create(AggregateId::new(), "Again", None, actor);
        assert!(matches!(result, Err(OrganizationError::AlreadyCreated)));
    }

    #[test]
    fn test_blank_name_rejected() {
        let org = Organization::default();
        let result = org.create(AggregateId::new(), "   ", None, AggregateId::new());
        assert!(matches!(result, Err(OrganizationError::NameRequired)));
    }

    #[test]
    fn test_update_only_records_changes() {
        let (org, actor) = created();
        let events = org
            .update_details(
                Some("Acme Photography".to_string()),
                Some("new@acme.test".to_string()),
                actor,
            )
            .unwrap();

        let OrganizationEvent::OrganizationDetailsUpdated(data) = &events[0] else {
            panic!("expected details update");
        };
        assert!(data.name_change.is_none());
        assert_eq!(data.contact_email_change.as_deref(), Some("new@acme.test"));
    }

    #[test]
    fn test_update_without_changes_fails() {
        let (org, actor) = created();
        let result = org.update_details(None, Some("hello@acme.test".to_string()), actor);
        assert!(matches!(result, Err(OrganizationError::NoChangesRequested)));
    }

    #[test]
    fn test_deregistered_rejects_everything_but_reregister() {
        let (mut org, actor) = created();
        org.apply_events(org.deregister(actor).unwrap());
        assert!(org.is_deregistered());

        assert!(matches!(
            org.deregister(actor),
            Err(OrganizationError::InvalidStateTransition { .. })
        ));
        assert!(matches!(
            org.update_details(Some("X".to_string()), None, actor),
            Err(OrganizationError::InvalidStateTransition { .. })
        ));

        org.apply_events(org.reregister(actor).unwrap());
        assert_eq!(org.state(), OrganizationState::Registered);
    }

    #[test]
    fn test_reregister_active_fails() {
        let (org, actor) = created();
        assert!(matches!(
            org.reregister(actor),
            Err(OrganizationError::InvalidStateTransition { .. })
        ));
    }

    #[test]
    fn test_commands_on_missing_organization_fail() {
        let org = Organization::default();
        let actor = AggregateId::new();
        assert!(matches!(org.deregister(actor), Err(OrganizationError::NotFound)));
        assert!(matches!(org.reregister(actor), Err(OrganizationError::NotFound)));
    }
}
