//! Organization domain events.

use chrono::{DateTime, Utc};
use common::AggregateId;
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;

/// Events that can occur on an organization aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OrganizationEvent {
    OrganizationCreated(OrganizationCreatedData),
    OrganizationDetailsUpdated(OrganizationDetailsUpdatedData),
    OrganizationDeregistered(OrganizationDeregisteredData),
    OrganizationReregistered(OrganizationReregisteredData),
}

impl DomainEvent for OrganizationEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrganizationEvent::OrganizationCreated(_) => "OrganizationCreated",
            OrganizationEvent::OrganizationDetailsUpdated(_) => "OrganizationDetailsUpdated",
            OrganizationEvent::OrganizationDeregistered(_) => "OrganizationDeregistered",
            OrganizationEvent::OrganizationReregistered(_) => "OrganizationReregistered",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizationCreatedData {
    pub organization_id: AggregateId,
    pub name: String,
    pub contact_email: Option<String>,
    pub created_by: AggregateId,
    pub created_at: DateTime<Utc>,
}

/// Only the changed fields are set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizationDetailsUpdatedData {
    pub name_change: Option<String>,
    pub contact_email_change: Option<String>,
    pub updated_by: AggregateId,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizationDeregisteredData {
    pub deregistered_by: AggregateId,
    pub deregistered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizationReregisteredData {
    pub reregistered_by: AggregateId,
    pub reregistered_at: DateTime<Utc>,
}

impl OrganizationEvent {
    pub fn organization_created(
        organization_id: AggregateId,
        name: impl Into<String>,
        contact_email: Option<String>,
        created_by: AggregateId,
    ) -> Self {
        OrganizationEvent::OrganizationCreated(OrganizationCreatedData {
            organization_id,
            name: name.into(),
            contact_email,
            created_by,
            created_at: Utc::now(),
        })
    }

    pub fn details_updated(
        name_change: Option<String>,
        contact_email_change: Option<String>,
        updated_by: AggregateId,
    ) -> Self {
        OrganizationEvent::OrganizationDetailsUpdated(OrganizationDetailsUpdatedData {
            name_change,
            contact_email_change,
            updated_by,
            updated_at: Utc::now(),
        })
    }

    pub fn deregistered(deregistered_by: AggregateId) -> Self {
        OrganizationEvent::OrganizationDeregistered(OrganizationDeregisteredData {
            deregistered_by,
            deregistered_at: Utc::now(),
        })
    }

    pub fn reregistered(reregistered_by: AggregateId) -> Self {
        OrganizationEvent::OrganizationReregistered(OrganizationReregisteredData {
            reregistered_by,
            reregistered_at: Utc::now(),
        })
    }
}
