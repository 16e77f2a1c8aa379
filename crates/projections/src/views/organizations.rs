//! Organizations read model, also the status lookup for command validation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::AggregateId;
use domain::{Aggregate, Organization, OrganizationEvent, OrganizationStatus, OrganizationStatusLookup};
use event_store::EventEnvelope;
use tokio::sync::RwLock;

use crate::Result;
use crate::projection::{Projection, ProjectionPosition};

/// Denormalized organization.
#[derive(Debug, Clone)]
pub struct OrganizationRecord {
    pub organization_id: AggregateId,
    pub name: String,
    pub contact_email: Option<String>,
    pub status: OrganizationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Default)]
struct OrganizationsState {
    organizations: HashMap<AggregateId, OrganizationRecord>,
    position: ProjectionPosition,
}

/// Read model view of every organization and its registration status.
#[derive(Clone, Default)]
pub struct OrganizationsView {
    state: Arc<RwLock<OrganizationsState>>,
}

impl OrganizationsView {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, organization_id: AggregateId) -> Option<OrganizationRecord> {
        self.state
            .read()
            .await
            .organizations
            .get(&organization_id)
            .cloned()
    }

    pub async fn exists(&self, organization_id: AggregateId) -> bool {
        self.state
            .read()
            .await
            .organizations
            .contains_key(&organization_id)
    }

    /// Organizations that currently accept business commands.
    pub async fn registered(&self) -> Vec<OrganizationRecord> {
        let state = self.state.read().await;
        let mut registered: Vec<_> = state
            .organizations
            .values()
            .filter(|o| o.status == OrganizationStatus::Registered)
            .cloned()
            .collect();
        registered.sort_by(|a, b| a.name.cmp(&b.name));
        registered
    }

    pub async fn count(&self) -> usize {
        self.state.read().await.organizations.len()
    }
}

#[async_trait]
impl OrganizationStatusLookup for OrganizationsView {
    async fn organization_status(&self, id: AggregateId) -> Option<OrganizationStatus> {
        self.get(id).await.map(|o| o.status)
    }
}

#[async_trait]
impl Projection for OrganizationsView {
    fn name(&self) -> &'static str {
        "OrganizationsView"
    }

    async fn handle(&self, event: &EventEnvelope) -> Result<()> {
        let mut state = self.state.write().await;
        if let Some(position) = event.position {
            state.position = state.position.advance_to(position);
        }
        if event.aggregate_type != Organization::aggregate_type() {
            return Ok(());
        }

        let org_event: OrganizationEvent = serde_json::from_value(event.payload.clone())?;
        let organization_id = event.aggregate_id;

        match org_event {
            OrganizationEvent::OrganizationCreated(data) => {
                state.organizations.insert(
                    organization_id,
                    OrganizationRecord {
                        organization_id,
                        name: data.name,
                        contact_email: data.contact_email,
                        status: OrganizationStatus::Registered,
                        created_at: data.created_at,
                        updated_at: data.created_at,
                    },
                );
            }
            OrganizationEvent::OrganizationDetailsUpdated(data) => {
                if let Some(org) = state.organizations.get_mut(&organization_id) {
                    if let Some(name) = data.name_change {
                        org.name = name;
                    }
                    if let Some(email) = data.contact_email_change {
                        org.contact_email = Some(email);
                    }
                    org.updated_at = data.updated_at;
                }
            }
            OrganizationEvent::OrganizationDeregistered(data) => {
                if let Some(org) = state.organizations.get_mut(&organization_id) {
                    org.status = OrganizationStatus::Deregistered;
                    org.updated_at = data.deregistered_at;
                }
            }
            OrganizationEvent::OrganizationReregistered(data) => {
                if let Some(org) = state.organizations.get_mut(&organization_id) {
                    org.status = OrganizationStatus::Registered;
                    org.updated_at = data.reregistered_at;
                }
            }
        }

        Ok(())
    }

    async fn position(&self) -> ProjectionPosition {
        self.state.read().await.position
    }

    async fn reset(&self) -> Result<()> {
        *self.state.write().await = OrganizationsState::default();
        Ok(())
    }
}
