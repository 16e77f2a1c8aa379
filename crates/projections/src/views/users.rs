//! Users read model.
//!
//! Backs the unique-email check on the command path and the convergence
//! predicates of the identity synchronization saga. Forgotten users are
//! removed outright.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{AggregateId, RoleSet};
use domain::{Aggregate, User, UserEmailLookup, UserEvent};
use event_store::EventEnvelope;
use tokio::sync::RwLock;

use crate::Result;
use crate::projection::{Projection, ProjectionPosition};

/// Denormalized user.
///
/// Personal fields are `None` when the event was replayed after the user's
/// key was destroyed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub user_id: AggregateId,
    pub organization_id: AggregateId,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub roles: RoleSet,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Default)]
struct UsersState {
    users: HashMap<AggregateId, UserRecord>,
    position: ProjectionPosition,
}

/// Read model view of active users.
#[derive(Clone, Default)]
pub struct UsersView {
    state: Arc<RwLock<UsersState>>,
}

impl UsersView {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, user_id: AggregateId) -> Option<UserRecord> {
        self.state.read().await.users.get(&user_id).cloned()
    }

    pub async fn exists(&self, user_id: AggregateId) -> bool {
        self.state.read().await.users.contains_key(&user_id)
    }

    /// Email comparison ignores case.
    pub async fn has_user_with_email(&self, email: &str) -> bool {
        self.user_with_email(email).await.is_some()
    }

    pub async fn users_in_organization(&self, organization_id: AggregateId) -> Vec<UserRecord> {
        self.state
            .read()
            .await
            .users
            .values()
            .filter(|u| u.organization_id == organization_id)
            .cloned()
            .collect()
    }

    pub async fn count(&self) -> usize {
        self.state.read().await.users.len()
    }
}

#[async_trait]
impl UserEmailLookup for UsersView {
    async fn user_with_email(&self, email: &str) -> Option<AggregateId> {
        self.state
            .read()
            .await
            .users
            .values()
            .find(|u| {
                u.email
                    .as_deref()
                    .is_some_and(|e| e.eq_ignore_ascii_case(email))
            })
            .map(|u| u.user_id)
    }
}

#[async_trait]
impl Projection for UsersView {
    fn name(&self) -> &'static str {
        "UsersView"
    }

    async fn handle(&self, event: &EventEnvelope) -> Result<()> {
        let mut state = self.state.write().await;
        if let Some(position) = event.position {
            state.position = state.position.advance_to(position);
        }
        if event.aggregate_type != User::aggregate_type() {
            return Ok(());
        }

        let user_event: UserEvent = serde_json::from_value(event.payload.clone())?;

        match user_event {
            UserEvent::UserCreated(data) => {
                state.users.insert(
                    data.user_id,
                    UserRecord {
                        user_id: data.user_id,
                        organization_id: data.organization_id,
                        email: data.email,
                        display_name: data.display_name,
                        roles: data.roles,
                        created_at: data.created_at,
                        updated_at: data.created_at,
                    },
                );
            }
            UserEvent::UserDetailsUpdated(data) => {
                if let Some(user) = state.users.get_mut(&data.user_id) {
                    if data.email_change.is_some() {
                        user.email = data.email_change;
                    }
                    if data.display_name_change.is_some() {
                        user.display_name = data.display_name_change;
                    }
                    user.updated_at = data.updated_at;
                }
            }
            UserEvent::UserRolesUpdated(data) => {
                if let Some(user) = state.users.get_mut(&data.user_id) {
                    user.roles = data.roles;
                    user.updated_at = data.updated_at;
                }
            }
            UserEvent::UserDeletedAndForgotten(data) => {
                state.users.remove(&data.user_id);
            }
        }

        Ok(())
    }

    async fn position(&self) -> ProjectionPosition {
        self.state.read().await.position
    }

    async fn reset(&self) -> Result<()> {
        *self.state.write().await = UsersState::default();
        Ok(())
    }
}
