//! External identity system the saga keeps in sync.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{AggregateId, RoleSet};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

/// Errors reported by the identity system.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IdentityProviderError {
    #[error("Identity provider unavailable: {0}")]
    Unavailable(String),

    #[error("Subject not found: {0}")]
    SubjectNotFound(AggregateId),

    #[error("Subject already exists: {0}")]
    SubjectExists(AggregateId),
}

/// Attributes mirrored into the identity system.
///
/// `None` leaves the external value unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectAttributes {
    pub organization_id: Option<AggregateId>,
    pub roles: RoleSet,
    pub display_name: Option<String>,
    pub email: Option<String>,
}

/// The external identity system.
///
/// Calls are fallible and not assumed idempotent. The external id of a subject
/// is its user id.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Creates the subject and returns its external id.
    async fn create_subject(
        &self,
        user_id: AggregateId,
        attributes: SubjectAttributes,
    ) -> Result<AggregateId, IdentityProviderError>;

    async fn update_subject_attributes(
        &self,
        external_id: AggregateId,
        attributes: SubjectAttributes,
    ) -> Result<(), IdentityProviderError>;

    async fn delete_subject(&self, external_id: AggregateId) -> Result<(), IdentityProviderError>;
}

/// A call received by [`InMemoryIdentityProvider`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityCall {
    Create(AggregateId),
    Update(AggregateId, SubjectAttributes),
    Delete(AggregateId),
}

#[derive(Debug, Default)]
struct InMemoryIdentityState {
    subjects: HashMap<AggregateId, SubjectAttributes>,
    calls: Vec<IdentityCall>,
    fail_calls: bool,
}

/// In-memory identity system for tests and local runs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryIdentityProvider {
    state: Arc<RwLock<InMemoryIdentityState>>,
}

impl InMemoryIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following call fail with `Unavailable`.
    pub async fn set_fail_calls(&self, fail: bool) {
        self.state.write().await.fail_calls = fail;
    }

    pub async fn subject(&self, external_id: AggregateId) -> Option<SubjectAttributes> {
        self.state.read().await.subjects.get(&external_id).cloned()
    }

    /// Every call received, failed ones included, in order.
    pub async fn calls(&self) -> Vec<IdentityCall> {
        self.state.read().await.calls.clone()
    }

    pub async fn subject_count(&self) -> usize {
        self.state.read().await.subjects.len()
    }
}

#[async_trait]
impl IdentityProvider for InMemoryIdentityProvider {
    async fn create_subject(
        &self,
        user_id: AggregateId,
        attributes: SubjectAttributes,
    ) -> Result<AggregateId, IdentityProviderError> {
        let mut state = self.state.write().await;
        state.calls.push(IdentityCall::Create(user_id));

        if state.fail_calls {
            return Err(IdentityProviderError::Unavailable(
                "identity provider offline".to_string(),
            ));
        }
        if state.subjects.contains_key(&user_id) {
            return Err(IdentityProviderError::SubjectExists(user_id));
        }

        state.subjects.insert(user_id, attributes);
        Ok(user_id)
    }

    async fn update_subject_attributes(
        &self,
        external_id: AggregateId,
        attributes: SubjectAttributes,
    ) -> Result<(), IdentityProviderError> {
        let mut state = self.state.write().await;
        state
            .calls
            .push(IdentityCall::Update(external_id, attributes.clone()));

        if state.fail_calls {
            return Err(IdentityProviderError::Unavailable(
                "identity provider offline".to_string(),
            ));
        }

        let subject = state
            .subjects
            .get_mut(&external_id)
            .ok_or(IdentityProviderError::SubjectNotFound(external_id))?;
        if attributes.organization_id.is_some() {
            subject.organization_id = attributes.organization_id;
        }
        subject.roles = attributes.roles;
        if attributes.display_name.is_some() {
            subject.display_name = attributes.display_name;
        }
        if attributes.email.is_some() {
            subject.email = attributes.email;
        }
        Ok(())
    }

    async fn delete_subject(&self, external_id: AggregateId) -> Result<(), IdentityProviderError> {
        let mut state = self.state.write().await;
        state.calls.push(IdentityCall::Delete(external_id));

        if state.fail_calls {
            return Err(IdentityProviderError::Unavailable(
                "identity provider offline".to_string(),
            ));
        }

        state
            .subjects
            .remove(&external_id)
            .map(|_| ())
            .ok_or(IdentityProviderError::SubjectNotFound(external_id))
    }
}
