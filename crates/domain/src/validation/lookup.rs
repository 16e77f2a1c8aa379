//! Read-side queries used by validators.
//!
//! Implemented by the projection views. Answers may be stale.

use async_trait::async_trait;
use common::AggregateId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrganizationStatus {
    Registered,
    Deregistered,
}

#[async_trait]
pub trait OrganizationStatusLookup: Send + Sync {
    /// Returns None if the organization is unknown to the read side.
    async fn organization_status(&self, organization_id: AggregateId)
    -> Option<OrganizationStatus>;
}

#[async_trait]
pub trait UserEmailLookup: Send + Sync {
    /// Returns the user currently holding `email`, compared case-insensitively.
    async fn user_with_email(&self, email: &str) -> Option<AggregateId>;
}
