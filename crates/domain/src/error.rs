//! Domain error types.

use crypto::CryptoError;
use event_store::EventStoreError;
use thiserror::Error;

use crate::competition::CompetitionError;
use crate::organization::OrganizationError;
use crate::user::UserError;
use crate::validation::ValidationFailure;

/// Errors that can occur during domain operations.
///
/// `Validation` means the command was rejected before any aggregate saw it.
/// The aggregate variants and `EventStore` are invariant violations raised
/// after validation passed.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationFailure),

    #[error("Organization error: {0}")]
    Organization(OrganizationError),

    #[error("User error: {0}")]
    User(UserError),

    #[error("Competition error: {0}")]
    Competition(CompetitionError),

    /// An error occurred in the event store, including optimistic
    /// concurrency conflicts.
    #[error("Event store error: {0}")]
    EventStore(#[from] EventStoreError),

    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Aggregate not found.
    #[error("Aggregate not found: {aggregate_type} with id {aggregate_id}")]
    AggregateNotFound {
        aggregate_type: &'static str,
        aggregate_id: String,
    },

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DomainError {
    /// Returns true if the append lost an optimistic concurrency race.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            DomainError::EventStore(EventStoreError::ConcurrencyConflict { .. })
        )
    }

    /// Returns the validation failure, if this is one.
    pub fn as_validation(&self) -> Option<&ValidationFailure> {
        match self {
            DomainError::Validation(failure) => Some(failure),
            _ => None,
        }
    }
}
