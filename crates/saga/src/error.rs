//! Saga error types.

use common::AggregateId;
use crypto::CryptoError;
use event_store::EventStoreError;
use thiserror::Error;

use crate::state::SagaState;

/// Errors that can occur while running sagas.
///
/// Convergence timeouts and identity system failures are not errors here:
/// they end the instance with a [`SagaOutcome`](crate::SagaOutcome).
#[derive(Debug, Error)]
pub enum SagaError {
    /// A different triggering event arrived while an instance for the same
    /// user was still running. The new trigger is dropped.
    #[error("Saga {saga_id} already in flight for user {user_id}")]
    AlreadyInFlight {
        user_id: AggregateId,
        saga_id: AggregateId,
    },

    /// Saga is in an invalid state for the requested transition.
    #[error("Invalid saga transition from {from} to {to}")]
    InvalidTransition { from: SagaState, to: SagaState },

    /// No instance is registered for the user.
    #[error("No saga in flight for user {0}")]
    NotInFlight(AggregateId),

    /// Event store error.
    #[error("Event store error: {0}")]
    EventStore(#[from] EventStoreError),

    /// The triggering event could not be decrypted.
    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SagaError {
    /// Returns true if a trigger was dropped because another instance for
    /// the same user was still running.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, SagaError::AlreadyInFlight { .. })
    }
}

/// Convenience type alias for saga results.
pub type Result<T> = std::result::Result<T, SagaError>;
