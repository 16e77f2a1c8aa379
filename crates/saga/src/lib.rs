//! Identity synchronization saga.
//!
//! When a user's roles or details change, or the user is forgotten, the
//! identity system has to follow. The saga for that user:
//! 1. Waits until the users view reflects the change, polling with
//!    exponential backoff for at most a minute
//! 2. Calls the identity system once
//!
//! A view that never converges ends the instance without a call. A failed
//! call is logged and recorded, never compensated.

pub mod aggregate;
pub mod error;
pub mod events;
pub mod identity;
pub mod reconciliation;
pub mod registry;
pub mod runner;
pub mod state;
pub mod synchronization;

pub use aggregate::SagaInstance;
pub use error::SagaError;
pub use events::SagaEvent;
pub use identity::{
    IdentityCall, IdentityProvider, IdentityProviderError, InMemoryIdentityProvider,
    SubjectAttributes,
};
pub use reconciliation::{ReconciliationError, RetryWithExponentialBackoff};
pub use registry::{SagaRegistry, StartOutcome};
pub use runner::SagaRunner;
pub use state::{SagaOutcome, SagaState};
pub use synchronization::IdentitySynchronizationSaga;
