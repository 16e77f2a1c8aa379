//! Errors raised while wiring and running the process.

use domain::{DomainError, RegistryError};
use event_store::EventStoreError;
use projections::ProjectionError;
use saga::SagaError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The validator registry is missing a capability.
    #[error("Validator registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    #[error("Event store error: {0}")]
    EventStore(#[from] EventStoreError),

    #[error("Projection error: {0}")]
    Projection(#[from] ProjectionError),

    #[error("Saga error: {0}")]
    Saga(#[from] SagaError),

    #[error("Failed to initialize tracing: {0}")]
    Tracing(#[from] tracing_subscriber::util::TryInitError),

    #[error("Failed to install metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),
}

pub type Result<T> = std::result::Result<T, RuntimeError>;
