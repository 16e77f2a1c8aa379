//! In-flight saga instances, keyed by correlation id.

use std::collections::HashMap;
use std::sync::Arc;

use common::AggregateId;
use event_store::EventId;
use tokio::sync::Mutex;

use crate::error::{Result, SagaError};
use crate::state::SagaState;

#[derive(Debug, Clone, Copy)]
struct InFlight {
    saga_id: AggregateId,
    trigger_event_id: EventId,
    state: SagaState,
}

/// Result of trying to start an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// A new instance was registered under this saga id.
    Started(AggregateId),
    /// The same triggering event is already being handled.
    Duplicate,
}

/// Explicit map from correlation key to the running instance.
///
/// Entries exist only between [`start`](Self::start) and
/// [`end`](Self::end). Nothing is persisted: instances running when the
/// process stops are not resumed.
#[derive(Debug, Clone, Default)]
pub struct SagaRegistry {
    instances: Arc<Mutex<HashMap<AggregateId, InFlight>>>,
}

impl SagaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an instance for `correlation_id`.
    ///
    /// Redelivery of the trigger already being handled is a
    /// [`StartOutcome::Duplicate`]; any other trigger for a busy key fails
    /// with [`SagaError::AlreadyInFlight`].
    pub async fn start(
        &self,
        correlation_id: AggregateId,
        trigger_event_id: EventId,
    ) -> Result<StartOutcome> {
        let mut instances = self.instances.lock().await;

        if let Some(existing) = instances.get(&correlation_id) {
            if existing.trigger_event_id == trigger_event_id {
                return Ok(StartOutcome::Duplicate);
            }
            return Err(SagaError::AlreadyInFlight {
                user_id: correlation_id,
                saga_id: existing.saga_id,
            });
        }

        let saga_id = AggregateId::new();
        instances.insert(
            correlation_id,
            InFlight {
                saga_id,
                trigger_event_id,
                state: SagaState::Started,
            },
        );
        Ok(StartOutcome::Started(saga_id))
    }

    /// Moves the instance to `next`.
    pub async fn transition(&self, correlation_id: AggregateId, next: SagaState) -> Result<()> {
        let mut instances = self.instances.lock().await;
        let instance = instances
            .get_mut(&correlation_id)
            .ok_or(SagaError::NotInFlight(correlation_id))?;

        if !instance.state.can_transition_to(next) {
            return Err(SagaError::InvalidTransition {
                from: instance.state,
                to: next,
            });
        }
        instance.state = next;
        Ok(())
    }

    /// Removes the instance. Ending an unknown key is a no-op.
    pub async fn end(&self, correlation_id: AggregateId) {
        self.instances.lock().await.remove(&correlation_id);
    }

    /// Current state of the instance for `correlation_id`, if any.
    pub async fn state(&self, correlation_id: AggregateId) -> Option<SagaState> {
        self.instances
            .lock()
            .await
            .get(&correlation_id)
            .map(|i| i.state)
    }

    pub async fn in_flight_count(&self) -> usize {
        self.instances.lock().await.len()
    }
}
