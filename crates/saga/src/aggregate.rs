//! Saga instance, rebuilt from its lifecycle events.

use common::AggregateId;
use domain::Aggregate;
use event_store::{EventId, Version};
use serde::{Deserialize, Serialize};

use crate::error::SagaError;
use crate::events::SagaEvent;
use crate::state::{SagaOutcome, SagaState};

/// Audit view of one identity synchronization run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SagaInstance {
    id: Option<AggregateId>,
    version: Version,
    user_id: Option<AggregateId>,
    trigger_event_id: Option<EventId>,
    trigger_event_type: String,
    state: SagaState,
    external_calls: Vec<String>,
    failure_reason: Option<String>,
    outcome: Option<SagaOutcome>,
}

impl Aggregate for SagaInstance {
    type Event = SagaEvent;
    type Error = SagaError;

    fn aggregate_type() -> &'static str {
        "IdentitySynchronizationSaga"
    }

    fn id(&self) -> Option<AggregateId> {
        self.id
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn apply(&mut self, event: Self::Event) {
        match event {
            SagaEvent::SagaStarted(data) => {
                self.id = Some(data.saga_id);
                self.user_id = Some(data.user_id);
                self.trigger_event_id = Some(data.trigger_event_id);
                self.trigger_event_type = data.trigger_event_type;
                self.state = SagaState::WaitingForConvergence;
            }
            SagaEvent::ConvergenceReached(_) => {
                self.state = SagaState::CallingExternalSystem;
            }
            SagaEvent::ConvergenceTimedOut(data) => {
                self.failure_reason = Some(format!(
                    "timed out after {} ms waiting for {}",
                    data.waited_ms, data.description
                ));
            }
            SagaEvent::ExternalCallSucceeded(data) => {
                self.external_calls.push(data.call);
            }
            SagaEvent::ExternalCallFailed(data) => {
                self.external_calls.push(data.call);
                self.failure_reason = Some(data.error);
            }
            SagaEvent::SagaEnded(data) => {
                self.state = SagaState::Ended;
                self.outcome = Some(data.outcome);
            }
        }
    }
}

impl SagaInstance {
    pub fn state(&self) -> SagaState {
        self.state
    }

    pub fn user_id(&self) -> Option<AggregateId> {
        self.user_id
    }

    pub fn trigger_event_id(&self) -> Option<EventId> {
        self.trigger_event_id
    }

    pub fn trigger_event_type(&self) -> &str {
        &self.trigger_event_type
    }

    /// Identity system calls attempted, failed ones included.
    pub fn external_calls(&self) -> &[String] {
        &self.external_calls
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    pub fn outcome(&self) -> Option<SagaOutcome> {
        self.outcome
    }
}
