//! Saga lifecycle events, appended for audit.

use chrono::{DateTime, Utc};
use common::AggregateId;
use domain::DomainEvent;
use event_store::EventId;
use serde::{Deserialize, Serialize};

use crate::state::SagaOutcome;

/// Events recorded while a saga instance runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum SagaEvent {
    /// A triggering event started the instance.
    SagaStarted(SagaStartedData),

    /// The users view reflected the trigger.
    ConvergenceReached(ConvergenceData),

    /// The users view did not converge in time.
    ConvergenceTimedOut(ConvergenceTimedOutData),

    /// The identity system accepted the call.
    ExternalCallSucceeded(ExternalCallData),

    /// The identity system call failed. No compensation follows.
    ExternalCallFailed(ExternalCallFailedData),

    /// The instance ended.
    SagaEnded(SagaEndedData),
}

impl DomainEvent for SagaEvent {
    fn event_type(&self) -> &'static str {
        match self {
            SagaEvent::SagaStarted(_) => "SagaStarted",
            SagaEvent::ConvergenceReached(_) => "ConvergenceReached",
            SagaEvent::ConvergenceTimedOut(_) => "ConvergenceTimedOut",
            SagaEvent::ExternalCallSucceeded(_) => "ExternalCallSucceeded",
            SagaEvent::ExternalCallFailed(_) => "ExternalCallFailed",
            SagaEvent::SagaEnded(_) => "SagaEnded",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SagaStartedData {
    pub saga_id: AggregateId,
    /// Correlation key.
    pub user_id: AggregateId,
    pub trigger_event_id: EventId,
    pub trigger_event_type: String,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvergenceData {
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvergenceTimedOutData {
    pub description: String,
    pub waited_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalCallData {
    /// `update_subject_attributes` or `delete_subject`.
    pub call: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalCallFailedData {
    pub call: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SagaEndedData {
    pub outcome: SagaOutcome,
    pub ended_at: DateTime<Utc>,
}

impl SagaEvent {
    pub fn saga_started(
        saga_id: AggregateId,
        user_id: AggregateId,
        trigger_event_id: EventId,
        trigger_event_type: impl Into<String>,
    ) -> Self {
        SagaEvent::SagaStarted(SagaStartedData {
            saga_id,
            user_id,
            trigger_event_id,
            trigger_event_type: trigger_event_type.into(),
            started_at: Utc::now(),
        })
    }

    pub fn convergence_reached(description: impl Into<String>) -> Self {
        SagaEvent::ConvergenceReached(ConvergenceData {
            description: description.into(),
        })
    }

    pub fn convergence_timed_out(description: impl Into<String>, waited_ms: u64) -> Self {
        SagaEvent::ConvergenceTimedOut(ConvergenceTimedOutData {
            description: description.into(),
            waited_ms,
        })
    }

    pub fn external_call_succeeded(call: impl Into<String>) -> Self {
        SagaEvent::ExternalCallSucceeded(ExternalCallData { call: call.into() })
    }

    pub fn external_call_failed(call: impl Into<String>, error: impl Into<String>) -> Self {
        SagaEvent::ExternalCallFailed(ExternalCallFailedData {
            call: call.into(),
            error: error.into(),
        })
    }

    pub fn saga_ended(outcome: SagaOutcome) -> Self {
        SagaEvent::SagaEnded(SagaEndedData {
            outcome,
            ended_at: Utc::now(),
        })
    }
}
