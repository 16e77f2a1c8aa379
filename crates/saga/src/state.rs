//! Saga state machine.

use serde::{Deserialize, Serialize};

/// The state of a saga instance in its lifecycle.
///
/// State transitions:
/// ```text
/// Idle ──► Started ──► WaitingForConvergence ──┬──► CallingExternalSystem ──► Ended
///                                              └──────────────────────────────► Ended
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SagaState {
    #[default]
    Idle,

    /// A triggering event was accepted.
    Started,

    /// Polling the users view.
    WaitingForConvergence,

    /// The view converged and the identity system is being called.
    CallingExternalSystem,

    /// Terminal, whatever the outcome.
    Ended,
}

impl SagaState {
    /// Returns true while the instance holds its correlation key.
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            SagaState::Started | SagaState::WaitingForConvergence | SagaState::CallingExternalSystem
        )
    }

    /// Returns true if `next` is a legal successor of this state.
    pub fn can_transition_to(&self, next: SagaState) -> bool {
        matches!(
            (self, next),
            (SagaState::Idle, SagaState::Started)
                | (SagaState::Started, SagaState::WaitingForConvergence)
                | (SagaState::WaitingForConvergence, SagaState::CallingExternalSystem)
                | (SagaState::WaitingForConvergence, SagaState::Ended)
                | (SagaState::CallingExternalSystem, SagaState::Ended)
                | (SagaState::Started, SagaState::Ended)
        )
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            SagaState::Idle => "Idle",
            SagaState::Started => "Started",
            SagaState::WaitingForConvergence => "WaitingForConvergence",
            SagaState::CallingExternalSystem => "CallingExternalSystem",
            SagaState::Ended => "Ended",
        }
    }
}

impl std::fmt::Display for SagaState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a saga instance ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SagaOutcome {
    /// The identity system accepted the update or deletion.
    Synchronized,
    /// The users view did not converge within the waiter's window.
    ConvergenceTimedOut,
    /// The identity system call failed.
    ExternalCallFailed,
    /// The trigger carried no data to mirror, e.g. redacted details of a
    /// forgotten user.
    NothingToSynchronize,
}

impl SagaOutcome {
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            SagaOutcome::Synchronized | SagaOutcome::NothingToSynchronize
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SagaOutcome::Synchronized => "synchronized",
            SagaOutcome::ConvergenceTimedOut => "convergence_timed_out",
            SagaOutcome::ExternalCallFailed => "external_call_failed",
            SagaOutcome::NothingToSynchronize => "nothing_to_synchronize",
        }
    }
}
