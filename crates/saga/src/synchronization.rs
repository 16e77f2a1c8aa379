//! Keeps the external identity system in step with user changes.
//!
//! Each triggering user event starts one instance, correlated by user id.
//! The instance waits until the users view reflects the event, then makes a
//! single identity system call and ends. Nothing is compensated or retried
//! after that call: synchronization is best effort.

use std::sync::Arc;

use common::{AggregateId, RoleSet};
use domain::{Aggregate, DomainEvent, User, UserEvent};
use event_store::{AppendOptions, EventEnvelope, EventStore, Position, Version};
use projections::UsersView;
use tokio::time::Instant;

use crate::aggregate::SagaInstance;
use crate::error::Result;
use crate::events::SagaEvent;
use crate::identity::{IdentityProvider, IdentityProviderError, SubjectAttributes};
use crate::reconciliation::{ReconciliationError, RetryWithExponentialBackoff};
use crate::registry::{SagaRegistry, StartOutcome};
use crate::state::{SagaOutcome, SagaState};

const UPDATE_CALL: &str = "update_subject_attributes";
const DELETE_CALL: &str = "delete_subject";

/// The user events that start an instance.
#[derive(Debug, Clone)]
enum Trigger {
    RolesUpdated {
        user_id: AggregateId,
        roles: RoleSet,
    },
    DetailsUpdated {
        user_id: AggregateId,
        email_change: Option<String>,
        display_name_change: Option<String>,
    },
    Deleted {
        user_id: AggregateId,
    },
}

impl Trigger {
    /// Expects an envelope whose encrypted fields were already opened.
    fn from_envelope(envelope: &EventEnvelope) -> Result<Option<Self>> {
        if envelope.aggregate_type != User::aggregate_type() {
            return Ok(None);
        }

        let trigger = match serde_json::from_value(envelope.payload.clone())? {
            UserEvent::UserRolesUpdated(data) => Trigger::RolesUpdated {
                user_id: data.user_id,
                roles: data.roles,
            },
            UserEvent::UserDetailsUpdated(data) => Trigger::DetailsUpdated {
                user_id: data.user_id,
                email_change: data.email_change,
                display_name_change: data.display_name_change,
            },
            UserEvent::UserDeletedAndForgotten(data) => Trigger::Deleted {
                user_id: data.user_id,
            },
            UserEvent::UserCreated(_) => return Ok(None),
        };
        Ok(Some(trigger))
    }

    fn user_id(&self) -> AggregateId {
        match self {
            Trigger::RolesUpdated { user_id, .. }
            | Trigger::DetailsUpdated { user_id, .. }
            | Trigger::Deleted { user_id } => *user_id,
        }
    }

    fn description(&self) -> &'static str {
        match self {
            Trigger::RolesUpdated { .. } => "user roles projection update",
            Trigger::DetailsUpdated { .. } => "user email or display name projection update",
            Trigger::Deleted { .. } => "user deletion projection update",
        }
    }

    fn call(&self) -> &'static str {
        match self {
            Trigger::Deleted { .. } => DELETE_CALL,
            _ => UPDATE_CALL,
        }
    }

    /// A details update whose fields were redacted carries nothing to
    /// mirror and nothing to wait for.
    fn is_empty(&self) -> bool {
        matches!(
            self,
            Trigger::DetailsUpdated {
                email_change: None,
                display_name_change: None,
                ..
            }
        )
    }
}

/// Mirrors role changes, detail changes and deletions of users into the
/// identity system once the users view has caught up.
pub struct IdentitySynchronizationSaga<S: EventStore> {
    store: S,
    users: UsersView,
    provider: Arc<dyn IdentityProvider>,
    waiter: RetryWithExponentialBackoff,
    registry: SagaRegistry,
}

impl<S: EventStore> IdentitySynchronizationSaga<S> {
    /// Creates a saga using the one-minute waiter.
    pub fn new(store: S, users: UsersView, provider: Arc<dyn IdentityProvider>) -> Self {
        Self {
            store,
            users,
            provider,
            waiter: RetryWithExponentialBackoff::one_minute_waiter(),
            registry: SagaRegistry::new(),
        }
    }

    pub fn with_waiter(mut self, waiter: RetryWithExponentialBackoff) -> Self {
        self.waiter = waiter;
        self
    }

    pub fn registry(&self) -> &SagaRegistry {
        &self.registry
    }

    /// Returns true if `event` would start an instance.
    pub fn is_trigger(event: &EventEnvelope) -> bool {
        event.aggregate_type == User::aggregate_type()
            && matches!(
                event.event_type.as_str(),
                "UserRolesUpdated" | "UserDetailsUpdated" | "UserDeletedAndForgotten"
            )
    }

    /// Runs one instance to completion for a triggering event.
    ///
    /// Returns `None` for events that are not triggers and for a redelivery
    /// of the trigger already being handled. Blocks for the whole
    /// convergence window in the worst case.
    #[tracing::instrument(
        skip(self, event),
        fields(event_id = %event.event_id, event_type = %event.event_type)
    )]
    pub async fn handle(&self, event: &EventEnvelope) -> Result<Option<SagaOutcome>> {
        let Some(trigger) = Trigger::from_envelope(event)? else {
            return Ok(None);
        };
        let user_id = trigger.user_id();

        let saga_id = match self.registry.start(user_id, event.event_id).await {
            Ok(StartOutcome::Started(saga_id)) => saga_id,
            Ok(StartOutcome::Duplicate) => {
                tracing::debug!(%user_id, "trigger already being handled");
                return Ok(None);
            }
            Err(e) => {
                metrics::counter!("saga_rejected_total").increment(1);
                tracing::warn!(%user_id, error = %e, "saga already in flight, trigger dropped");
                return Err(e);
            }
        };

        metrics::counter!("saga_started_total").increment(1);
        tracing::info!(%saga_id, %user_id, "saga started");
        let started = Instant::now();

        let result = self.run(saga_id, &trigger, event).await;
        self.registry.end(user_id).await;

        let duration = started.elapsed().as_secs_f64();
        metrics::histogram!("saga_duration_seconds").record(duration);
        match &result {
            Ok(outcome) if outcome.is_success() => {
                metrics::counter!("saga_completed").increment(1);
                tracing::info!(%saga_id, outcome = outcome.as_str(), duration, "saga ended");
            }
            Ok(outcome) => {
                metrics::counter!("saga_failed", "outcome" => outcome.as_str()).increment(1);
                tracing::warn!(%saga_id, outcome = outcome.as_str(), duration, "saga ended without synchronizing");
            }
            Err(e) => {
                metrics::counter!("saga_failed", "outcome" => "error").increment(1);
                tracing::error!(%saga_id, error = %e, "saga aborted");
            }
        }

        result.map(Some)
    }

    async fn run(
        &self,
        saga_id: AggregateId,
        trigger: &Trigger,
        event: &EventEnvelope,
    ) -> Result<SagaOutcome> {
        let user_id = trigger.user_id();
        let mut version = Version::initial();

        version = self
            .append_saga_event(
                saga_id,
                version,
                &SagaEvent::saga_started(saga_id, user_id, event.event_id, &event.event_type),
            )
            .await?;

        if trigger.is_empty() {
            self.registry.transition(user_id, SagaState::Ended).await?;
            self.append_saga_event(
                saga_id,
                version,
                &SagaEvent::saga_ended(SagaOutcome::NothingToSynchronize),
            )
            .await?;
            return Ok(SagaOutcome::NothingToSynchronize);
        }

        self.registry
            .transition(user_id, SagaState::WaitingForConvergence)
            .await?;

        let description = trigger.description();
        if let Err(ReconciliationError::ConvergenceTimeout { elapsed, .. }) = self
            .waiter
            .wait_or_throw(|| self.converged(trigger), description)
            .await
        {
            version = self
                .append_saga_event(
                    saga_id,
                    version,
                    &SagaEvent::convergence_timed_out(description, elapsed.as_millis() as u64),
                )
                .await?;
            self.registry.transition(user_id, SagaState::Ended).await?;
            self.append_saga_event(
                saga_id,
                version,
                &SagaEvent::saga_ended(SagaOutcome::ConvergenceTimedOut),
            )
            .await?;
            return Ok(SagaOutcome::ConvergenceTimedOut);
        }

        version = self
            .append_saga_event(saga_id, version, &SagaEvent::convergence_reached(description))
            .await?;
        self.registry
            .transition(user_id, SagaState::CallingExternalSystem)
            .await?;

        let outcome = match self.call_identity_provider(trigger).await {
            Ok(()) => {
                version = self
                    .append_saga_event(
                        saga_id,
                        version,
                        &SagaEvent::external_call_succeeded(trigger.call()),
                    )
                    .await?;
                SagaOutcome::Synchronized
            }
            Err(e) => {
                tracing::warn!(%user_id, call = trigger.call(), error = %e, "identity provider call failed");
                version = self
                    .append_saga_event(
                        saga_id,
                        version,
                        &SagaEvent::external_call_failed(trigger.call(), e.to_string()),
                    )
                    .await?;
                SagaOutcome::ExternalCallFailed
            }
        };

        self.registry.transition(user_id, SagaState::Ended).await?;
        self.append_saga_event(saga_id, version, &SagaEvent::saga_ended(outcome))
            .await?;
        Ok(outcome)
    }

    /// Re-reads the users view on every call.
    async fn converged(&self, trigger: &Trigger) -> bool {
        match trigger {
            Trigger::RolesUpdated { user_id, roles } => self
                .users
                .get(*user_id)
                .await
                .is_some_and(|user| user.roles == *roles),
            Trigger::DetailsUpdated {
                user_id,
                email_change,
                display_name_change,
            } => self.users.get(*user_id).await.is_some_and(|user| {
                (email_change.is_some() && user.email == *email_change)
                    || (display_name_change.is_some() && user.display_name == *display_name_change)
            }),
            Trigger::Deleted { user_id } => !self.users.exists(*user_id).await,
        }
    }

    async fn call_identity_provider(
        &self,
        trigger: &Trigger,
    ) -> std::result::Result<(), IdentityProviderError> {
        match trigger {
            Trigger::RolesUpdated { user_id, roles } => {
                let user = self.users.get(*user_id).await;
                let attributes = SubjectAttributes {
                    organization_id: user.as_ref().map(|u| u.organization_id),
                    roles: roles.clone(),
                    display_name: user.and_then(|u| u.display_name),
                    email: None,
                };
                self.provider
                    .update_subject_attributes(*user_id, attributes)
                    .await
            }
            Trigger::DetailsUpdated {
                user_id,
                email_change,
                display_name_change,
            } => {
                let user = self.users.get(*user_id).await;
                let attributes = SubjectAttributes {
                    organization_id: user.as_ref().map(|u| u.organization_id),
                    roles: user.as_ref().map(|u| u.roles.clone()).unwrap_or_default(),
                    display_name: display_name_change
                        .clone()
                        .or_else(|| user.and_then(|u| u.display_name)),
                    email: email_change.clone(),
                };
                self.provider
                    .update_subject_attributes(*user_id, attributes)
                    .await
            }
            Trigger::Deleted { user_id } => self.provider.delete_subject(*user_id).await,
        }
    }

    /// Loads a saga instance by ID from the event store.
    pub async fn get_saga(&self, saga_id: AggregateId) -> Result<Option<SagaInstance>> {
        let events = self.store.get_events_for_aggregate(saga_id).await?;

        if events.is_empty() {
            return Ok(None);
        }

        let mut saga = SagaInstance::default();
        for envelope in events {
            let event: SagaEvent = serde_json::from_value(envelope.payload)?;
            saga.apply(event);
            saga.set_version(envelope.version);
        }
        Ok(Some(saga))
    }

    /// Every recorded instance for a user, oldest first.
    pub async fn instances_for_user(&self, user_id: AggregateId) -> Result<Vec<SagaInstance>> {
        let mut saga_ids = Vec::new();
        for envelope in self.store.read_all_from(Position::start()).await? {
            if envelope.aggregate_type != SagaInstance::aggregate_type() {
                continue;
            }
            if let SagaEvent::SagaStarted(data) = serde_json::from_value(envelope.payload)?
                && data.user_id == user_id
            {
                saga_ids.push(data.saga_id);
            }
        }

        let mut instances = Vec::with_capacity(saga_ids.len());
        for saga_id in saga_ids {
            if let Some(instance) = self.get_saga(saga_id).await? {
                instances.push(instance);
            }
        }
        Ok(instances)
    }

    /// Appends a single saga event to the event store.
    async fn append_saga_event(
        &self,
        saga_id: AggregateId,
        current_version: Version,
        event: &SagaEvent,
    ) -> Result<Version> {
        let envelope = EventEnvelope::builder()
            .event_type(event.event_type())
            .aggregate_id(saga_id)
            .aggregate_type(SagaInstance::aggregate_type())
            .version(current_version.next())
            .payload(event)?
            .build();

        let new_version = self
            .store
            .append(vec![envelope], AppendOptions::expect_version(current_version))
            .await?;
        Ok(new_version)
    }
}

impl<S: EventStore> std::fmt::Debug for IdentitySynchronizationSaga<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentitySynchronizationSaga")
            .field("waiter", &self.waiter)
            .finish_non_exhaustive()
    }
}

