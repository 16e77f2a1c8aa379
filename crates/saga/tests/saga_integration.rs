//! Integration tests: user service → event log → users view → saga →
//! identity provider.
//!
//! The tokio clock is paused, so convergence waits take no real time.

use std::sync::Arc;
use std::time::Duration;

use common::{AggregateId, Role, RoleSet};
use crypto::{CryptoShreddingCodec, InMemoryKeyStore};
use domain::{CreateUser, DeleteAndForgetUser, UpdateUserDetails, UpdateUserRoles, UserService};
use event_store::{EventEnvelope, EventStore, InMemoryEventStore, Position};
use projections::{ProjectionProcessor, UsersView};
use saga::{
    IdentityCall, IdentityProvider, IdentitySynchronizationSaga, InMemoryIdentityProvider,
    SagaOutcome, SagaRunner, SagaState, SubjectAttributes,
};
use tokio::time::{Instant, sleep};

struct Setup {
    store: InMemoryEventStore,
    codec: CryptoShreddingCodec,
    users: UserService<InMemoryEventStore>,
    users_view: UsersView,
    processor: Arc<ProjectionProcessor<InMemoryEventStore>>,
    provider: InMemoryIdentityProvider,
    saga: Arc<IdentitySynchronizationSaga<InMemoryEventStore>>,
}

fn setup() -> Setup {
    let store = InMemoryEventStore::new();
    let codec = CryptoShreddingCodec::new(Arc::new(InMemoryKeyStore::new()));
    let users_view = UsersView::new();

    let mut processor = ProjectionProcessor::new(store.clone(), codec.clone());
    processor.register(Box::new(users_view.clone()));

    let provider = InMemoryIdentityProvider::new();
    let saga = IdentitySynchronizationSaga::new(
        store.clone(),
        users_view.clone(),
        Arc::new(provider.clone()),
    );

    Setup {
        users: UserService::new(store.clone(), codec.clone()),
        store,
        codec,
        users_view,
        processor: Arc::new(processor),
        provider,
        saga: Arc::new(saga),
    }
}

/// Creates a user, mirrors it into the identity provider and lets the view
/// catch up.
async fn synchronized_user(s: &Setup) -> AggregateId {
    let organization_id = AggregateId::new();
    let cmd = CreateUser::new(
        organization_id,
        AggregateId::new(),
        "ada@example.com",
        "Ada",
        RoleSet::from([Role::OrgUser]),
    );
    let user_id = cmd.user_id;
    s.users.create_user(cmd).await.unwrap();

    s.provider
        .create_subject(
            user_id,
            SubjectAttributes {
                organization_id: Some(organization_id),
                roles: RoleSet::from([Role::OrgUser]),
                display_name: Some("Ada".to_string()),
                email: Some("ada@example.com".to_string()),
            },
        )
        .await
        .unwrap();
    s.processor.run_catch_up().await.unwrap();
    user_id
}

/// The most recent event in the log, decrypted.
async fn last_event(s: &Setup) -> EventEnvelope {
    let events = s.store.read_all_from(Position::start()).await.unwrap();
    let last = events.last().cloned().unwrap();
    s.codec.decrypt_fields(last).await.unwrap().into_envelope()
}

/// Lets the view catch up after `delay`.
fn catch_up_after(s: &Setup, delay: Duration) -> tokio::task::JoinHandle<()> {
    let processor = Arc::clone(&s.processor);
    tokio::spawn(async move {
        sleep(delay).await;
        processor.run_catch_up().await.unwrap();
    })
}

fn updates(calls: &[IdentityCall]) -> usize {
    calls
        .iter()
        .filter(|c| matches!(c, IdentityCall::Update(..)))
        .count()
}

mod convergence {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn roles_are_mirrored_once_the_view_converges() {
        let s = setup();
        let user_id = synchronized_user(&s).await;
        let admin = RoleSet::from([Role::OrgAdmin]);

        s.users
            .update_user_roles(UpdateUserRoles::new(user_id, AggregateId::new(), admin.clone()))
            .await
            .unwrap();
        let trigger = last_event(&s).await;
        let lagging = catch_up_after(&s, Duration::from_millis(500));

        let outcome = s.saga.handle(&trigger).await.unwrap();
        lagging.await.unwrap();

        assert_eq!(outcome, Some(SagaOutcome::Synchronized));
        let subject = s.provider.subject(user_id).await.unwrap();
        assert_eq!(subject.roles, admin);
        assert_eq!(subject.display_name.as_deref(), Some("Ada"));
        assert_eq!(updates(&s.provider.calls().await), 1);
        assert_eq!(s.saga.registry().in_flight_count().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn details_update_carries_the_new_email() {
        let s = setup();
        let user_id = synchronized_user(&s).await;

        s.users
            .update_user_details(UpdateUserDetails::new(
                user_id,
                AggregateId::new(),
                Some("ada@lovelace.test".to_string()),
                None,
            ))
            .await
            .unwrap();
        let trigger = last_event(&s).await;
        s.processor.run_catch_up().await.unwrap();

        let outcome = s.saga.handle(&trigger).await.unwrap();

        assert_eq!(outcome, Some(SagaOutcome::Synchronized));
        let subject = s.provider.subject(user_id).await.unwrap();
        assert_eq!(subject.email.as_deref(), Some("ada@lovelace.test"));
        assert_eq!(subject.roles, RoleSet::from([Role::OrgUser]));
    }

    #[tokio::test(start_paused = true)]
    async fn forgotten_user_is_deleted_from_identity_provider() {
        let s = setup();
        let user_id = synchronized_user(&s).await;

        s.users
            .delete_and_forget_user(DeleteAndForgetUser::new(
                user_id,
                AggregateId::new(),
                "account closed",
            ))
            .await
            .unwrap();
        let trigger = last_event(&s).await;
        let lagging = catch_up_after(&s, Duration::from_secs(3));

        let outcome = s.saga.handle(&trigger).await.unwrap();
        lagging.await.unwrap();

        assert_eq!(outcome, Some(SagaOutcome::Synchronized));
        assert!(s.provider.subject(user_id).await.is_none());
        assert_eq!(
            s.provider.calls().await.last(),
            Some(&IdentityCall::Delete(user_id))
        );
        assert!(!s.users_view.exists(user_id).await);
    }

    #[tokio::test(start_paused = true)]
    async fn user_creation_does_not_start_an_instance() {
        let s = setup();
        let user_id = synchronized_user(&s).await;
        let created = last_event(&s).await;

        assert_eq!(s.saga.handle(&created).await.unwrap(), None);
        assert!(s.saga.instances_for_user(user_id).await.unwrap().is_empty());
    }
}

mod failures {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn view_that_never_converges_times_out_without_a_call() {
        let s = setup();
        let user_id = synchronized_user(&s).await;

        s.users
            .update_user_roles(UpdateUserRoles::new(
                user_id,
                AggregateId::new(),
                RoleSet::from([Role::Admin]),
            ))
            .await
            .unwrap();
        let trigger = last_event(&s).await;

        let started = Instant::now();
        let outcome = s.saga.handle(&trigger).await.unwrap();

        assert_eq!(outcome, Some(SagaOutcome::ConvergenceTimedOut));
        assert!(started.elapsed() >= Duration::from_secs(60));
        assert_eq!(updates(&s.provider.calls().await), 0);
        assert_eq!(
            s.provider.subject(user_id).await.unwrap().roles,
            RoleSet::from([Role::OrgUser])
        );

        let instances = s.saga.instances_for_user(user_id).await.unwrap();
        assert_eq!(instances.len(), 1);
        assert_eq!(instances[0].state(), SagaState::Ended);
        assert!(instances[0].external_calls().is_empty());
        assert!(
            instances[0]
                .failure_reason()
                .unwrap()
                .contains("user roles projection update")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn failed_external_call_is_not_retried() {
        let s = setup();
        let user_id = synchronized_user(&s).await;
        s.provider.set_fail_calls(true).await;

        s.users
            .update_user_roles(UpdateUserRoles::new(
                user_id,
                AggregateId::new(),
                RoleSet::from([Role::OrgAdmin]),
            ))
            .await
            .unwrap();
        let trigger = last_event(&s).await;
        s.processor.run_catch_up().await.unwrap();

        let outcome = s.saga.handle(&trigger).await.unwrap();

        assert_eq!(outcome, Some(SagaOutcome::ExternalCallFailed));
        assert_eq!(updates(&s.provider.calls().await), 1);

        let instances = s.saga.instances_for_user(user_id).await.unwrap();
        let instance = &instances[0];
        assert_eq!(instance.external_calls(), ["update_subject_attributes"]);
        assert_eq!(instance.outcome(), Some(SagaOutcome::ExternalCallFailed));
        assert!(instance.failure_reason().unwrap().contains("offline"));
    }
}

mod correlation {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn redelivered_trigger_is_ignored_and_other_triggers_are_rejected() {
        let s = setup();
        let user_id = synchronized_user(&s).await;

        s.users
            .update_user_roles(UpdateUserRoles::new(
                user_id,
                AggregateId::new(),
                RoleSet::from([Role::OrgAdmin]),
            ))
            .await
            .unwrap();
        let first = last_event(&s).await;

        let saga = Arc::clone(&s.saga);
        let trigger = first.clone();
        let running = tokio::spawn(async move { saga.handle(&trigger).await });
        sleep(Duration::from_millis(10)).await;
        assert_eq!(
            s.saga.registry().state(user_id).await,
            Some(SagaState::WaitingForConvergence)
        );

        assert_eq!(s.saga.handle(&first).await.unwrap(), None);

        s.users
            .update_user_details(UpdateUserDetails::new(
                user_id,
                AggregateId::new(),
                None,
                Some("Countess".to_string()),
            ))
            .await
            .unwrap();
        let second = last_event(&s).await;
        let rejected = s.saga.handle(&second).await.unwrap_err();
        assert!(rejected.is_in_flight());

        s.processor.run_catch_up().await.unwrap();
        let outcome = running.await.unwrap().unwrap();

        assert_eq!(outcome, Some(SagaOutcome::Synchronized));
        assert_eq!(s.saga.instances_for_user(user_id).await.unwrap().len(), 1);
        assert_eq!(s.saga.registry().state(user_id).await, None);
    }
}

#[tokio::test(start_paused = true)]
async fn runner_synchronizes_appended_triggers() {
    let s = setup();
    let user_id = synchronized_user(&s).await;
    let head = s.store.head_position().await.unwrap();

    let runner = SagaRunner::new(s.store.clone(), s.codec.clone(), Arc::clone(&s.saga));
    let task = tokio::spawn(async move { runner.run_from(head).await });

    s.users
        .update_user_roles(UpdateUserRoles::new(
            user_id,
            AggregateId::new(),
            RoleSet::from([Role::Admin]),
        ))
        .await
        .unwrap();
    s.processor.run_catch_up().await.unwrap();

    for _ in 0..100 {
        if updates(&s.provider.calls().await) > 0 {
            break;
        }
        sleep(Duration::from_millis(100)).await;
    }

    assert_eq!(
        s.provider.subject(user_id).await.unwrap().roles,
        RoleSet::from([Role::Admin])
    );
    task.abort();
}
