//! Integration tests: services → event log → ProjectionProcessor → views.

use std::sync::Arc;

use common::{AggregateId, Role, RoleSet};
use crypto::{CryptoShreddingCodec, InMemoryKeyStore};
use domain::{
    CompetitionService, CreateCompetition, CreateOrganization, CreateUser, DeleteAndForgetUser,
    DeregisterOrganization, EnterPhoto, OrganizationService, OrganizationStatus,
    OrganizationStatusLookup, PhotoId, UpdateUserDetails, UpdateUserRoles, UserEmailLookup,
    UserService,
};
use event_store::InMemoryEventStore;
use projections::{CompetitionEntriesView, OrganizationsView, ProjectionProcessor, UsersView};

struct Setup {
    organizations: OrganizationService<InMemoryEventStore>,
    users: UserService<InMemoryEventStore>,
    competitions: CompetitionService<InMemoryEventStore>,
    processor: ProjectionProcessor<InMemoryEventStore>,
    organizations_view: OrganizationsView,
    users_view: UsersView,
    entries_view: CompetitionEntriesView,
}

fn setup() -> Setup {
    let store = InMemoryEventStore::new();
    let codec = CryptoShreddingCodec::new(Arc::new(InMemoryKeyStore::new()));

    let organizations_view = OrganizationsView::new();
    let users_view = UsersView::new();
    let entries_view = CompetitionEntriesView::new();

    let mut processor = ProjectionProcessor::new(store.clone(), codec.clone());
    processor.register(Box::new(organizations_view.clone()));
    processor.register(Box::new(users_view.clone()));
    processor.register(Box::new(entries_view.clone()));

    Setup {
        organizations: OrganizationService::new(store.clone(), codec.clone()),
        users: UserService::new(store.clone(), codec.clone()),
        competitions: CompetitionService::new(store, codec),
        processor,
        organizations_view,
        users_view,
        entries_view,
    }
}

async fn create_user(s: &Setup, organization_id: AggregateId, email: &str) -> AggregateId {
    let cmd = CreateUser::new(
        organization_id,
        AggregateId::new(),
        email,
        "Ada",
        RoleSet::from([Role::OrgUser]),
    );
    let user_id = cmd.user_id;
    s.users.create_user(cmd).await.unwrap();
    user_id
}

#[tokio::test]
async fn views_lag_until_catch_up() {
    let s = setup();
    let cmd = CreateOrganization::new(AggregateId::new(), "Acme", None);
    let organization_id = cmd.organization_id;
    s.organizations.create_organization(cmd).await.unwrap();

    assert!(!s.organizations_view.exists(organization_id).await);

    s.processor.run_catch_up().await.unwrap();
    assert_eq!(
        s.organizations_view
            .organization_status(organization_id)
            .await,
        Some(OrganizationStatus::Registered)
    );
}

#[tokio::test]
async fn deregistration_reaches_status_lookup() {
    let s = setup();
    let cmd = CreateOrganization::new(AggregateId::new(), "Acme", None);
    let organization_id = cmd.organization_id;
    s.organizations.create_organization(cmd).await.unwrap();
    s.organizations
        .deregister_organization(DeregisterOrganization::new(
            organization_id,
            AggregateId::new(),
        ))
        .await
        .unwrap();

    s.processor.run_catch_up().await.unwrap();

    assert_eq!(
        s.organizations_view
            .organization_status(organization_id)
            .await,
        Some(OrganizationStatus::Deregistered)
    );
}

#[tokio::test]
async fn users_view_sees_decrypted_personal_data() {
    let s = setup();
    let organization_id = AggregateId::new();
    let user_id = create_user(&s, organization_id, "ada@example.com").await;
    s.users
        .update_user_details(UpdateUserDetails::new(
            user_id,
            user_id,
            None,
            Some("Ada Lovelace".to_string()),
        ))
        .await
        .unwrap();
    s.users
        .update_user_roles(UpdateUserRoles::new(
            user_id,
            AggregateId::new(),
            RoleSet::from([Role::OrgAdmin]),
        ))
        .await
        .unwrap();

    s.processor.run_catch_up().await.unwrap();

    let user = s.users_view.get(user_id).await.unwrap();
    assert_eq!(user.email.as_deref(), Some("ada@example.com"));
    assert_eq!(user.display_name.as_deref(), Some("Ada Lovelace"));
    assert_eq!(user.roles, RoleSet::from([Role::OrgAdmin]));
    assert_eq!(
        s.users_view.user_with_email("Ada@Example.com").await,
        Some(user_id)
    );
    assert_eq!(
        s.users_view.users_in_organization(organization_id).await.len(),
        1
    );
}

#[tokio::test]
async fn forgetting_a_submitter_redacts_entries_live_and_on_rebuild() {
    let s = setup();
    let submitter = create_user(&s, AggregateId::new(), "ada@example.com").await;

    let create = CreateCompetition::new(AggregateId::new(), "Harbour at night");
    let competition_id = create.competition_id;
    s.competitions.create_competition(create).await.unwrap();
    s.competitions
        .enter_photo(EnterPhoto::new(
            competition_id,
            PhotoId::new(),
            submitter,
            Some("Shot from the north pier".to_string()),
        ))
        .await
        .unwrap();

    s.processor.run_catch_up().await.unwrap();
    assert_eq!(
        s.entries_view.entries(competition_id).await[0]
            .submission_notes
            .as_deref(),
        Some("Shot from the north pier")
    );

    s.users
        .delete_and_forget_user(DeleteAndForgetUser::new(
            submitter,
            AggregateId::new(),
            "erasure request",
        ))
        .await
        .unwrap();
    s.processor.run_catch_up().await.unwrap();

    let live = s.entries_view.entries(competition_id).await;
    assert_eq!(live.len(), 1);
    assert!(live[0].submission_notes.is_none());
    assert!(!s.users_view.exists(submitter).await);

    s.processor.rebuild_all().await.unwrap();

    let rebuilt = s.entries_view.entries(competition_id).await;
    assert_eq!(rebuilt.len(), 1);
    assert_eq!(rebuilt[0].submitted_by, submitter);
    assert!(rebuilt[0].submission_notes.is_none());
    assert!(!s.users_view.has_user_with_email("ada@example.com").await);
}

#[tokio::test]
async fn rebuild_reproduces_the_same_views() {
    let s = setup();
    let cmd = CreateOrganization::new(AggregateId::new(), "Acme", None);
    let organization_id = cmd.organization_id;
    s.organizations.create_organization(cmd).await.unwrap();
    let user_id = create_user(&s, organization_id, "grace@example.com").await;

    s.processor.run_catch_up().await.unwrap();
    let before = s.users_view.get(user_id).await;

    let replayed = s.processor.rebuild_all().await.unwrap();

    assert_eq!(replayed, 2);
    assert_eq!(s.users_view.get(user_id).await, before);
    assert!(s.organizations_view.exists(organization_id).await);
}
