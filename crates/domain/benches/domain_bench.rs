use std::sync::Arc;

use common::{AggregateId, Role, RoleSet};
use criterion::{Criterion, criterion_group, criterion_main};
use crypto::{CryptoShreddingCodec, InMemoryKeyStore};
use domain::{
    CommandGateway, CommandValidator, CompetitionService, CreateCompetition, CreateUser,
    EmailAddressValidator, EnterPhoto, OrganizationStatus, OrganizationStatusLookup,
    OrganizationStatusValidator, PhotoId, UniqueEmailValidator, UserEmailLookup, UserService,
    ValidatorRegistry,
};
use event_store::InMemoryEventStore;

/// Every organization is registered and every email is free.
struct OpenReadSide;

#[async_trait::async_trait]
impl OrganizationStatusLookup for OpenReadSide {
    async fn organization_status(&self, _id: AggregateId) -> Option<OrganizationStatus> {
        Some(OrganizationStatus::Registered)
    }
}

#[async_trait::async_trait]
impl UserEmailLookup for OpenReadSide {
    async fn user_with_email(&self, _email: &str) -> Option<AggregateId> {
        None
    }
}

fn codec() -> CryptoShreddingCodec {
    CryptoShreddingCodec::new(Arc::new(InMemoryKeyStore::new()))
}

fn create_user_cmd() -> CreateUser {
    CreateUser::new(
        AggregateId::new(),
        AggregateId::new(),
        "bench@example.com",
        "Bench User",
        RoleSet::from([Role::OrgUser]),
    )
}

fn bench_create_user(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("domain/create_user_encrypted", |b| {
        b.iter(|| {
            rt.block_on(async {
                let service = UserService::new(InMemoryEventStore::new(), codec());
                service.create_user(create_user_cmd()).await.unwrap();
            });
        });
    });
}

fn bench_gateway_send(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let registry = ValidatorRegistry::builder()
        .register(EmailAddressValidator)
        .register(UniqueEmailValidator::new(Arc::new(OpenReadSide)))
        .register(OrganizationStatusValidator::new(Arc::new(OpenReadSide)))
        .build()
        .unwrap();
    let gateway = CommandGateway::new(
        InMemoryEventStore::new(),
        codec(),
        CommandValidator::new(registry),
    );

    c.bench_function("domain/gateway_validate_and_create_user", |b| {
        b.iter(|| {
            rt.block_on(async {
                gateway.send(create_user_cmd()).await.unwrap();
            });
        });
    });
}

fn bench_competition_reconstruction(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    // No snapshots, so every load replays and decrypts the whole history.
    let service =
        CompetitionService::new(InMemoryEventStore::new(), codec()).with_snapshot_interval(10_000);

    let create = CreateCompetition::new(AggregateId::new(), "Benchmark light");
    let competition_id = create.competition_id;
    rt.block_on(async {
        service.create_competition(create).await.unwrap();
        for n in 0..50 {
            service
                .enter_photo(EnterPhoto::new(
                    competition_id,
                    PhotoId::new(),
                    AggregateId::new(),
                    Some(format!("Entry {n}")),
                ))
                .await
                .unwrap();
        }
    });

    c.bench_function("domain/reconstruct_50_encrypted_entries", |b| {
        b.iter(|| {
            rt.block_on(async {
                service.get_competition(competition_id).await.unwrap();
            });
        });
    });
}

criterion_group!(
    benches,
    bench_create_user,
    bench_gateway_send,
    bench_competition_reconstruction,
);
criterion_main!(benches);
