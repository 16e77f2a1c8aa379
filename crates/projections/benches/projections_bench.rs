use std::sync::Arc;

use common::{AggregateId, Role, RoleSet};
use criterion::{Criterion, criterion_group, criterion_main};
use crypto::{CryptoShreddingCodec, InMemoryKeyStore};
use domain::{CreateUser, UpdateUserRoles, UserService};
use event_store::InMemoryEventStore;
use projections::{Projection, ProjectionProcessor, UsersView};

/// Populates a store with N users, each with an encrypted creation event and
/// a roles update.
async fn populate_store(store: &InMemoryEventStore, codec: &CryptoShreddingCodec, n: usize) {
    let service = UserService::new(store.clone(), codec.clone());
    for i in 0..n {
        let cmd = CreateUser::new(
            AggregateId::new(),
            AggregateId::new(),
            format!("user{i}@example.com"),
            format!("User {i}"),
            RoleSet::from([Role::OrgUser]),
        );
        let user_id = cmd.user_id;
        service.create_user(cmd).await.unwrap();
        service
            .update_user_roles(UpdateUserRoles::new(
                user_id,
                AggregateId::new(),
                RoleSet::from([Role::OrgAdmin]),
            ))
            .await
            .unwrap();
    }
}

fn bench_catch_up(c: &mut Criterion, users: usize) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryEventStore::new();
    let codec = CryptoShreddingCodec::new(Arc::new(InMemoryKeyStore::new()));
    rt.block_on(populate_store(&store, &codec, users));

    c.bench_function(&format!("projections/catch_up_{}_events", users * 2), |b| {
        b.iter(|| {
            rt.block_on(async {
                let view = UsersView::new();
                let mut processor = ProjectionProcessor::new(store.clone(), codec.clone());
                processor.register(Box::new(view.clone()) as Box<dyn Projection>);
                processor.run_catch_up().await.unwrap();
            });
        });
    });
}

fn bench_catch_up_100_users(c: &mut Criterion) {
    bench_catch_up(c, 100);
}

fn bench_catch_up_1000_users(c: &mut Criterion) {
    bench_catch_up(c, 1000);
}

criterion_group!(benches, bench_catch_up_100_users, bench_catch_up_1000_users);
criterion_main!(benches);
