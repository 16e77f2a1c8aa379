//! Process wiring for the identity platform.
//!
//! [`App`] connects the validated command path, the read-side views, the
//! projection subscription and the identity synchronization saga over one
//! event store. The binary adds configuration, structured logging and a
//! Prometheus exporter.

pub mod config;
pub mod error;
pub mod telemetry;

use std::sync::Arc;

use crypto::{CryptoShreddingCodec, KeyStore};
use domain::{
    CommandGateway, CommandResult, CommandValidator, CreateUser, DomainError,
    EmailAddressValidator, OrganizationStatusValidator, UniqueEmailValidator, User,
    ValidatorRegistry,
};
use event_store::EventStore;
use projections::{
    CompetitionEntriesView, OrganizationsView, ProjectionError, ProjectionProcessor, UsersView,
};
use saga::{IdentityProvider, IdentitySynchronizationSaga, SagaError, SagaRunner, SubjectAttributes};
use tokio::task::JoinHandle;

pub use config::{Config, LogFormat};
pub use error::{Result, RuntimeError};

/// Background tasks started by [`App::start`].
pub struct Workers {
    projections: JoinHandle<std::result::Result<(), ProjectionError>>,
    saga: JoinHandle<std::result::Result<(), SagaError>>,
}

impl Workers {
    /// Stops both subscriptions. Running saga instances are dropped.
    pub fn shutdown(self) {
        self.projections.abort();
        self.saga.abort();
        tracing::info!("workers stopped");
    }
}

/// All components sharing one event store and key store.
pub struct App<S: EventStore + Clone + 'static> {
    store: S,
    gateway: CommandGateway<S>,
    organizations: OrganizationsView,
    users: UsersView,
    competition_entries: CompetitionEntriesView,
    processor: Arc<ProjectionProcessor<S>>,
    runner: Arc<SagaRunner<S>>,
    saga: Arc<IdentitySynchronizationSaga<S>>,
    provider: Arc<dyn IdentityProvider>,
}

impl<S: EventStore + Clone + 'static> App<S> {
    /// Wires the gateway to validators backed by the views, and the saga to
    /// the users view.
    pub fn new(
        store: S,
        keys: Arc<dyn KeyStore>,
        provider: Arc<dyn IdentityProvider>,
        config: &Config,
    ) -> Result<Self> {
        let codec = CryptoShreddingCodec::new(keys);

        let organizations = OrganizationsView::new();
        let users = UsersView::new();
        let competition_entries = CompetitionEntriesView::new();

        let registry = ValidatorRegistry::builder()
            .register(EmailAddressValidator)
            .register(UniqueEmailValidator::new(Arc::new(users.clone())))
            .register(OrganizationStatusValidator::new(Arc::new(
                organizations.clone(),
            )))
            .build()?;
        let gateway = CommandGateway::new(
            store.clone(),
            codec.clone(),
            CommandValidator::new(registry),
        )
        .with_snapshot_interval(config.snapshot_interval);

        let mut processor = ProjectionProcessor::new(store.clone(), codec.clone());
        processor.register(Box::new(organizations.clone()));
        processor.register(Box::new(users.clone()));
        processor.register(Box::new(competition_entries.clone()));

        let saga = Arc::new(
            IdentitySynchronizationSaga::new(store.clone(), users.clone(), Arc::clone(&provider))
                .with_waiter(config.waiter()),
        );
        let runner = SagaRunner::new(store.clone(), codec, Arc::clone(&saga));

        Ok(Self {
            store,
            gateway,
            organizations,
            users,
            competition_entries,
            processor: Arc::new(processor),
            runner: Arc::new(runner),
            saga,
            provider,
        })
    }

    /// Brings the views up to date, then follows the log.
    ///
    /// The saga only sees events appended after this call: triggers already
    /// in the log are not synchronized again.
    pub async fn start(&self) -> Result<Workers> {
        let replayed = self.processor.run_catch_up().await?;
        let head = self.store.head_position().await?;
        tracing::info!(replayed, %head, "starting workers");

        let processor = Arc::clone(&self.processor);
        let projections = tokio::spawn(async move { processor.run().await });

        let runner = Arc::clone(&self.runner);
        let saga = tokio::spawn(async move { runner.run_from(head).await });

        Ok(Workers { projections, saga })
    }

    /// Onboards a user: creates the identity subject, then sends
    /// `CreateUser` through the gateway.
    ///
    /// A failing identity provider is logged and does not stop the command.
    /// The subject is created before validation runs, so a rejected command
    /// can leave a subject behind.
    #[tracing::instrument(skip(self, cmd), fields(user_id = %cmd.user_id))]
    pub async fn register_user(
        &self,
        cmd: CreateUser,
    ) -> std::result::Result<CommandResult<User>, DomainError> {
        let attributes = SubjectAttributes {
            organization_id: Some(cmd.organization_id),
            roles: cmd.roles.clone(),
            display_name: Some(cmd.display_name.clone()),
            email: Some(cmd.email.clone()),
        };

        match self.provider.create_subject(cmd.user_id, attributes).await {
            Ok(external_id) => tracing::debug!(%external_id, "identity subject created"),
            Err(e) => {
                metrics::counter!("identity_subject_create_failed").increment(1);
                tracing::warn!(error = %e, "identity subject not created, continuing");
            }
        }

        self.gateway.send(cmd).await
    }

    pub fn gateway(&self) -> &CommandGateway<S> {
        &self.gateway
    }

    pub fn organizations(&self) -> &OrganizationsView {
        &self.organizations
    }

    pub fn users(&self) -> &UsersView {
        &self.users
    }

    pub fn competition_entries(&self) -> &CompetitionEntriesView {
        &self.competition_entries
    }

    pub fn processor(&self) -> &ProjectionProcessor<S> {
        &self.processor
    }

    pub fn saga(&self) -> &IdentitySynchronizationSaga<S> {
        &self.saga
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}
