//! Command handling infrastructure.

use std::marker::PhantomData;

use common::AggregateId;
use crypto::{CryptoShreddingCodec, Decryption};
use event_store::{AppendOptions, EventEnvelope, EventStore, EventStoreExt, Snapshot, Version};
use serde::Serialize;

use crate::aggregate::{Aggregate, DomainEvent, SnapshotCapable};
use crate::error::DomainError;

/// Result of command execution.
#[derive(Debug)]
pub struct CommandResult<A: Aggregate> {
    /// The aggregate after applying the new events.
    pub aggregate: A,

    /// The events that were generated and persisted.
    pub events: Vec<A::Event>,

    /// The new version of the aggregate after the command.
    pub new_version: Version,
}

/// Trait for commands that can be executed against an aggregate.
///
/// Commands represent an intention to perform an action. They may be rejected
/// if the aggregate's current state doesn't allow the action.
pub trait Command: Send + Sync {
    /// The type of aggregate this command targets.
    type Aggregate: Aggregate;

    /// Returns the ID of the aggregate this command targets.
    fn aggregate_id(&self) -> AggregateId;
}

/// Handler for executing commands against aggregates.
///
/// The handler is responsible for:
/// 1. Loading the aggregate from the event store (with optional snapshot)
///    and decrypting any encrypted event fields
/// 2. Executing the command to produce events
/// 3. Encrypting designated fields and persisting the events
/// 4. Optionally saving a snapshot
///
/// Handlers only append. They never read or write projections.
pub struct CommandHandler<S, A>
where
    S: EventStore,
    A: Aggregate,
{
    store: S,
    codec: CryptoShreddingCodec,
    snapshot_interval: Option<usize>,
    _phantom: PhantomData<A>,
}

impl<S, A> CommandHandler<S, A>
where
    S: EventStore,
    A: Aggregate,
{
    /// Creates a new command handler with the given event store and codec.
    pub fn new(store: S, codec: CryptoShreddingCodec) -> Self {
        Self {
            store,
            codec,
            snapshot_interval: None,
            _phantom: PhantomData,
        }
    }

    /// Overrides the aggregate's default snapshot interval.
    pub fn with_snapshot_interval(mut self, interval: usize) -> Self {
        self.snapshot_interval = Some(interval);
        self
    }

    /// Returns a reference to the underlying event store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns the codec used for encrypted event fields.
    pub fn codec(&self) -> &CryptoShreddingCodec {
        &self.codec
    }

    /// Loads an aggregate from the event store.
    ///
    /// If the aggregate doesn't exist, returns a default instance.
    pub async fn load(&self, aggregate_id: AggregateId) -> Result<A, DomainError>
    where
        A: for<'de> serde::Deserialize<'de>,
        A::Event: for<'de> serde::Deserialize<'de>,
    {
        let (snapshot, events) = self.store.load_aggregate(aggregate_id).await?;

        let mut aggregate = if let Some(snapshot) = snapshot {
            self.restore_from_snapshot(snapshot)?
        } else {
            A::default()
        };

        // Apply events after snapshot
        for envelope in events {
            let envelope = match self.codec.decrypt_fields(envelope).await? {
                Decryption::Redacted { envelope, fields } => {
                    tracing::debug!(
                        event_id = %envelope.event_id,
                        ?fields,
                        "replaying event with redacted fields"
                    );
                    envelope
                }
                other => other.into_envelope(),
            };
            let version = envelope.version;
            let event: A::Event = serde_json::from_value(envelope.payload)?;
            aggregate.apply(event);
            aggregate.set_version(version);
        }

        Ok(aggregate)
    }

    /// Loads an aggregate, returning None if it doesn't exist.
    pub async fn load_existing(&self, aggregate_id: AggregateId) -> Result<Option<A>, DomainError>
    where
        A: for<'de> serde::Deserialize<'de>,
        A::Event: for<'de> serde::Deserialize<'de>,
    {
        let aggregate = self.load(aggregate_id).await?;
        if aggregate.id().is_some() {
            Ok(Some(aggregate))
        } else {
            Ok(None)
        }
    }

    /// Executes a command and persists the resulting events.
    ///
    /// The command function receives the current aggregate state and returns
    /// either a list of events to apply, or an error.
    pub async fn execute<F>(
        &self,
        aggregate_id: AggregateId,
        command_fn: F,
    ) -> Result<CommandResult<A>, DomainError>
    where
        A: for<'de> serde::Deserialize<'de>,
        A::Event: for<'de> serde::Deserialize<'de> + Serialize,
        F: FnOnce(&A) -> Result<Vec<A::Event>, A::Error>,
        DomainError: From<A::Error>,
    {
        let mut aggregate = self.load(aggregate_id).await?;
        let current_version = aggregate.version();

        // Execute command to get events
        let events = command_fn(&aggregate)?;

        if events.is_empty() {
            return Ok(CommandResult {
                aggregate,
                events: vec![],
                new_version: current_version,
            });
        }

        // Build envelopes for persistence
        let envelopes = self
            .build_envelopes(aggregate_id, current_version, &events)
            .await?;

        // Persist events with optimistic concurrency
        let options = if current_version == Version::initial() {
            AppendOptions::expect_new()
        } else {
            AppendOptions::expect_version(current_version)
        };

        let new_version = self.store.append(envelopes, options).await?;

        // Apply events to aggregate
        for event in &events {
            aggregate.apply(event.clone());
        }
        aggregate.set_version(new_version);

        Ok(CommandResult {
            aggregate,
            events,
            new_version,
        })
    }

    /// Builds event envelopes from domain events, encrypting personal data.
    async fn build_envelopes(
        &self,
        aggregate_id: AggregateId,
        current_version: Version,
        events: &[A::Event],
    ) -> Result<Vec<EventEnvelope>, DomainError>
    where
        A::Event: Serialize,
    {
        let mut envelopes = Vec::with_capacity(events.len());
        let mut version = current_version;

        for event in events {
            version = version.next();
            let mut envelope = EventEnvelope::builder()
                .aggregate_id(aggregate_id)
                .aggregate_type(A::aggregate_type())
                .event_type(event.event_type())
                .revision(event.revision())
                .version(version)
                .payload(event)?
                .build();
            if let Some(spec) = event.encryption() {
                envelope = self.codec.encrypt_fields(envelope, &spec).await?;
            }
            envelopes.push(envelope);
        }

        Ok(envelopes)
    }

    fn restore_from_snapshot(&self, snapshot: Snapshot) -> Result<A, DomainError>
    where
        A: for<'de> serde::Deserialize<'de>,
    {
        Ok(snapshot.restore::<A>()?)
    }
}

impl<S, A> CommandHandler<S, A>
where
    S: EventStore,
    A: SnapshotCapable,
{
    /// Executes a command and optionally saves a snapshot.
    pub async fn execute_with_snapshot<F>(
        &self,
        aggregate_id: AggregateId,
        command_fn: F,
    ) -> Result<CommandResult<A>, DomainError>
    where
        A: for<'de> serde::Deserialize<'de>,
        A::Event: for<'de> serde::Deserialize<'de> + Serialize,
        F: FnOnce(&A) -> Result<Vec<A::Event>, A::Error>,
        DomainError: From<A::Error>,
    {
        let result = self.execute(aggregate_id, command_fn).await?;

        // Save snapshot if needed
        let interval = self.snapshot_interval.unwrap_or_else(A::snapshot_interval);
        if result.aggregate.should_snapshot_every(interval) {
            let snapshot = Snapshot::capture(
                aggregate_id,
                A::aggregate_type(),
                result.new_version,
                &result.aggregate,
            )?;
            self.store.save_snapshot(snapshot).await?;
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crypto::{FieldEncryption, InMemoryKeyStore, KeyStore};
    use event_store::InMemoryEventStore;
    use serde::{Deserialize, Serialize};

    fn handler(store: InMemoryEventStore) -> CommandHandler<InMemoryEventStore, TestAggregate> {
        CommandHandler::new(store, CryptoShreddingCodec::new(Arc::new(InMemoryKeyStore::new())))
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    enum TestEvent {
        Created { name: String },
        Updated { value: i32 },
        Commented {
            author: AggregateId,
            comment: Option<String>,
        },
    }

    impl DomainEvent for TestEvent {
        fn event_type(&self) -> &'static str {
            match self {
                TestEvent::Created { .. } => "TestCreated",
                TestEvent::Updated { .. } => "TestUpdated",
                TestEvent::Commented { .. } => "TestCommented",
            }
        }

        fn encryption(&self) -> Option<FieldEncryption> {
            match self {
                TestEvent::Commented { .. } => {
                    Some(FieldEncryption::new("author", ["comment"]))
                }
                _ => None,
            }
        }
    }

    #[derive(Debug, Default, Clone, Serialize, Deserialize)]
    struct TestAggregate {
        id: Option<AggregateId>,
        name: String,
        value: i32,
        comments: Vec<Option<String>>,
        version: Version,
    }

    #[derive(Debug, thiserror::Error)]
    enum TestError {
        #[error("not initialized")]
        NotInitialized,
        #[error("invalid value: {0}")]
        InvalidValue(i32),
    }

    impl Aggregate for TestAggregate {
        type Event = TestEvent;
        type Error = TestError;

        fn aggregate_type() -> &'static str {
            "TestAggregate"
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
                TestEvent::Created { name } => {
                    if self.id.is_none() {
                        self.id = Some(AggregateId::new());
                    }
                    self.name = name;
                }
                TestEvent::Updated { value } => {
                    self.value = value;
                }
                TestEvent::Commented { comment, .. } => {
                    self.comments.push(comment);
                }
            }
        }
    }

    impl From<TestError> for DomainError {
        fn from(e: TestError) -> Self {
            DomainError::AggregateNotFound {
                aggregate_type: "TestAggregate",
                aggregate_id: format!("{:?}", e),
            }
        }
    }

    #[tokio::test]
    async fn test_execute_creates_aggregate() {
        let store = InMemoryEventStore::new();
        let handler = handler(store);
        let aggregate_id = AggregateId::new();

        let result = handler
            .execute(aggregate_id, |_agg| {
                Ok(vec![TestEvent::Created {
                    name: "Test".to_string(),
                }])
            })
            .await
            .unwrap();

        assert_eq!(result.events.len(), 1);
        assert_eq!(result.new_version, Version::first());
        assert!(result.aggregate.id().is_some());
        assert_eq!(result.aggregate.name, "Test");
    }

    #[tokio::test]
    async fn test_execute_updates_aggregate() {
        let store = InMemoryEventStore::new();
        let handler = handler(store);
        let aggregate_id = AggregateId::new();

        // Create
        handler
            .execute(aggregate_id, |_| {
                Ok(vec![TestEvent::Created {
                    name: "Test".to_string(),
                }])
            })
            .await
            .unwrap();

        // Update
        let result = handler
            .execute(aggregate_id, |_| Ok(vec![TestEvent::Updated { value: 42 }]))
            .await
            .unwrap();

        assert_eq!(result.events.len(), 1);
        assert_eq!(result.new_version, Version::new(2));
        assert_eq!(result.aggregate.value, 42);
    }

    #[tokio::test]
    async fn test_execute_returns_error_on_invalid_command() {
        let store = InMemoryEventStore::new();
        let handler = handler(store);
        let aggregate_id = AggregateId::new();

        let result = handler
            .execute(aggregate_id, |_| Err(TestError::InvalidValue(-1)))
            .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_load_existing_returns_none_for_new() {
        let store = InMemoryEventStore::new();
        let handler = handler(store);
        let aggregate_id = AggregateId::new();

        let result = handler.load_existing(aggregate_id).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_load_existing_returns_some_for_existing() {
        let store = InMemoryEventStore::new();
        let handler = handler(store);
        let aggregate_id = AggregateId::new();

        // Create aggregate
        handler
            .execute(aggregate_id, |_| {
                Ok(vec![TestEvent::Created {
                    name: "Test".to_string(),
                }])
            })
            .await
            .unwrap();

        let result = handler.load_existing(aggregate_id).await.unwrap();
        assert!(result.is_some());
        assert_eq!(result.unwrap().name, "Test");
    }

    #[tokio::test]
    async fn test_empty_events_returns_without_persisting() {
        let store = InMemoryEventStore::new();
        let handler = handler(store.clone());
        let aggregate_id = AggregateId::new();

        let result = handler.execute(aggregate_id, |_| Ok(vec![])).await.unwrap();

        assert!(result.events.is_empty());
        assert_eq!(result.new_version, Version::initial());
        assert_eq!(store.event_count().await, 0);
    }

    #[tokio::test]
    async fn test_encrypted_fields_are_stored_as_ciphertext() {
        let store = InMemoryEventStore::new();
        let handler = handler(store.clone());
        let aggregate_id = AggregateId::new();
        let author = AggregateId::new();

        handler
            .execute(aggregate_id, |_| {
                Ok(vec![
                    TestEvent::Created {
                        name: "Test".to_string(),
                    },
                    TestEvent::Commented {
                        author,
                        comment: Some("secret".to_string()),
                    },
                ])
            })
            .await
            .unwrap();

        let stored = store.get_events_for_aggregate(aggregate_id).await.unwrap();
        let raw = stored[1].payload.to_string();
        assert!(!raw.contains("secret"));
        assert!(handler.codec().key_store().has_key(author).await.unwrap());

        let loaded = handler.load(aggregate_id).await.unwrap();
        assert_eq!(loaded.comments, vec![Some("secret".to_string())]);
    }

    #[tokio::test]
    async fn test_load_tolerates_destroyed_keys() {
        let store = InMemoryEventStore::new();
        let handler = handler(store);
        let aggregate_id = AggregateId::new();
        let author = AggregateId::new();

        handler
            .execute(aggregate_id, |_| {
                Ok(vec![
                    TestEvent::Created {
                        name: "Test".to_string(),
                    },
                    TestEvent::Updated { value: 3 },
                    TestEvent::Commented {
                        author,
                        comment: Some("gone".to_string()),
                    },
                ])
            })
            .await
            .unwrap();
        handler.codec().destroy_key(author).await.unwrap();

        let loaded = handler.load(aggregate_id).await.unwrap();
        assert_eq!(loaded.value, 3);
        assert_eq!(loaded.comments, vec![None]);
        assert_eq!(loaded.version, Version::new(3));
    }

    #[tokio::test]
    async fn test_revision_is_recorded() {
        let store = InMemoryEventStore::new();
        let handler = handler(store.clone());
        let aggregate_id = AggregateId::new();

        handler
            .execute(aggregate_id, |_| {
                Ok(vec![TestEvent::Created {
                    name: "Test".to_string(),
                }])
            })
            .await
            .unwrap();

        let stored = store.get_events_for_aggregate(aggregate_id).await.unwrap();
        assert_eq!(stored[0].revision, 0);
        assert_eq!(stored[0].event_type, "TestCreated");
    }
}
