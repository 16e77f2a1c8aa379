//! Core aggregate and domain event traits.

use common::AggregateId;
use crypto::FieldEncryption;
use event_store::Version;
use serde::{Serialize, de::DeserializeOwned};

/// Trait for domain events.
///
/// Domain events represent facts that have happened in the domain.
/// They are immutable and should be named in past tense.
pub trait DomainEvent: Serialize + DeserializeOwned + Send + Sync + Clone {
    /// Returns the event type name.
    ///
    /// This is used for serialization and event store filtering.
    fn event_type(&self) -> &'static str;

    /// Schema revision of the payload.
    fn revision(&self) -> u32 {
        0
    }

    /// Fields holding personal data, and the field naming their owner.
    ///
    /// Returning `Some` makes the command handler encrypt those fields under
    /// the owner's key before the event is appended.
    fn encryption(&self) -> Option<FieldEncryption> {
        None
    }
}

/// Trait for aggregates in an event-sourced system.
///
/// An aggregate is a cluster of domain objects that can be treated as a single unit.
/// The aggregate root ensures consistency of changes being made within the aggregate.
///
/// In event sourcing, aggregates:
/// - Are rebuilt by replaying events
/// - Generate events from commands
/// - Apply events to update state (pure, deterministic)
pub trait Aggregate: Default + Send + Sync + Sized {
    /// The type of events this aggregate produces and consumes.
    type Event: DomainEvent;

    /// The type of errors this aggregate can produce.
    type Error: std::error::Error + Send + Sync;

    /// Returns the aggregate type name.
    ///
    /// Used for event store organization and routing.
    fn aggregate_type() -> &'static str;

    /// Returns the aggregate's unique identifier.
    ///
    /// Returns None for a new, uninitialized aggregate.
    fn id(&self) -> Option<AggregateId>;

    /// Returns the current version of the aggregate.
    ///
    /// Version starts at 0 for a new aggregate and increments with each event.
    fn version(&self) -> Version;

    /// Sets the aggregate version.
    ///
    /// Called by the command handler after loading events.
    fn set_version(&mut self, version: Version);

    /// Applies an event to the aggregate, updating its state.
    ///
    /// This method must be pure and deterministic:
    /// - Given the same state and event, it must always produce the same new state
    /// - It must not have side effects
    /// - It must not fail (events represent facts that have happened)
    fn apply(&mut self, event: Self::Event);

    /// Applies multiple events in sequence.
    fn apply_events(&mut self, events: impl IntoIterator<Item = Self::Event>) {
        for event in events {
            self.apply(event);
        }
    }
}

/// Trait for aggregates that support snapshotting.
///
/// Snapshotting is an optimization to avoid replaying all events when loading
/// an aggregate. The aggregate state is periodically serialized and stored.
pub trait SnapshotCapable: Aggregate + Serialize + DeserializeOwned {
    /// Returns the snapshot interval (number of events between snapshots).
    ///
    /// A value of 100 means a snapshot is taken every 100 events.
    fn snapshot_interval() -> usize {
        100
    }

    /// Returns whether a snapshot should be taken given the current version.
    fn should_snapshot(&self) -> bool {
        self.should_snapshot_every(Self::snapshot_interval())
    }

    /// Same as [`should_snapshot`](Self::should_snapshot) with an explicit interval.
    fn should_snapshot_every(&self, interval: usize) -> bool {
        interval > 0
            && self.version().as_i64() > 0
            && (self.version().as_i64() as usize).is_multiple_of(interval)
    }
}
