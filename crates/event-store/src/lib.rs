//! Event log for the event-sourced core.
//!
//! Provides the [`EventStore`] trait with per-aggregate optimistic
//! concurrency, global append positions for replay, and an at-least-once
//! subscription stream, plus an in-memory implementation.

pub mod error;
pub mod event;
pub mod memory;
pub mod snapshot;
pub mod store;

pub use common::AggregateId;
pub use error::{EventStoreError, Result};
pub use event::{EventEnvelope, EventEnvelopeBuilder, EventId, Position, Version};
pub use memory::InMemoryEventStore;
pub use snapshot::Snapshot;
pub use store::{AppendOptions, EventStore, EventStoreExt, EventStream};
