use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::stream;
use tokio::sync::{RwLock, watch};

use crate::{
    AggregateId, EventEnvelope, EventStoreError, Position, Result, Snapshot, Version,
    store::{AppendOptions, EventStore, EventStream, validate_events_for_append},
};

/// In-memory event store implementation.
///
/// Events are kept in a single append-only vector, so an event's global
/// position is its index plus one. Appends notify live subscribers through a
/// `watch` channel carrying the head position.
#[derive(Clone)]
pub struct InMemoryEventStore {
    events: Arc<RwLock<Vec<EventEnvelope>>>,
    snapshots: Arc<RwLock<HashMap<AggregateId, Snapshot>>>,
    head: Arc<watch::Sender<Position>>,
}

impl InMemoryEventStore {
    /// Creates a new empty in-memory event store.
    pub fn new() -> Self {
        let (head, _) = watch::channel(Position::start());
        Self {
            events: Arc::new(RwLock::new(Vec::new())),
            snapshots: Arc::new(RwLock::new(HashMap::new())),
            head: Arc::new(head),
        }
    }

    /// Returns the total number of events stored.
    pub async fn event_count(&self) -> usize {
        self.events.read().await.len()
    }
}

impl Default for InMemoryEventStore {
    fn default() -> Self {
        Self::new()
    }
}

async fn read_after(events: &RwLock<Vec<EventEnvelope>>, after: Position) -> Vec<EventEnvelope> {
    let events = events.read().await;
    let start = (after.as_u64() as usize).min(events.len());
    events[start..].to_vec()
}

struct Subscription {
    events: Arc<RwLock<Vec<EventEnvelope>>>,
    head: watch::Receiver<Position>,
    last: Position,
    buffer: VecDeque<EventEnvelope>,
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append(&self, events: Vec<EventEnvelope>, options: AppendOptions) -> Result<Version> {
        validate_events_for_append(&events)?;

        let first_event = &events[0];
        let aggregate_id = first_event.aggregate_id;

        let mut store = self.events.write().await;

        // Get current version for this aggregate
        let current_version = store
            .iter()
            .filter(|e| e.aggregate_id == aggregate_id)
            .map(|e| e.version)
            .max()
            .unwrap_or(Version::initial());

        // Check expected version if specified
        if let Some(expected) = options.expected_version
            && current_version != expected
        {
            return Err(EventStoreError::ConcurrencyConflict {
                aggregate_id,
                expected,
                actual: current_version,
            });
        }

        // Check for version conflicts (unique constraint simulation)
        let first_new_version = first_event.version;
        if first_new_version <= current_version && current_version != Version::initial() {
            return Err(EventStoreError::ConcurrencyConflict {
                aggregate_id,
                expected: options.expected_version.unwrap_or(current_version),
                actual: current_version,
            });
        }

        let last_version = events
            .last()
            .map(|e| e.version)
            .unwrap_or(Version::initial());

        let mut position = Position::new(store.len() as u64);
        for mut event in events {
            position = position.next();
            event.position = Some(position);
            store.push(event);
        }
        drop(store);

        self.head.send_replace(position);
        metrics::counter!("event_store_events_appended").increment(1);
        tracing::debug!(%aggregate_id, %position, version = %last_version, "events appended");

        Ok(last_version)
    }

    async fn get_events_for_aggregate(
        &self,
        aggregate_id: AggregateId,
    ) -> Result<Vec<EventEnvelope>> {
        let store = self.events.read().await;
        let mut events: Vec<_> = store
            .iter()
            .filter(|e| e.aggregate_id == aggregate_id)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.version);
        Ok(events)
    }

    async fn get_events_for_aggregate_from_version(
        &self,
        aggregate_id: AggregateId,
        from_version: Version,
    ) -> Result<Vec<EventEnvelope>> {
        let store = self.events.read().await;
        let mut events: Vec<_> = store
            .iter()
            .filter(|e| e.aggregate_id == aggregate_id && e.version >= from_version)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.version);
        Ok(events)
    }

    async fn read_all_from(&self, after: Position) -> Result<Vec<EventEnvelope>> {
        Ok(read_after(&self.events, after).await)
    }

    async fn subscribe(&self, after: Position) -> Result<EventStream> {
        let subscription = Subscription {
            events: Arc::clone(&self.events),
            head: self.head.subscribe(),
            last: after,
            buffer: VecDeque::new(),
        };

        let stream = stream::unfold(subscription, |mut sub| async move {
            loop {
                if let Some(event) = sub.buffer.pop_front() {
                    if let Some(position) = event.position {
                        sub.last = position;
                    }
                    return Some((Ok(event), sub));
                }

                // Mark the current head as seen before reading, so an append
                // racing with the read still wakes us up.
                sub.head.borrow_and_update();
                let pending = read_after(&sub.events, sub.last).await;
                if !pending.is_empty() {
                    sub.buffer.extend(pending);
                    continue;
                }

                if sub.head.changed().await.is_err() {
                    return None;
                }
            }
        });

        Ok(Box::pin(stream))
    }

    async fn head_position(&self) -> Result<Position> {
        Ok(Position::new(self.events.read().await.len() as u64))
    }

    async fn get_aggregate_version(&self, aggregate_id: AggregateId) -> Result<Option<Version>> {
        let store = self.events.read().await;
        let version = store
            .iter()
            .filter(|e| e.aggregate_id == aggregate_id)
            .map(|e| e.version)
            .max();
        Ok(version)
    }

    async fn save_snapshot(&self, snapshot: Snapshot) -> Result<()> {
        let mut snapshots = self.snapshots.write().await;
        snapshots.insert(snapshot.aggregate_id, snapshot);
        Ok(())
    }

    async fn get_snapshot(&self, aggregate_id: AggregateId) -> Result<Option<Snapshot>> {
        let snapshots = self.snapshots.read().await;
        Ok(snapshots.get(&aggregate_id).cloned())
    }
}
