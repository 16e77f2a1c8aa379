//! Feeds triggering events from the log subscription to the saga.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use common::AggregateId;
use crypto::CryptoShreddingCodec;
use event_store::{EventEnvelope, EventStore, Position};
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::error::Result;
use crate::synchronization::IdentitySynchronizationSaga;

/// Subscribes to the event log and runs one saga instance per trigger.
///
/// Triggers for the same user run one after another in log order, so a
/// later role change is synchronized after the earlier one ends. Different
/// users run concurrently and a long convergence wait for one does not hold
/// up another. Failures are logged and never stop the loop.
pub struct SagaRunner<S: EventStore + 'static> {
    store: S,
    codec: CryptoShreddingCodec,
    saga: Arc<IdentitySynchronizationSaga<S>>,
}

impl<S: EventStore + 'static> SagaRunner<S> {
    pub fn new(
        store: S,
        codec: CryptoShreddingCodec,
        saga: Arc<IdentitySynchronizationSaga<S>>,
    ) -> Self {
        Self { store, codec, saga }
    }

    /// Follows events appended from now on. History is not replayed.
    pub async fn run(&self) -> Result<()> {
        let head = self.store.head_position().await?;
        self.run_from(head).await
    }

    /// Follows the log from after `after` until the subscription closes,
    /// then waits for running instances to end.
    #[tracing::instrument(skip(self))]
    pub async fn run_from(&self, after: Position) -> Result<()> {
        let mut stream = self.store.subscribe(after).await?;
        let mut lanes: HashMap<AggregateId, Lane> = HashMap::new();
        let mut workers = JoinSet::new();
        tracing::info!(from = %after, "saga subscription started");

        while let Some(next) = stream.next().await {
            while let Some(finished) = workers.try_join_next() {
                log_join(finished);
            }
            // Dropping an idle lane's sender lets its worker exit.
            lanes.retain(|_, lane| !lane.is_idle());

            let event = match next {
                Ok(event) => event,
                Err(e) => {
                    tracing::error!(error = %e, "saga subscription error");
                    continue;
                }
            };
            if !IdentitySynchronizationSaga::<S>::is_trigger(&event) {
                continue;
            }

            let event = match self.open(event).await {
                Ok(event) => event,
                Err(e) => {
                    metrics::counter!("saga_trigger_errors").increment(1);
                    tracing::error!(error = %e, "could not decrypt trigger");
                    continue;
                }
            };

            let user_id = event.aggregate_id;
            let lane = lanes
                .entry(user_id)
                .or_insert_with(|| Lane::open(Arc::clone(&self.saga), &mut workers));
            if let Err(rejected) = lane.push(event) {
                // The worker is gone; open a fresh lane for this user.
                let lane = Lane::open(Arc::clone(&self.saga), &mut workers);
                if lane.push(rejected.0).is_err() {
                    tracing::error!(%user_id, "saga lane closed before its first trigger");
                }
                lanes.insert(user_id, lane);
            }
        }

        tracing::info!(running = workers.len(), "saga subscription closed");
        drop(lanes);
        while let Some(finished) = workers.join_next().await {
            log_join(finished);
        }
        Ok(())
    }

    async fn open(&self, event: EventEnvelope) -> Result<EventEnvelope> {
        Ok(self.codec.decrypt_fields(event).await?.into_envelope())
    }
}

/// Ordered queue of one user's triggers, drained by a single worker.
struct Lane {
    tx: mpsc::UnboundedSender<EventEnvelope>,
    pending: Arc<AtomicUsize>,
}

impl Lane {
    fn open<S: EventStore + 'static>(
        saga: Arc<IdentitySynchronizationSaga<S>>,
        workers: &mut JoinSet<()>,
    ) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<EventEnvelope>();
        let pending = Arc::new(AtomicUsize::new(0));

        let left = Arc::clone(&pending);
        workers.spawn(async move {
            while let Some(event) = rx.recv().await {
                if let Err(e) = saga.handle(&event).await {
                    tracing::warn!(event_id = %event.event_id, error = %e, "trigger not synchronized");
                }
                left.fetch_sub(1, Ordering::AcqRel);
            }
        });

        Self { tx, pending }
    }

    fn push(
        &self,
        event: EventEnvelope,
    ) -> std::result::Result<(), mpsc::error::SendError<EventEnvelope>> {
        self.pending.fetch_add(1, Ordering::AcqRel);
        self.tx.send(event).inspect_err(|_| {
            self.pending.fetch_sub(1, Ordering::AcqRel);
        })
    }

    fn is_idle(&self) -> bool {
        self.pending.load(Ordering::Acquire) == 0
    }
}

fn log_join(finished: std::result::Result<(), tokio::task::JoinError>) {
    if let Err(e) = finished {
        tracing::error!(error = %e, "saga instance panicked");
    }
}
