//! Projection processor for feeding events to projections.

use crypto::CryptoShreddingCodec;
use event_store::{EventEnvelope, EventStore, Position};
use futures_util::StreamExt;

use crate::Result;
use crate::projection::Projection;

/// Reads the event log and delivers each event to every registered
/// projection that has not applied it yet.
///
/// Encrypted fields are opened with the codec before delivery, so views see
/// plaintext, or `null` for a forgotten subject.
///
/// The processor supports:
/// - Catch-up: replays the stored log to bring projections up to date
/// - Live: follows the log subscription until the store goes away
/// - Rebuild: resets all projections and replays from scratch
pub struct ProjectionProcessor<S: EventStore> {
    store: S,
    codec: CryptoShreddingCodec,
    projections: Vec<Box<dyn Projection>>,
}

impl<S: EventStore> ProjectionProcessor<S> {
    /// Creates a new processor reading from the given event store.
    pub fn new(store: S, codec: CryptoShreddingCodec) -> Self {
        Self {
            store,
            codec,
            projections: Vec::new(),
        }
    }

    /// Registers a projection with this processor.
    pub fn register(&mut self, projection: Box<dyn Projection>) {
        self.projections.push(projection);
    }

    /// Returns the number of registered projections.
    pub fn projection_count(&self) -> usize {
        self.projections.len()
    }

    /// The lowest position applied by any projection.
    async fn low_watermark(&self) -> Position {
        let mut lowest: Option<Position> = None;
        for projection in &self.projections {
            let position = projection.position().await.position;
            lowest = Some(lowest.map_or(position, |l| l.min(position)));
        }
        lowest.unwrap_or_default()
    }

    /// Replays every stored event after the slowest projection's position.
    ///
    /// Returns the number of events read from the log.
    #[tracing::instrument(skip(self))]
    pub async fn run_catch_up(&self) -> Result<u64> {
        let from = self.low_watermark().await;
        let events = self.store.read_all_from(from).await?;
        let count = events.len() as u64;

        for event in events {
            self.process_event(event).await?;
        }

        tracing::info!(from = %from, events_read = count, "catch-up complete");
        Ok(count)
    }

    /// Decrypts one event and delivers it to the projections that have not
    /// seen its position.
    #[tracing::instrument(
        skip(self, event),
        fields(event_type = %event.event_type, position = ?event.position)
    )]
    pub async fn process_event(&self, event: EventEnvelope) -> Result<()> {
        let decryption = self.codec.decrypt_fields(event).await?;
        if decryption.is_redacted() {
            tracing::debug!("delivering redacted event");
        }
        let event = decryption.into_envelope();

        for projection in &self.projections {
            if projection.position().await.has_seen(event.position) {
                continue;
            }
            projection.handle(&event).await?;
            metrics::counter!("projections_events_processed", "projection" => projection.name())
                .increment(1);
        }
        Ok(())
    }

    /// Follows the log subscription, delivering events as they are
    /// appended.
    ///
    /// A failing event is logged and skipped; the loop only ends when the
    /// subscription closes.
    #[tracing::instrument(skip(self))]
    pub async fn run(&self) -> Result<()> {
        let from = self.low_watermark().await;
        let mut stream = self.store.subscribe(from).await?;
        tracing::info!(from = %from, "projection subscription started");

        while let Some(next) = stream.next().await {
            let outcome = match next {
                Ok(event) => self.process_event(event).await,
                Err(e) => Err(e.into()),
            };
            if let Err(e) = outcome {
                metrics::counter!("projections_errors").increment(1);
                tracing::error!(error = %e, "projection delivery failed");
            }
        }

        tracing::info!("projection subscription closed");
        Ok(())
    }

    /// Resets all projections and replays all events from the store.
    #[tracing::instrument(skip(self))]
    pub async fn rebuild_all(&self) -> Result<u64> {
        for projection in &self.projections {
            projection.reset().await?;
        }
        self.run_catch_up().await
    }
}
