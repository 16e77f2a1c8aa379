//! Core projection trait and position tracking.

use async_trait::async_trait;
use event_store::{EventEnvelope, Position};

use crate::Result;

/// The last log position a projection has applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProjectionPosition {
    /// Global position of the last event handled.
    pub position: Position,
    /// Number of events handled since the last reset.
    pub events_processed: u64,
}

impl ProjectionPosition {
    /// Creates a position before the first event.
    pub fn zero() -> Self {
        Self::default()
    }

    /// Records that the event at `position` was handled.
    pub fn advance_to(&self, position: Position) -> Self {
        Self {
            position: self.position.max(position),
            events_processed: self.events_processed + 1,
        }
    }

    /// Returns true if the event at `position` was already applied.
    ///
    /// Events without a position have not been through the store and are
    /// never considered seen.
    pub fn has_seen(&self, position: Option<Position>) -> bool {
        position.is_some_and(|p| p <= self.position)
    }
}

impl std::fmt::Display for ProjectionPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "position({}, {} processed)",
            self.position, self.events_processed
        )
    }
}

/// A projection that folds events into a read model.
///
/// Handlers receive envelopes whose encrypted fields were already opened by
/// the processor. For a forgotten subject those fields are `null`.
#[async_trait]
pub trait Projection: Send + Sync {
    /// Returns the name of this projection.
    fn name(&self) -> &'static str;

    /// Handles a single event and advances the position, including for
    /// events the projection ignores.
    async fn handle(&self, event: &EventEnvelope) -> Result<()>;

    /// Returns the current position of this projection.
    async fn position(&self) -> ProjectionPosition;

    /// Clears the read model and rewinds to before the first event.
    async fn reset(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_starts_before_first_event() {
        let pos = ProjectionPosition::zero();
        assert_eq!(pos.position, Position::start());
        assert_eq!(pos.events_processed, 0);
        assert!(!pos.has_seen(Some(Position::new(1))));
    }

    #[test]
    fn test_position_advances() {
        let pos = ProjectionPosition::zero().advance_to(Position::new(1));
        let pos = pos.advance_to(Position::new(4));
        assert_eq!(pos.position, Position::new(4));
        assert_eq!(pos.events_processed, 2);
        assert!(pos.has_seen(Some(Position::new(3))));
        assert!(pos.has_seen(Some(Position::new(4))));
        assert!(!pos.has_seen(Some(Position::new(5))));
    }

    #[test]
    fn test_unpositioned_events_are_never_seen() {
        let pos = ProjectionPosition::zero().advance_to(Position::new(10));
        assert!(!pos.has_seen(None));
    }

    #[test]
    fn test_position_display() {
        let pos = ProjectionPosition {
            position: Position::new(42),
            events_processed: 40,
        };
        assert_eq!(pos.to_string(), "position(42, 40 processed)");
    }
}
