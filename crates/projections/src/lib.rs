//! Eventually consistent read side.
//!
//! - [`Projection`] trait for folding events into read models
//! - [`ProjectionProcessor`] for feeding the log to projections, with
//!   decryption of personal data on the way in
//! - Three views: organizations, users and competition entries. The first two
//!   double as the lookups used by command validation.

pub mod error;
pub mod processor;
pub mod projection;
pub mod views;

pub use error::{ProjectionError, Result};
pub use processor::ProjectionProcessor;
pub use projection::{Projection, ProjectionPosition};
pub use views::{
    CompetitionEntriesView, CompetitionEntryRecord, CompetitionRecord, OrganizationRecord,
    OrganizationsView, UserRecord, UsersView,
};
