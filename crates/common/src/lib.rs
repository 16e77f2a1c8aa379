//! Shared types for the event-sourced organization and user core.

mod types;

pub use types::{AggregateId, Role, RoleSet};
