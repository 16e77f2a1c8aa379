//! Organization aggregate and related types.

mod aggregate;
mod commands;
mod events;
mod service;
mod state;

pub use aggregate::Organization;
pub use commands::*;
pub use events::{
    OrganizationCreatedData, OrganizationDeregisteredData, OrganizationDetailsUpdatedData,
    OrganizationEvent, OrganizationReregisteredData,
};
pub use service::OrganizationService;
pub use state::OrganizationState;

use thiserror::Error;

/// Errors that can occur during organization operations.
#[derive(Debug, Error)]
pub enum OrganizationError {
    #[error("Organization name is required")]
    NameRequired,

    #[error("Organization already created")]
    AlreadyCreated,

    #[error("Organization does not exist")]
    NotFound,

    /// Business commands are refused until the organization is reregistered.
    #[error("Invalid state transition: cannot {action} from {current_state} state")]
    InvalidStateTransition {
        current_state: OrganizationState,
        action: &'static str,
    },

    #[error("No changes requested")]
    NoChangesRequested,
}
