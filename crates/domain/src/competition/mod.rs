//! Competition aggregate and related types.

mod aggregate;
mod commands;
mod events;
mod service;
mod state;
mod value_objects;

pub use aggregate::Competition;
pub use commands::*;
pub use events::{
    CompetitionCreatedData, CompetitionEndedData, CompetitionEvent, PhotoEnteredIntoCompetitionData,
};
pub use service::CompetitionService;
pub use state::CompetitionState;
pub use value_objects::PhotoId;

use thiserror::Error;

/// Errors that can occur during competition operations.
#[derive(Debug, Error)]
pub enum CompetitionError {
    #[error("Competition description is required")]
    DescriptionRequired,

    #[error("Competition already created")]
    AlreadyCreated,

    #[error("Competition does not exist")]
    NotFound,

    #[error("Invalid state transition: cannot {action} from {current_state} state")]
    InvalidStateTransition {
        current_state: CompetitionState,
        action: &'static str,
    },

    #[error("Photo {photo_id} has already been entered")]
    PhotoAlreadyEntered { photo_id: PhotoId },
}
