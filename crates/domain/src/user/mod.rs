//! User aggregate and related types.

mod aggregate;
mod commands;
mod events;
mod service;
mod state;

pub use aggregate::User;
pub use commands::*;
pub use events::{
    UserCreatedData, UserDeletedAndForgottenData, UserDetailsUpdatedData, UserEvent,
    UserRolesUpdatedData,
};
pub use service::UserService;
pub use state::UserState;

use thiserror::Error;

/// Errors that can occur during user operations.
#[derive(Debug, Error)]
pub enum UserError {
    #[error("User already created")]
    AlreadyCreated,

    #[error("User does not exist")]
    NotFound,

    #[error("Display name is required")]
    DisplayNameRequired,

    /// A forgotten user accepts no further commands.
    #[error("Invalid state transition: cannot {action} from {current_state} state")]
    InvalidStateTransition {
        current_state: UserState,
        action: &'static str,
    },

    #[error("No changes requested")]
    NoChangesRequested,
}
