//! Domain layer: aggregates, commands, validation and events.
//!
//! Commands enter through the [`CommandGateway`], which runs the
//! [`CommandValidator`] before handing the command to the service owning the
//! target aggregate. Aggregates are rebuilt from their history on every
//! command; events with personal data are encrypted before they are
//! appended.

pub mod aggregate;
pub mod command;
pub mod competition;
pub mod error;
pub mod gateway;
pub mod organization;
pub mod user;
pub mod validation;

pub use aggregate::{Aggregate, DomainEvent, SnapshotCapable};
pub use command::{Command, CommandHandler, CommandResult};
pub use competition::{
    Competition, CompetitionError, CompetitionEvent, CompetitionService, CompetitionState,
    CreateCompetition, EndCompetition, EnterPhoto, PhotoEnteredIntoCompetitionData, PhotoId,
};
pub use error::DomainError;
pub use gateway::{CommandGateway, Dispatch};
pub use organization::{
    CreateOrganization, DeregisterOrganization, Organization, OrganizationError,
    OrganizationEvent, OrganizationService, OrganizationState, ReregisterOrganization,
    UpdateOrganization,
};
pub use user::{
    CreateUser, DeleteAndForgetUser, UpdateUserDetails, UpdateUserRoles, User, UserError,
    UserEvent, UserService, UserState,
};
pub use validation::{
    Capability, CommandValidator, EmailAddressValidator, OrganizationStatus,
    OrganizationStatusLookup, OrganizationStatusValidator, RegistryError, UniqueEmailValidator,
    UserEmailLookup, ValidatableCommand, ValidationCode, ValidationFailure, Validator,
    ValidatorRegistry,
};
