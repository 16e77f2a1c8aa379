//! Command validation.
//!
//! A command opts into validation concerns by implementing capability
//! traits and exposing them through [`ValidatableCommand`]. Validators are
//! registered once per capability in a [`ValidatorRegistry`], and the
//! [`CommandValidator`] runs the applicable ones before a command reaches its
//! aggregate.

mod capability;
mod interceptor;
mod lookup;
mod registry;
mod validators;

pub use capability::{
    Capability, EmailAddressValidatable, OrganizationStatusValidatable, UniqueEmailValidatable,
    ValidatableCommand,
};
pub use interceptor::CommandValidator;
pub use lookup::{OrganizationStatus, OrganizationStatusLookup, UserEmailLookup};
pub use registry::{RegistryError, ValidatorRegistry, ValidatorRegistryBuilder};
pub use validators::{
    EmailAddressValidator, OrganizationStatusValidator, UniqueEmailValidator, is_well_formed_email,
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Machine-readable reason a command was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationCode {
    EmailAddressMalformed,
    EmailAddressAlreadyExists,
    OrganizationDoesNotExist,
    OrganizationIsDeregistered,
}

impl ValidationCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationCode::EmailAddressMalformed => "EMAIL_ADDRESS_MALFORMED",
            ValidationCode::EmailAddressAlreadyExists => "EMAIL_ADDRESS_ALREADY_EXISTS",
            ValidationCode::OrganizationDoesNotExist => "ORGANIZATION_DOES_NOT_EXIST",
            ValidationCode::OrganizationIsDeregistered => "ORGANIZATION_IS_DEREGISTERED",
        }
    }

    /// Key of the human-readable message, resolved by the presentation layer.
    pub fn message_key(&self) -> &'static str {
        match self {
            ValidationCode::EmailAddressMalformed => "validation.email.malformed",
            ValidationCode::EmailAddressAlreadyExists => "validation.email.already-exists",
            ValidationCode::OrganizationDoesNotExist => "validation.organization.does-not-exist",
            ValidationCode::OrganizationIsDeregistered => "validation.organization.deregistered",
        }
    }
}

impl std::fmt::Display for ValidationCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Structured rejection produced by a validator.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{code}: {detail}")]
pub struct ValidationFailure {
    pub code: ValidationCode,
    pub message_key: String,
    pub detail: String,
}

impl ValidationFailure {
    pub fn new(code: ValidationCode, detail: impl Into<String>) -> Self {
        Self {
            code,
            message_key: code.message_key().to_string(),
            detail: detail.into(),
        }
    }
}

/// Checks a single capability of a command.
///
/// Validators are stateless. They may read read-side lookups but never
/// mutate anything. A command that does not expose the validator's
/// capability passes.
#[async_trait]
pub trait Validator: Send + Sync {
    fn capability(&self) -> Capability;

    async fn validate(&self, command: &dyn ValidatableCommand) -> Result<(), ValidationFailure>;
}
