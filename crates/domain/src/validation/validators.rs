use std::sync::Arc;

use async_trait::async_trait;

use super::{
    Capability, OrganizationStatus, OrganizationStatusLookup, UserEmailLookup, ValidatableCommand,
    ValidationCode, ValidationFailure, Validator,
};

const MAX_EMAIL_LENGTH: usize = 254;

/// Checks the shape of an address: one `@`, a non-empty local part, and a
/// dotted domain whose labels are alphanumeric or hyphenated.
pub fn is_well_formed_email(email: &str) -> bool {
    if email.len() > MAX_EMAIL_LENGTH || email.chars().any(char::is_whitespace) {
        return false;
    }

    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') || local.starts_with('.') || local.ends_with('.')
    {
        return false;
    }

    let labels: Vec<_> = domain.split('.').collect();
    labels.len() >= 2
        && labels.iter().all(|label| {
            !label.is_empty()
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        })
}

pub struct EmailAddressValidator;

#[async_trait]
impl Validator for EmailAddressValidator {
    fn capability(&self) -> Capability {
        Capability::EmailAddress
    }

    async fn validate(&self, command: &dyn ValidatableCommand) -> Result<(), ValidationFailure> {
        let Some(email) = command.as_email_address().and_then(|c| c.email_address()) else {
            return Ok(());
        };

        if is_well_formed_email(email) {
            Ok(())
        } else {
            Err(ValidationFailure::new(
                ValidationCode::EmailAddressMalformed,
                format!("'{email}' is not a valid email address"),
            ))
        }
    }
}

pub struct UniqueEmailValidator {
    users: Arc<dyn UserEmailLookup>,
}

impl UniqueEmailValidator {
    pub fn new(users: Arc<dyn UserEmailLookup>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl Validator for UniqueEmailValidator {
    fn capability(&self) -> Capability {
        Capability::UniqueEmail
    }

    async fn validate(&self, command: &dyn ValidatableCommand) -> Result<(), ValidationFailure> {
        let Some(view) = command.as_unique_email() else {
            return Ok(());
        };
        let Some(email) = view.unique_email() else {
            return Ok(());
        };

        match self.users.user_with_email(email).await {
            Some(holder) if Some(holder) != view.email_owner() => Err(ValidationFailure::new(
                ValidationCode::EmailAddressAlreadyExists,
                format!("A user with email '{email}' already exists"),
            )),
            _ => Ok(()),
        }
    }
}

pub struct OrganizationStatusValidator {
    organizations: Arc<dyn OrganizationStatusLookup>,
}

impl OrganizationStatusValidator {
    pub fn new(organizations: Arc<dyn OrganizationStatusLookup>) -> Self {
        Self { organizations }
    }
}

#[async_trait]
impl Validator for OrganizationStatusValidator {
    fn capability(&self) -> Capability {
        Capability::OrganizationStatus
    }

    async fn validate(&self, command: &dyn ValidatableCommand) -> Result<(), ValidationFailure> {
        let Some(view) = command.as_organization_status() else {
            return Ok(());
        };
        let organization_id = view.organization_id();

        match self.organizations.organization_status(organization_id).await {
            Some(OrganizationStatus::Registered) => Ok(()),
            Some(OrganizationStatus::Deregistered) => Err(ValidationFailure::new(
                ValidationCode::OrganizationIsDeregistered,
                format!("Organization {organization_id} is deregistered"),
            )),
            None => Err(ValidationFailure::new(
                ValidationCode::OrganizationDoesNotExist,
                format!("Organization {organization_id} does not exist"),
            )),
        }
    }
}
