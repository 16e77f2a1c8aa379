use std::collections::HashSet;
use std::sync::Arc;

use thiserror::Error;

use super::{Capability, Validator};

/// Configuration defects detected while assembling the registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("No validator registered for capability '{0}'")]
    MissingValidator(Capability),

    #[error("More than one validator registered for capability '{0}'")]
    DuplicateValidator(Capability),
}

/// Static table from capability to validator, built once at startup.
#[derive(Clone)]
pub struct ValidatorRegistry {
    validators: Vec<Arc<dyn Validator>>,
}

impl ValidatorRegistry {
    pub fn builder() -> ValidatorRegistryBuilder {
        ValidatorRegistryBuilder::default()
    }

    /// Validators for the given capabilities, in registration order.
    pub fn validators_for(&self, capabilities: &[Capability]) -> Vec<Arc<dyn Validator>> {
        self.validators
            .iter()
            .filter(|validator| capabilities.contains(&validator.capability()))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }
}

impl std::fmt::Debug for ValidatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.validators.iter().map(|v| v.capability()))
            .finish()
    }
}

#[derive(Default)]
pub struct ValidatorRegistryBuilder {
    validators: Vec<Arc<dyn Validator>>,
}

impl ValidatorRegistryBuilder {
    pub fn register(mut self, validator: impl Validator + 'static) -> Self {
        self.validators.push(Arc::new(validator));
        self
    }

    /// Fails unless every capability has exactly one validator.
    pub fn build(self) -> Result<ValidatorRegistry, RegistryError> {
        let mut seen = HashSet::new();
        for validator in &self.validators {
            if !seen.insert(validator.capability()) {
                return Err(RegistryError::DuplicateValidator(validator.capability()));
            }
        }

        if let Some(missing) = Capability::ALL.into_iter().find(|c| !seen.contains(c)) {
            return Err(RegistryError::MissingValidator(missing));
        }

        Ok(ValidatorRegistry {
            validators: self.validators,
        })
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::validation::{ValidatableCommand, ValidationFailure};

    struct Accepting(Capability);

    #[async_trait]
    impl Validator for Accepting {
        fn capability(&self) -> Capability {
            self.0
        }

        async fn validate(&self, _: &dyn ValidatableCommand) -> Result<(), ValidationFailure> {
            Ok(())
        }
    }

    #[test]
    fn test_builds_when_every_capability_is_covered() {
        let registry = ValidatorRegistry::builder()
            .register(Accepting(Capability::OrganizationStatus))
            .register(Accepting(Capability::EmailAddress))
            .register(Accepting(Capability::UniqueEmail))
            .build()
            .unwrap();

        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_missing_capability_is_a_startup_error() {
        let result = ValidatorRegistry::builder()
            .register(Accepting(Capability::EmailAddress))
            .register(Accepting(Capability::UniqueEmail))
            .build();

        assert_eq!(
            result.unwrap_err(),
            RegistryError::MissingValidator(Capability::OrganizationStatus)
        );
    }

    #[test]
    fn test_duplicate_capability_is_rejected() {
        let result = ValidatorRegistry::builder()
            .register(Accepting(Capability::EmailAddress))
            .register(Accepting(Capability::EmailAddress))
            .build();

        assert_eq!(
            result.unwrap_err(),
            RegistryError::DuplicateValidator(Capability::EmailAddress)
        );
    }

    #[test]
    fn test_lookup_keeps_registration_order() {
        let registry = ValidatorRegistry::builder()
            .register(Accepting(Capability::OrganizationStatus))
            .register(Accepting(Capability::UniqueEmail))
            .register(Accepting(Capability::EmailAddress))
            .build()
            .unwrap();

        let order: Vec<_> = registry
            .validators_for(&[Capability::EmailAddress, Capability::OrganizationStatus])
            .iter()
            .map(|v| v.capability())
            .collect();

        assert_eq!(
            order,
            vec![Capability::OrganizationStatus, Capability::EmailAddress]
        );
    }
}
