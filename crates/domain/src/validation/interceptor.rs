use super::{ValidatableCommand, ValidationFailure, ValidatorRegistry};

/// Runs the validators a command declares, before it reaches an aggregate.
///
/// Validators run in registration order and the first failure stops the
/// chain. Nothing is mutated either way.
#[derive(Debug, Clone)]
pub struct CommandValidator {
    registry: ValidatorRegistry,
}

impl CommandValidator {
    pub fn new(registry: ValidatorRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ValidatorRegistry {
        &self.registry
    }

    #[tracing::instrument(skip_all, fields(command = command.command_name()))]
    pub async fn validate(&self, command: &dyn ValidatableCommand) -> Result<(), ValidationFailure> {
        let capabilities = command.capabilities();

        for validator in self.registry.validators_for(&capabilities) {
            if let Err(failure) = validator.validate(command).await {
                metrics::counter!(
                    "commands_rejected_total",
                    "command" => command.command_name(),
                    "code" => failure.code.as_str()
                )
                .increment(1);
                tracing::warn!(
                    capability = %validator.capability(),
                    code = %failure.code,
                    detail = %failure.detail,
                    "command rejected"
                );
                return Err(failure);
            }
        }

        tracing::debug!(?capabilities, "command passed validation");
        Ok(())
    }
}
