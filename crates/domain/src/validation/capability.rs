use common::AggregateId;

/// Validation concern a command can opt into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Capability {
    /// The command carries a well-formed email address.
    EmailAddress,
    /// No other user already has the command's email address.
    UniqueEmail,
    /// The referenced organization exists and is not deregistered.
    OrganizationStatus,
}

impl Capability {
    /// Every capability; each must have a registered validator.
    pub const ALL: [Capability; 3] = [
        Capability::EmailAddress,
        Capability::UniqueEmail,
        Capability::OrganizationStatus,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::EmailAddress => "email_address",
            Capability::UniqueEmail => "unique_email",
            Capability::OrganizationStatus => "organization_status",
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub trait EmailAddressValidatable: Send + Sync {
    /// The address to check. `None` means the command leaves it unchanged.
    fn email_address(&self) -> Option<&str>;
}

pub trait UniqueEmailValidatable: Send + Sync {
    fn unique_email(&self) -> Option<&str>;

    /// The user the email belongs to after the command, who may already hold it.
    fn email_owner(&self) -> Option<AggregateId> {
        None
    }
}

pub trait OrganizationStatusValidatable: Send + Sync {
    fn organization_id(&self) -> AggregateId;
}

/// A command passing through the validation interceptor.
///
/// Each `as_*` accessor returns the command's view for one capability, or
/// `None` if the command does not declare it.
pub trait ValidatableCommand: Send + Sync {
    fn command_name(&self) -> &'static str;

    fn as_email_address(&self) -> Option<&dyn EmailAddressValidatable> {
        None
    }

    fn as_unique_email(&self) -> Option<&dyn UniqueEmailValidatable> {
        None
    }

    fn as_organization_status(&self) -> Option<&dyn OrganizationStatusValidatable> {
        None
    }

    /// Capabilities declared by this command.
    fn capabilities(&self) -> Vec<Capability> {
        Capability::ALL
            .into_iter()
            .filter(|capability| match capability {
                Capability::EmailAddress => self.as_email_address().is_some(),
                Capability::UniqueEmail => self.as_unique_email().is_some(),
                Capability::OrganizationStatus => self.as_organization_status().is_some(),
            })
            .collect()
    }
}
