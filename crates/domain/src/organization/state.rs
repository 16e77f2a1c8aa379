//! Organization lifecycle.

use serde::{Deserialize, Serialize};

/// The registration state of an organization.
///
/// ```text
/// Registered ──► Deregistered ──► Registered
/// ```
///
/// While deregistered, reregistration is the only accepted command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrganizationState {
    #[default]
    Registered,
    Deregistered,
}

impl OrganizationState {
    pub fn accepts_business_commands(&self) -> bool {
        matches!(self, OrganizationState::Registered)
    }

    pub fn can_deregister(&self) -> bool {
        matches!(self, OrganizationState::Registered)
    }

    pub fn can_reregister(&self) -> bool {
        matches!(self, OrganizationState::Deregistered)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrganizationState::Registered => "Registered",
            OrganizationState::Deregistered => "Deregistered",
        }
    }
}

impl std::fmt::Display for OrganizationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
