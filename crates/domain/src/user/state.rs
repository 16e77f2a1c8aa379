use serde::{Deserialize, Serialize};

/// Lifecycle of a user. `Forgotten` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum UserState {
    #[default]
    Active,
    Forgotten,
}

impl UserState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, UserState::Forgotten)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UserState::Active => "Active",
            UserState::Forgotten => "Forgotten",
        }
    }
}

impl std::fmt::Display for UserState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
