use serde::{Deserialize, Serialize};

/// Lifecycle of a competition. `Ended` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CompetitionState {
    #[default]
    Open,
    Ended,
}

impl CompetitionState {
    pub fn accepts_entries(&self) -> bool {
        matches!(self, CompetitionState::Open)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CompetitionState::Open => "Open",
            CompetitionState::Ended => "Ended",
        }
    }
}

impl std::fmt::Display for CompetitionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
