//! Read model views.

mod competition_entries;
mod organizations;
mod users;

pub use competition_entries::{CompetitionEntriesView, CompetitionEntryRecord, CompetitionRecord};
pub use organizations::{OrganizationRecord, OrganizationsView};
pub use users::{UserRecord, UsersView};
