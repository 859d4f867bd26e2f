//! Domain model for the local athlete cache.
//!
//! # Responsibility
//! - Define the canonical record kinds stored by the cache.
//! - Own the composite-field codec between stored JSON text and the
//!   structured shapes exposed to consumers.
//!
//! # Invariants
//! - Every record is identified by a caller-visible string `id`, unique
//!   within its kind.
//! - Records are created only by explicit inserts; derived fields
//!   (`is_personal_best`, `rank`, `unread_count`) are owned by the
//!   aggregation services.

pub mod codec;
pub mod records;

use std::fmt::{Display, Formatter};

/// Record kinds the cache knows about, one table each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Athlete,
    TestResult,
    Opportunity,
    Message,
    Conversation,
    LeaderboardEntry,
    Achievement,
    FitnessTest,
}

impl RecordKind {
    /// Backing table name for this kind.
    pub fn table(self) -> &'static str {
        match self {
            Self::Athlete => "athletes",
            Self::TestResult => "test_results",
            Self::Opportunity => "opportunities",
            Self::Message => "messages",
            Self::Conversation => "conversations",
            Self::LeaderboardEntry => "leaderboard_entries",
            Self::Achievement => "achievements",
            Self::FitnessTest => "fitness_tests",
        }
    }
}

impl Display for RecordKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.table())
    }
}

/// Generates a fresh string record id.
///
/// Used where a caller has no externally assigned identity (new local
/// messages, test results captured on-device).
pub fn new_record_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::{new_record_id, RecordKind};

    #[test]
    fn table_names_are_stable() {
        assert_eq!(RecordKind::TestResult.table(), "test_results");
        assert_eq!(RecordKind::Conversation.to_string(), "conversations");
    }

    #[test]
    fn generated_ids_are_unique() {
        assert_ne!(new_record_id(), new_record_id());
    }
}
