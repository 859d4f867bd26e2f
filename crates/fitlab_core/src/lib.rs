//! Local reactive cache for the FitLab athlete app.
//! This crate is the single source of truth for record storage, live
//! queries, and the aggregation invariants derived from stored records.

pub mod db;
pub mod live;
pub mod logging;
pub mod model;
pub mod remote;
pub mod repo;
pub mod service;

pub use db::{CacheDb, DbError, DbResult};
pub use live::Live;
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::records::{
    Achievement, Athlete, Conversation, Difficulty, FitnessTest, LeaderboardEntry, Message,
    MessageType, Opportunity, OpportunityType, Rarity, TestResult,
};
pub use model::RecordKind;
pub use repo::{DecodePolicy, RepoError, RepoResult};
pub use service::message_service::MessageService;
pub use service::ranking::ScoreOrder;
pub use service::result_service::ResultService;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
