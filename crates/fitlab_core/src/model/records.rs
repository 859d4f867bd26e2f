//! Canonical record shapes exposed to cache consumers.
//!
//! # Responsibility
//! - One struct per stored kind, in its logical (decoded) shape.
//! - Constructors that initialize derived fields to their neutral state.
//!
//! # Invariants
//! - Composite fields (`Vec`/`BTreeMap`) round-trip losslessly through
//!   `model::codec`.
//! - Enumerated fields carry tagged variants, never free text; the exact
//!   stored names live beside each repository.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Athlete profile record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Athlete {
    pub id: String,
    pub name: String,
    pub age: i64,
    pub sport: String,
    pub location: String,
    pub bio: String,
    pub verified: bool,
    pub following: bool,
    /// Test name -> formatted best score ("4.5 s"). Maintained by the
    /// result service when results are recorded.
    pub personal_bests: BTreeMap<String, String>,
    /// Ids of unlocked `Achievement` records.
    pub achievements: Vec<String>,
    /// Platform name -> handle/url.
    pub social_media: BTreeMap<String, String>,
}

impl Athlete {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        age: i64,
        sport: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            age,
            sport: sport.into(),
            location: location.into(),
            bio: String::new(),
            verified: false,
            following: false,
            personal_bests: BTreeMap::new(),
            achievements: Vec::new(),
            social_media: BTreeMap::new(),
        }
    }
}

/// Single scored attempt at a fitness test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub id: String,
    pub athlete_id: String,
    pub test_name: String,
    pub score: f64,
    pub unit: String,
    /// ISO-8601 date (`YYYY-MM-DD`); lexicographic order is submission order.
    pub date: String,
    pub percentile: i64,
    /// Free-text category ("Speed", "Power", ...) that selects the
    /// comparison rule in `service::ranking`.
    pub category: String,
    /// Cached flag owned by `ResultService`; exactly one result per
    /// (athlete_id, test_name) carries it once any result exists.
    pub is_personal_best: bool,
}

impl TestResult {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: impl Into<String>,
        athlete_id: impl Into<String>,
        test_name: impl Into<String>,
        score: f64,
        unit: impl Into<String>,
        date: impl Into<String>,
        percentile: i64,
        category: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            athlete_id: athlete_id.into(),
            test_name: test_name.into(),
            score,
            unit: unit.into(),
            date: date.into(),
            percentile,
            category: category.into(),
            is_personal_best: false,
        }
    }
}

/// Scouting/recruiting opportunity classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpportunityType {
    Scholarship,
    Trial,
    Camp,
    Internship,
    Job,
    Competition,
}

/// Opportunity posting record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    pub id: String,
    pub title: String,
    pub organization: String,
    pub kind: OpportunityType,
    pub sport: String,
    pub location: String,
    /// Application deadline, epoch milliseconds.
    pub deadline: i64,
    pub description: String,
    pub requirements: Vec<String>,
    pub benefits: Vec<String>,
    pub applied: bool,
}

impl Opportunity {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        kind: OpportunityType,
        sport: impl Into<String>,
        location: impl Into<String>,
        deadline: i64,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            organization: String::new(),
            kind,
            sport: sport.into(),
            location: location.into(),
            deadline,
            description: String::new(),
            requirements: Vec::new(),
            benefits: Vec::new(),
            applied: false,
        }
    }
}

/// Message payload classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Text,
    Image,
    Video,
    Audio,
    File,
}

/// Direct message inside a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub content: String,
    /// Send time, epoch milliseconds; orders messages within a conversation.
    pub timestamp: i64,
    pub read: bool,
    pub kind: MessageType,
    pub media_url: Option<String>,
    /// Optional id of the message this one replies to.
    pub reply_to: Option<String>,
}

impl Message {
    /// Creates an unread text message.
    pub fn text(
        id: impl Into<String>,
        conversation_id: impl Into<String>,
        sender_id: impl Into<String>,
        receiver_id: impl Into<String>,
        content: impl Into<String>,
        timestamp: i64,
    ) -> Self {
        Self {
            id: id.into(),
            conversation_id: conversation_id.into(),
            sender_id: sender_id.into(),
            receiver_id: receiver_id.into(),
            content: content.into(),
            timestamp,
            read: false,
            kind: MessageType::Text,
            media_url: None,
            reply_to: None,
        }
    }
}

/// Conversation header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub participant_ids: Vec<String>,
    /// Weak reference; the message may already be deleted.
    pub last_message_id: Option<String>,
    /// Derived: always the exact count of unread messages in this
    /// conversation. Reconciled on every write path that can change it.
    pub unread_count: i64,
    /// Epoch milliseconds of the latest message; drives list ordering.
    pub last_activity: i64,
}

impl Conversation {
    pub fn new(id: impl Into<String>, participant_ids: Vec<String>) -> Self {
        Self {
            id: id.into(),
            participant_ids,
            last_message_id: None,
            unread_count: 0,
            last_activity: 0,
        }
    }
}

/// One ranked row of a leaderboard partition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub id: String,
    pub athlete_id: String,
    pub athlete_name: String,
    /// 1-based, contiguous within a test_name partition. Owned by the
    /// ranking rebuild; not independently settable through services.
    pub rank: i64,
    pub score: f64,
    pub test_name: String,
    pub sport: String,
    pub location: String,
    pub verified: bool,
}

impl LeaderboardEntry {
    /// Engine-produced entry id, stable per (test, athlete).
    pub fn partition_id(test_name: &str, athlete_id: &str) -> String {
        format!("{test_name}:{athlete_id}")
    }
}

/// Achievement rarity tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rarity {
    Common,
    Rare,
    Epic,
    Legendary,
}

/// Unlockable achievement record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Achievement {
    pub id: String,
    pub athlete_id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub rarity: Rarity,
    /// ISO-8601 date; `None` means still locked.
    pub unlocked_date: Option<String>,
}

impl Achievement {
    pub fn is_unlocked(&self) -> bool {
        self.unlocked_date.is_some()
    }
}

/// Difficulty tier for catalog tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
    Expert,
}

/// Static catalog entry describing a fitness test protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitnessTest {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: String,
    pub instructions: Vec<String>,
    pub duration_secs: i64,
    pub difficulty: Difficulty,
}

#[cfg(test)]
mod tests {
    use super::{Achievement, Conversation, LeaderboardEntry, Message, Rarity, TestResult};

    #[test]
    fn new_result_starts_without_best_flag() {
        let result = TestResult::new("t1", "a1", "40yd", 4.8, "s", "2025-01-10", 70, "Speed");
        assert!(!result.is_personal_best);
    }

    #[test]
    fn text_message_defaults_to_unread() {
        let message = Message::text("m1", "c1", "a1", "a2", "hi", 1_000);
        assert!(!message.read);
        assert!(message.reply_to.is_none());
    }

    #[test]
    fn new_conversation_has_no_activity() {
        let conversation = Conversation::new("c1", vec!["a1".into(), "a2".into()]);
        assert_eq!(conversation.unread_count, 0);
        assert!(conversation.last_message_id.is_none());
    }

    #[test]
    fn partition_id_is_stable() {
        assert_eq!(LeaderboardEntry::partition_id("40yd", "a1"), "40yd:a1");
    }

    #[test]
    fn achievement_lock_state_follows_unlock_date() {
        let mut achievement = Achievement {
            id: "ach1".into(),
            athlete_id: "a1".into(),
            title: "First Sprint".into(),
            description: String::new(),
            category: "Speed".into(),
            rarity: Rarity::Common,
            unlocked_date: None,
        };
        assert!(!achievement.is_unlocked());
        achievement.unlocked_date = Some("2025-02-01".into());
        assert!(achievement.is_unlocked());
    }
}
