//! Catalog of the live queries the cache supports.
//!
//! Each function pairs one repository query with the record kinds whose
//! mutations can change its result, so subscribers receive a fresh
//! snapshot exactly when the answer may have moved. Live snapshots use
//! the lenient decode policy: one bad row should not blank a screen that
//! is already on display.

use crate::db::CacheDb;
use crate::live::Live;
use crate::model::records::{
    Athlete, Conversation, LeaderboardEntry, Message, Opportunity, TestResult,
};
use crate::model::RecordKind;
use crate::repo::athlete_repo::{query_athletes, AthleteFilter};
use crate::repo::leaderboard_repo::{query_entries_for_test, query_entries_for_test_and_sport};
use crate::repo::message_repo::{
    query_conversations, query_messages_in_conversation, query_unread_conversations,
};
use crate::repo::opportunity_repo::query_upcoming_opportunities;
use crate::repo::test_result_repo::query_results_for_athlete;
use crate::repo::{DecodePolicy, RepoResult};

const POLICY: DecodePolicy = DecodePolicy::Lenient;

/// All athletes, ordered by name.
pub fn observe_athletes(db: &CacheDb) -> RepoResult<Live<Athlete>> {
    db.subscribe(&[RecordKind::Athlete], |conn| {
        query_athletes(conn, POLICY, AthleteFilter::All)
    })
}

/// Athletes in one sport, ordered by name.
pub fn observe_athletes_by_sport(db: &CacheDb, sport: &str) -> RepoResult<Live<Athlete>> {
    let sport = sport.to_owned();
    db.subscribe(&[RecordKind::Athlete], move |conn| {
        query_athletes(conn, POLICY, AthleteFilter::Sport(&sport))
    })
}

/// Athletes the local user follows, ordered by name.
pub fn observe_following_athletes(db: &CacheDb) -> RepoResult<Live<Athlete>> {
    db.subscribe(&[RecordKind::Athlete], |conn| {
        query_athletes(conn, POLICY, AthleteFilter::Following)
    })
}

/// One athlete's results, newest first.
pub fn observe_results_for_athlete(db: &CacheDb, athlete_id: &str) -> RepoResult<Live<TestResult>> {
    let athlete_id = athlete_id.to_owned();
    db.subscribe(&[RecordKind::TestResult], move |conn| {
        query_results_for_athlete(conn, POLICY, &athlete_id)
    })
}

/// One conversation's transcript, oldest first.
pub fn observe_messages_in_conversation(
    db: &CacheDb,
    conversation_id: &str,
) -> RepoResult<Live<Message>> {
    let conversation_id = conversation_id.to_owned();
    db.subscribe(&[RecordKind::Message], move |conn| {
        query_messages_in_conversation(conn, POLICY, &conversation_id)
    })
}

/// All conversations, most recent activity first.
///
/// Covers message mutations too: sending or reading a message changes the
/// header counters even when no conversation row is written directly.
pub fn observe_conversations(db: &CacheDb) -> RepoResult<Live<Conversation>> {
    db.subscribe(&[RecordKind::Conversation, RecordKind::Message], |conn| {
        query_conversations(conn, POLICY)
    })
}

/// Conversations with unread messages, most recent activity first.
pub fn observe_unread_conversations(db: &CacheDb) -> RepoResult<Live<Conversation>> {
    db.subscribe(&[RecordKind::Conversation, RecordKind::Message], |conn| {
        query_unread_conversations(conn, POLICY)
    })
}

/// Full board for one test, best rank first.
pub fn observe_leaderboard_for_test(
    db: &CacheDb,
    test_name: &str,
) -> RepoResult<Live<LeaderboardEntry>> {
    let test_name = test_name.to_owned();
    db.subscribe(&[RecordKind::LeaderboardEntry], move |conn| {
        query_entries_for_test(conn, POLICY, &test_name)
    })
}

/// Board for one test restricted to one sport, best rank first.
pub fn observe_leaderboard_for_test_and_sport(
    db: &CacheDb,
    test_name: &str,
    sport: &str,
) -> RepoResult<Live<LeaderboardEntry>> {
    let test_name = test_name.to_owned();
    let sport = sport.to_owned();
    db.subscribe(&[RecordKind::LeaderboardEntry], move |conn| {
        query_entries_for_test_and_sport(conn, POLICY, &test_name, &sport)
    })
}

/// Opportunities whose deadline has not passed, soonest first.
///
/// `now_millis` is captured at subscription time; the horizon does not
/// advance between refreshes.
pub fn observe_upcoming_opportunities(
    db: &CacheDb,
    now_millis: i64,
) -> RepoResult<Live<Opportunity>> {
    db.subscribe(&[RecordKind::Opportunity], move |conn| {
        query_upcoming_opportunities(conn, POLICY, now_millis)
    })
}
