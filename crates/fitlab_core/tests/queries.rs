//! Fixed query vocabulary: filters, orderings, strict enum decoding.

use fitlab_core::repo::achievement_repo::SqliteAchievementRepository;
use fitlab_core::repo::athlete_repo::SqliteAthleteRepository;
use fitlab_core::repo::fitness_test_repo::SqliteFitnessTestRepository;
use fitlab_core::repo::message_repo::{SqliteConversationRepository, SqliteMessageRepository};
use fitlab_core::repo::opportunity_repo::SqliteOpportunityRepository;
use fitlab_core::repo::test_result_repo::SqliteTestResultRepository;
use fitlab_core::{
    Achievement, Athlete, CacheDb, Conversation, DecodePolicy, Difficulty, FitnessTest, Message,
    Opportunity, OpportunityType, Rarity, RepoError, TestResult,
};
use std::sync::Arc;

fn open_cache() -> Arc<CacheDb> {
    CacheDb::open_in_memory().expect("in-memory cache should open")
}

#[test]
fn athletes_filter_by_sport_and_location() {
    let db = open_cache();
    let repo = SqliteAthleteRepository::try_new(&db).expect("repo");

    repo.put_athletes(&[
        Athlete::new("a1", "Ana", 20, "Track", "Austin"),
        Athlete::new("a2", "Ben", 22, "Swimming", "Austin"),
        Athlete::new("a3", "Cleo", 24, "Track", "Denver"),
    ])
    .expect("seed");

    let track: Vec<String> = repo
        .athletes_by_sport("Track")
        .expect("by sport")
        .into_iter()
        .map(|a| a.id)
        .collect();
    assert_eq!(track, vec!["a1", "a3"]);

    let austin = repo.athletes_by_location("Austin").expect("by location");
    assert_eq!(austin.len(), 2);
}

#[test]
fn results_order_newest_first() {
    let db = open_cache();
    let repo = SqliteTestResultRepository::try_new(&db).expect("repo");

    repo.put_results(&[
        TestResult::new("r1", "a1", "40yd", 4.8, "s", "2025-01-01", 50, "Speed"),
        TestResult::new("r2", "a1", "40yd", 4.6, "s", "2025-03-01", 60, "Speed"),
        TestResult::new("r3", "a1", "vertical", 30.0, "in", "2025-02-01", 55, "Power"),
    ])
    .expect("seed");

    let history: Vec<String> = repo
        .results_for_athlete("a1")
        .expect("history")
        .into_iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(history, vec!["r2", "r3", "r1"]);

    let pair: Vec<String> = repo
        .results_for_athlete_and_test("a1", "40yd")
        .expect("pair")
        .into_iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(pair, vec!["r2", "r1"]);
}

#[test]
fn top_results_respect_score_direction() {
    let db = open_cache();
    let repo = SqliteTestResultRepository::try_new(&db).expect("repo");

    repo.put_results(&[
        TestResult::new("r1", "a1", "40yd", 4.8, "s", "2025-01-01", 50, "Speed"),
        TestResult::new("r2", "a2", "40yd", 4.5, "s", "2025-01-02", 70, "Speed"),
        TestResult::new("r3", "a3", "40yd", 4.7, "s", "2025-01-03", 60, "Speed"),
    ])
    .expect("seed");

    let fastest: Vec<String> = repo
        .top_results_for_test("40yd", 2, true)
        .expect("top")
        .into_iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(fastest, vec!["r2", "r3"]);

    let highest: Vec<String> = repo
        .top_results_for_test("40yd", 1, false)
        .expect("top")
        .into_iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(highest, vec!["r1"]);
}

#[test]
fn opportunities_filter_and_order_by_deadline() {
    let db = open_cache();
    let repo = SqliteOpportunityRepository::try_new(&db).expect("repo");

    let mut expired = Opportunity::new("o1", "Old Camp", OpportunityType::Camp, "Track", "Austin", 1_000);
    expired.applied = true;
    repo.put_opportunities(&[
        expired,
        Opportunity::new("o2", "Trial", OpportunityType::Trial, "Track", "Austin", 5_000),
        Opportunity::new("o3", "Scholarship", OpportunityType::Scholarship, "Swimming", "Denver", 3_000),
    ])
    .expect("seed");

    let upcoming: Vec<String> = repo
        .upcoming_opportunities(2_000)
        .expect("upcoming")
        .into_iter()
        .map(|o| o.id)
        .collect();
    assert_eq!(upcoming, vec!["o3", "o2"]);

    let trials = repo
        .opportunities_by_type(OpportunityType::Trial)
        .expect("by type");
    assert_eq!(trials.len(), 1);
    assert_eq!(trials[0].id, "o2");

    assert_eq!(repo.applied_opportunities().expect("applied").len(), 1);
    assert_eq!(repo.available_opportunities().expect("available").len(), 2);
}

#[test]
fn conversations_order_by_activity_and_filter_by_participant() {
    let db = open_cache();
    let repo = SqliteConversationRepository::try_new(&db).expect("repo");

    let mut c1 = Conversation::new("c1", vec!["a1".into(), "a2".into()]);
    c1.last_activity = 100;
    let mut c2 = Conversation::new("c2", vec!["a1".into(), "a3".into()]);
    c2.last_activity = 300;
    let mut c3 = Conversation::new("c3", vec!["a2".into(), "a3".into()]);
    c3.last_activity = 200;
    repo.put_conversations(&[c1, c2, c3]).expect("seed");

    let ordered: Vec<String> = repo
        .list_conversations()
        .expect("list")
        .into_iter()
        .map(|c| c.id)
        .collect();
    assert_eq!(ordered, vec!["c2", "c3", "c1"]);

    let mine: Vec<String> = repo
        .conversations_for_participant("a1")
        .expect("participant")
        .into_iter()
        .map(|c| c.id)
        .collect();
    assert_eq!(mine, vec!["c2", "c1"]);
}

#[test]
fn messages_order_oldest_first_within_conversation() {
    let db = open_cache();
    let repo = SqliteMessageRepository::try_new(&db).expect("repo");

    repo.put_messages(&[
        Message::text("m2", "c1", "a1", "a2", "second", 200),
        Message::text("m1", "c1", "a2", "a1", "first", 100),
        Message::text("m3", "c2", "a1", "a3", "elsewhere", 50),
    ])
    .expect("seed");

    let transcript: Vec<String> = repo
        .messages_in_conversation("c1")
        .expect("transcript")
        .into_iter()
        .map(|m| m.id)
        .collect();
    assert_eq!(transcript, vec!["m1", "m2"]);
}

#[test]
fn achievements_filter_by_rarity() {
    let db = open_cache();
    let repo = SqliteAchievementRepository::try_new(&db).expect("repo");

    let base = |id: &str, rarity: Rarity| Achievement {
        id: id.into(),
        athlete_id: "a1".into(),
        title: format!("Title {id}"),
        description: String::new(),
        category: "Speed".into(),
        rarity,
        unlocked_date: None,
    };
    repo.put_achievements(&[
        base("ach1", Rarity::Common),
        base("ach2", Rarity::Legendary),
        base("ach3", Rarity::Common),
    ])
    .expect("seed");

    assert_eq!(
        repo.achievements_by_rarity(Rarity::Common).expect("rarity").len(),
        2
    );
    assert_eq!(
        repo.achievements_for_athlete("a1").expect("athlete").len(),
        3
    );
    assert_eq!(
        repo.delete_achievements_for_athlete("a1").expect("cascade"),
        3
    );
}

#[test]
fn fitness_tests_filter_by_difficulty() {
    let db = open_cache();
    let repo = SqliteFitnessTestRepository::try_new(&db).expect("repo");

    let test = |id: &str, difficulty: Difficulty| FitnessTest {
        id: id.into(),
        name: format!("Test {id}"),
        description: String::new(),
        category: "Speed".into(),
        instructions: vec!["warm up".into()],
        duration_secs: 60,
        difficulty,
    };
    repo.put_tests(&[
        test("t1", Difficulty::Beginner),
        test("t2", Difficulty::Expert),
    ])
    .expect("seed");

    let beginner = repo
        .tests_by_difficulty(Difficulty::Beginner)
        .expect("difficulty");
    assert_eq!(beginner.len(), 1);
    assert_eq!(beginner[0].instructions, vec!["warm up".to_string()]);
}

#[test]
fn unknown_enum_name_is_skipped_leniently_and_fatal_strictly() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("cache.db");
    let db = CacheDb::open(&path).expect("cache");
    let repo = SqliteMessageRepository::try_new(&db).expect("repo");

    repo.put_messages(&[
        Message::text("m1", "c1", "a1", "a2", "ok", 100),
        Message::text("m2", "c1", "a1", "a2", "bad row", 200),
    ])
    .expect("seed");

    let raw = rusqlite::Connection::open(&path).expect("side connection");
    raw.execute("UPDATE messages SET type = 'TEXT' WHERE id = 'm2';", [])
        .expect("corrupt enum name");

    // Case-sensitive decode: 'TEXT' is not 'text'.
    let lenient = repo.messages_in_conversation("c1").expect("lenient read");
    assert_eq!(lenient.len(), 1);
    assert_eq!(lenient[0].id, "m1");

    let strict = SqliteMessageRepository::try_new(&db)
        .expect("repo")
        .with_policy(DecodePolicy::Strict);
    let err = strict
        .messages_in_conversation("c1")
        .expect_err("strict read must abort");
    assert!(matches!(err, RepoError::InvalidData(_)));
}
