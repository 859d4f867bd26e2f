//! Leaderboard rebuilds: ranks, tie-breaks, partitions, missing profiles.

use fitlab_core::repo::athlete_repo::SqliteAthleteRepository;
use fitlab_core::repo::leaderboard_repo::SqliteLeaderboardRepository;
use fitlab_core::{Athlete, CacheDb, ResultService, TestResult};
use std::sync::Arc;

fn open_cache() -> Arc<CacheDb> {
    CacheDb::open_in_memory().expect("in-memory cache should open")
}

fn seed_athlete(db: &CacheDb, id: &str, name: &str, sport: &str) {
    let mut athlete = Athlete::new(id, name, 21, sport, "Austin");
    athlete.verified = id.ends_with('1');
    SqliteAthleteRepository::try_new(db)
        .expect("repo")
        .put_athlete(&athlete)
        .expect("seed athlete");
}

fn speed_result(id: &str, athlete_id: &str, score: f64, date: &str) -> TestResult {
    TestResult::new(id, athlete_id, "40yd", score, "s", date, 50, "Speed")
}

#[test]
fn board_ranks_are_one_based_and_contiguous() {
    let db = open_cache();
    for (id, name) in [("a1", "Ana"), ("a2", "Ben"), ("a3", "Cleo")] {
        seed_athlete(&db, id, name, "Track");
    }
    let service = ResultService::try_new(&db).expect("service");
    service.record_result(&speed_result("r1", "a1", 4.8, "2025-01-01")).expect("record");
    service.record_result(&speed_result("r2", "a2", 4.5, "2025-01-02")).expect("record");
    service.record_result(&speed_result("r3", "a3", 4.7, "2025-01-03")).expect("record");

    let board = SqliteLeaderboardRepository::try_new(&db)
        .expect("repo")
        .entries_for_test("40yd")
        .expect("board");
    let ranked: Vec<(i64, String)> = board
        .into_iter()
        .map(|e| (e.rank, e.athlete_id))
        .collect();
    assert_eq!(
        ranked,
        vec![(1, "a2".into()), (2, "a3".into()), (3, "a1".into())]
    );
}

#[test]
fn tied_scores_rank_by_earlier_date_then_athlete_id() {
    let db = open_cache();
    for id in ["a1", "a2", "a3"] {
        seed_athlete(&db, id, id, "Track");
    }
    let service = ResultService::try_new(&db).expect("service");
    service.record_result(&speed_result("r1", "a2", 4.5, "2025-01-05")).expect("record");
    service.record_result(&speed_result("r2", "a3", 4.5, "2025-01-01")).expect("record");
    service.record_result(&speed_result("r3", "a1", 4.5, "2025-01-05")).expect("record");

    let board = SqliteLeaderboardRepository::try_new(&db)
        .expect("repo")
        .entries_for_test("40yd")
        .expect("board");
    let order: Vec<String> = board.into_iter().map(|e| e.athlete_id).collect();
    assert_eq!(order, vec!["a3", "a1", "a2"]);
}

#[test]
fn board_uses_only_personal_bests() {
    let db = open_cache();
    seed_athlete(&db, "a1", "Ana", "Track");
    let service = ResultService::try_new(&db).expect("service");
    service.record_result(&speed_result("r1", "a1", 4.8, "2025-01-01")).expect("record");
    service.record_result(&speed_result("r2", "a1", 4.5, "2025-02-01")).expect("record");

    let board = SqliteLeaderboardRepository::try_new(&db)
        .expect("repo")
        .entries_for_test("40yd")
        .expect("board");
    assert_eq!(board.len(), 1);
    assert_eq!(board[0].score, 4.5);
    assert_eq!(board[0].athlete_name, "Ana");
}

#[test]
fn rebuild_replaces_rows_instead_of_accumulating() {
    let db = open_cache();
    seed_athlete(&db, "a1", "Ana", "Track");
    let service = ResultService::try_new(&db).expect("service");
    service.record_result(&speed_result("r1", "a1", 4.8, "2025-01-01")).expect("record");
    service.record_result(&speed_result("r2", "a1", 4.5, "2025-02-01")).expect("record");
    service.rebuild_leaderboard("40yd").expect("explicit rebuild");

    let repo = SqliteLeaderboardRepository::try_new(&db).expect("repo");
    let board = repo.entries_for_test("40yd").expect("board");
    assert_eq!(board.len(), 1);
    assert_eq!(board[0].id, "40yd:a1");
}

#[test]
fn missing_athlete_profiles_are_skipped_with_contiguous_ranks() {
    let db = open_cache();
    seed_athlete(&db, "a1", "Ana", "Track");
    seed_athlete(&db, "a3", "Cleo", "Track");
    let service = ResultService::try_new(&db).expect("service");
    service.record_result(&speed_result("r1", "a1", 4.8, "2025-01-01")).expect("record");
    service.record_result(&speed_result("r2", "a2", 4.5, "2025-01-02")).expect("record");
    service.record_result(&speed_result("r3", "a3", 4.7, "2025-01-03")).expect("record");

    let board = SqliteLeaderboardRepository::try_new(&db)
        .expect("repo")
        .entries_for_test("40yd")
        .expect("board");
    let ranked: Vec<(i64, String)> = board
        .into_iter()
        .map(|e| (e.rank, e.athlete_id))
        .collect();
    // a2 has no profile: skipped, the rest stay contiguous.
    assert_eq!(ranked, vec![(1, "a3".into()), (2, "a1".into())]);
}

#[test]
fn boards_partition_by_test_and_filter_by_sport() {
    let db = open_cache();
    seed_athlete(&db, "a1", "Ana", "Track");
    seed_athlete(&db, "a2", "Ben", "Swimming");
    let service = ResultService::try_new(&db).expect("service");
    service.record_result(&speed_result("r1", "a1", 4.8, "2025-01-01")).expect("record");
    service.record_result(&speed_result("r2", "a2", 4.5, "2025-01-02")).expect("record");
    service
        .record_result(&TestResult::new(
            "r3", "a1", "vertical", 30.0, "in", "2025-01-03", 50, "Power",
        ))
        .expect("record other test");

    let repo = SqliteLeaderboardRepository::try_new(&db).expect("repo");
    assert_eq!(repo.entries_for_test("40yd").expect("board").len(), 2);
    assert_eq!(repo.entries_for_test("vertical").expect("board").len(), 1);

    let track_only = repo
        .entries_for_test_and_sport("40yd", "Track")
        .expect("sport board");
    assert_eq!(track_only.len(), 1);
    assert_eq!(track_only[0].athlete_id, "a1");

    let top1 = repo.top_entries_for_test("40yd", 1).expect("top");
    assert_eq!(top1.len(), 1);
    assert_eq!(top1[0].athlete_id, "a2");
}

#[test]
fn clearing_a_partition_leaves_other_boards_alone() {
    let db = open_cache();
    seed_athlete(&db, "a1", "Ana", "Track");
    let service = ResultService::try_new(&db).expect("service");
    service.record_result(&speed_result("r1", "a1", 4.8, "2025-01-01")).expect("record");
    service
        .record_result(&TestResult::new(
            "r2", "a1", "vertical", 30.0, "in", "2025-01-02", 50, "Power",
        ))
        .expect("record");

    let repo = SqliteLeaderboardRepository::try_new(&db).expect("repo");
    assert_eq!(repo.clear_test("40yd").expect("clear"), 1);
    assert!(repo.entries_for_test("40yd").expect("board").is_empty());
    assert_eq!(repo.entries_for_test("vertical").expect("board").len(), 1);
}
