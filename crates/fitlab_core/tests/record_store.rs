//! Record store behavior: insert-or-replace, batches, idempotent deletes.

use fitlab_core::repo::athlete_repo::SqliteAthleteRepository;
use fitlab_core::repo::test_result_repo::SqliteTestResultRepository;
use fitlab_core::{Athlete, CacheDb, RepoError, TestResult};
use std::sync::Arc;

fn open_cache() -> Arc<CacheDb> {
    CacheDb::open_in_memory().expect("in-memory cache should open")
}

fn sample_athlete(id: &str) -> Athlete {
    let mut athlete = Athlete::new(id, format!("Athlete {id}"), 21, "Track", "Austin");
    athlete.bio = "sprinter".into();
    athlete
        .social_media
        .insert("instagram".into(), format!("@{id}"));
    athlete
}

#[test]
fn put_then_get_round_trips() {
    let db = open_cache();
    let repo = SqliteAthleteRepository::try_new(&db).expect("repo should construct");

    let athlete = sample_athlete("a1");
    repo.put_athlete(&athlete).expect("put should succeed");

    let loaded = repo.get_athlete("a1").expect("get should succeed");
    assert_eq!(loaded, athlete);
}

#[test]
fn put_replaces_existing_row_completely() {
    let db = open_cache();
    let repo = SqliteAthleteRepository::try_new(&db).expect("repo should construct");

    let mut athlete = sample_athlete("a1");
    repo.put_athlete(&athlete).expect("first put");

    athlete.location = "Denver".into();
    athlete.social_media.clear();
    repo.put_athlete(&athlete).expect("second put");

    let loaded = repo.get_athlete("a1").expect("get should succeed");
    assert_eq!(loaded.location, "Denver");
    assert!(loaded.social_media.is_empty());
}

#[test]
fn get_missing_is_not_found() {
    let db = open_cache();
    let repo = SqliteAthleteRepository::try_new(&db).expect("repo should construct");

    let err = repo.get_athlete("ghost").expect_err("missing id must fail");
    assert!(matches!(err, RepoError::NotFound { .. }));
}

#[test]
fn delete_is_idempotent() {
    let db = open_cache();
    let repo = SqliteAthleteRepository::try_new(&db).expect("repo should construct");

    repo.put_athlete(&sample_athlete("a1")).expect("put");
    assert!(repo.delete_athlete("a1").expect("first delete"));
    assert!(!repo.delete_athlete("a1").expect("second delete"));
    assert!(!repo.delete_athlete("never-existed").expect("third delete"));
}

#[test]
fn batch_put_lands_all_rows() {
    let db = open_cache();
    let repo = SqliteAthleteRepository::try_new(&db).expect("repo should construct");

    let batch: Vec<Athlete> = (1..=5).map(|i| sample_athlete(&format!("a{i}"))).collect();
    repo.put_athletes(&batch).expect("batch put");

    let listed = repo.list_athletes().expect("list");
    assert_eq!(listed.len(), 5);
}

#[test]
fn delete_by_athlete_reports_removed_count() {
    let db = open_cache();
    let repo = SqliteTestResultRepository::try_new(&db).expect("repo should construct");

    for i in 0..3 {
        repo.put_result(&TestResult::new(
            format!("r{i}"),
            "a1",
            "40yd",
            4.5 + i as f64 / 10.0,
            "s",
            format!("2025-01-0{}", i + 1),
            50,
            "Speed",
        ))
        .expect("put result");
    }
    repo.put_result(&TestResult::new(
        "r-other", "a2", "40yd", 4.9, "s", "2025-01-04", 40, "Speed",
    ))
    .expect("put other result");

    assert_eq!(repo.delete_results_for_athlete("a1").expect("cascade"), 3);
    assert_eq!(repo.delete_results_for_athlete("a1").expect("repeat"), 0);
    assert_eq!(repo.list_results().expect("list").len(), 1);
}

#[test]
fn set_following_targets_one_row() {
    let db = open_cache();
    let repo = SqliteAthleteRepository::try_new(&db).expect("repo should construct");

    repo.put_athlete(&sample_athlete("a1")).expect("put a1");
    repo.put_athlete(&sample_athlete("a2")).expect("put a2");

    repo.set_following("a1", true).expect("set following");
    let following = repo.following_athletes().expect("query");
    assert_eq!(following.len(), 1);
    assert_eq!(following[0].id, "a1");

    let err = repo
        .set_following("ghost", true)
        .expect_err("absent id must fail");
    assert!(matches!(err, RepoError::NotFound { .. }));
}

#[test]
fn corrupt_composite_field_reads_as_empty() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("cache.db");
    let db = CacheDb::open(&path).expect("file-backed cache should open");
    let repo = SqliteAthleteRepository::try_new(&db).expect("repo should construct");

    let mut athlete = sample_athlete("a1");
    athlete.achievements = vec!["ach1".into()];
    repo.put_athlete(&athlete).expect("put");

    // Corrupt the stored JSON through a side connection.
    let raw = rusqlite::Connection::open(&path).expect("side connection");
    raw.execute(
        "UPDATE athletes SET achievements = 'not json', personal_bests = '[broken' WHERE id = 'a1';",
        [],
    )
    .expect("corrupt row");

    let loaded = repo.get_athlete("a1").expect("get should still succeed");
    assert!(loaded.achievements.is_empty());
    assert!(loaded.personal_bests.is_empty());
    assert_eq!(loaded.name, athlete.name);
}
