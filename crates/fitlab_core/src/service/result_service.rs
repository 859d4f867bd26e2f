//! Result recording workflow: personal bests and leaderboard upkeep.
//!
//! # Responsibility
//! - Record scored attempts and keep every derived view of them exact:
//!   the one-winner `is_personal_best` flag, the athlete's cached
//!   personal-bests map, and the per-test leaderboard partition.
//!
//! # Invariants
//! - All maintenance for one recording happens in one transaction; live
//!   queries see either the whole update or none of it.
//! - Once any result exists for an (athlete, test) pair, exactly one of
//!   them carries `is_personal_best`.
//! - Leaderboard ranks are recomputed from scratch on every rebuild,
//!   never patched incrementally.

use crate::db::CacheDb;
use crate::model::records::{LeaderboardEntry, TestResult};
use crate::model::RecordKind;
use crate::repo::athlete_repo::{find_athlete, write_personal_bests};
use crate::repo::leaderboard_repo::{clear_partition, insert_entry};
use crate::repo::test_result_repo::{
    find_result, insert_result, query_best_results_for_test, query_results_for_pair,
};
use crate::repo::{ensure_connection_ready, DecodePolicy, RepoError, RepoResult};
use crate::service::ranking::{best_result, rank_of, sort_for_ranking, ScoreOrder};
use log::{info, warn};
use rusqlite::{params, Connection};

/// Orchestrates result writes and their derived records.
pub struct ResultService<'db> {
    db: &'db CacheDb,
}

impl<'db> ResultService<'db> {
    /// Constructs the service from a migrated/ready cache handle.
    pub fn try_new(db: &'db CacheDb) -> RepoResult<Self> {
        db.with_conn(|conn| {
            ensure_connection_ready(conn, "test_results", &["id", "athlete_id", "test_name"])?;
            ensure_connection_ready(conn, "leaderboard_entries", &["id", "rank", "test_name"])?;
            ensure_connection_ready(conn, "athletes", &["id", "personal_bests"])
        })?;
        Ok(Self { db })
    }

    /// Records one attempt and refreshes everything derived from it.
    pub fn record_result(&self, result: &TestResult) -> RepoResult<()> {
        self.db.mutate(
            &[
                RecordKind::TestResult,
                RecordKind::Athlete,
                RecordKind::LeaderboardEntry,
            ],
            |conn| {
                let tx = conn.transaction()?;
                insert_result(&tx, result)?;
                refresh_personal_best(&tx, &result.athlete_id, &result.test_name)?;
                rebuild_partition(&tx, &result.test_name)?;
                tx.commit()?;
                info!(
                    "event=result_recorded module=service status=ok athlete_id={} test_name={} score={}",
                    result.athlete_id, result.test_name, result.score
                );
                Ok(())
            },
        )
    }

    /// Removes one attempt and refreshes the derived records it backed.
    ///
    /// Idempotent: removing an absent id is a no-op returning `false`.
    pub fn remove_result(&self, id: &str) -> RepoResult<bool> {
        self.db.mutate(
            &[
                RecordKind::TestResult,
                RecordKind::Athlete,
                RecordKind::LeaderboardEntry,
            ],
            |conn| {
                let tx = conn.transaction()?;
                let existing = match find_result(&tx, id)? {
                    Some(result) => result,
                    None => return Ok(false),
                };
                tx.execute("DELETE FROM test_results WHERE id = ?1;", [id])?;
                refresh_personal_best(&tx, &existing.athlete_id, &existing.test_name)?;
                rebuild_partition(&tx, &existing.test_name)?;
                tx.commit()?;
                Ok(true)
            },
        )
    }

    /// Recomputes one test's leaderboard from its personal-best rows.
    pub fn rebuild_leaderboard(&self, test_name: &str) -> RepoResult<()> {
        self.db.mutate(&[RecordKind::LeaderboardEntry], |conn| {
            let tx = conn.transaction()?;
            rebuild_partition(&tx, test_name)?;
            tx.commit()?;
            Ok(())
        })
    }

    /// The cached best-score map for one athlete; `NotFound` when absent.
    pub fn personal_bests(
        &self,
        athlete_id: &str,
    ) -> RepoResult<std::collections::BTreeMap<String, String>> {
        self.db.with_conn(|conn| {
            find_athlete(conn, athlete_id)?
                .map(|athlete| athlete.personal_bests)
                .ok_or_else(|| RepoError::not_found(RecordKind::Athlete, athlete_id))
        })
    }
}

/// Re-elects the single personal-best winner for one (athlete, test)
/// pair and mirrors the formatted score into the athlete's cached map.
fn refresh_personal_best(conn: &Connection, athlete_id: &str, test_name: &str) -> RepoResult<()> {
    let attempts = query_results_for_pair(conn, DecodePolicy::Lenient, athlete_id, test_name)?;

    conn.execute(
        "UPDATE test_results SET is_personal_best = 0
         WHERE athlete_id = ?1 AND test_name = ?2;",
        params![athlete_id, test_name],
    )?;

    let winner = match winner_of(&attempts) {
        Some(winner) => winner,
        None => {
            // Last attempt gone: drop the stale map entry too.
            if let Some(mut athlete) = find_athlete(conn, athlete_id)? {
                if athlete.personal_bests.remove(test_name).is_some() {
                    write_personal_bests(conn, athlete_id, &athlete.personal_bests)?;
                }
            }
            return Ok(());
        }
    };

    conn.execute(
        "UPDATE test_results SET is_personal_best = 1 WHERE id = ?1;",
        [&winner.id],
    )?;

    if let Some(mut athlete) = find_athlete(conn, athlete_id)? {
        athlete.personal_bests.insert(
            test_name.to_owned(),
            format!("{} {}", winner.score, winner.unit),
        );
        write_personal_bests(conn, athlete_id, &athlete.personal_bests)?;
    }

    Ok(())
}

fn winner_of(attempts: &[TestResult]) -> Option<&TestResult> {
    let order = ScoreOrder::for_category(&attempts.first()?.category);
    best_result(order, attempts)
}

/// Rebuilds one test's board from its current personal-best rows.
///
/// Results whose athlete profile is missing are skipped with a warning;
/// ranks stay contiguous over the rows that remain.
fn rebuild_partition(conn: &Connection, test_name: &str) -> RepoResult<()> {
    clear_partition(conn, test_name)?;

    let mut best_rows = query_best_results_for_test(conn, DecodePolicy::Lenient, test_name)?;
    let order = match best_rows.first() {
        Some(row) => ScoreOrder::for_category(&row.category),
        None => return Ok(()),
    };
    sort_for_ranking(order, &mut best_rows);

    let mut ranked = Vec::with_capacity(best_rows.len());
    for row in &best_rows {
        match find_athlete(conn, &row.athlete_id)? {
            Some(athlete) => ranked.push((row, athlete)),
            None => warn!(
                "event=leaderboard_rebuild module=service status=skipped test_name={test_name} athlete_id={} reason=missing_athlete",
                row.athlete_id
            ),
        }
    }

    for (index, (row, athlete)) in ranked.iter().enumerate() {
        insert_entry(
            conn,
            &LeaderboardEntry {
                id: LeaderboardEntry::partition_id(test_name, &row.athlete_id),
                athlete_id: row.athlete_id.clone(),
                athlete_name: athlete.name.clone(),
                rank: rank_of(index),
                score: row.score,
                test_name: test_name.to_owned(),
                sport: athlete.sport.clone(),
                location: athlete.location.clone(),
                verified: athlete.verified,
            },
        )?;
    }

    Ok(())
}
