//! Leaderboard repository over the `leaderboard_entries` table.
//!
//! # Responsibility
//! - Store denormalized, pre-ranked leaderboard rows and answer the fixed
//!   board lookups (by test, by test and sport, top-N).
//! - Expose the partition-clear helper the result service uses when it
//!   rebuilds a board.
//!
//! # Invariants
//! - Entry ids follow `LeaderboardEntry::partition_id`, so a rebuild
//!   replaces rows in place instead of accumulating stale ones.
//! - Ranks are read back in stored order; this module never re-ranks.

use crate::db::CacheDb;
use crate::model::records::LeaderboardEntry;
use crate::model::RecordKind;
use crate::repo::{
    bool_to_int, collect_parsed, ensure_connection_ready, int_to_bool, DecodePolicy, RepoError,
    RepoResult,
};
use rusqlite::{params, Connection, Row};

const ENTRY_SELECT_SQL: &str = "SELECT
    id,
    athlete_id,
    athlete_name,
    rank,
    score,
    test_name,
    sport,
    location,
    verified
FROM leaderboard_entries";

const REQUIRED_COLUMNS: &[&str] = &["id", "athlete_id", "rank", "score", "test_name"];

/// SQLite-backed leaderboard repository.
pub struct SqliteLeaderboardRepository<'db> {
    db: &'db CacheDb,
    policy: DecodePolicy,
}

impl<'db> SqliteLeaderboardRepository<'db> {
    /// Constructs a repository from a migrated/ready cache handle.
    pub fn try_new(db: &'db CacheDb) -> RepoResult<Self> {
        db.with_conn(|conn| {
            ensure_connection_ready(conn, "leaderboard_entries", REQUIRED_COLUMNS)
        })?;
        Ok(Self {
            db,
            policy: DecodePolicy::default(),
        })
    }

    pub fn with_policy(mut self, policy: DecodePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Raw insert-or-replace of one ranked row. Board maintenance goes
    /// through `ResultService::rebuild_leaderboard`.
    pub fn put_entry(&self, entry: &LeaderboardEntry) -> RepoResult<()> {
        self.db
            .mutate(&[RecordKind::LeaderboardEntry], |conn| insert_entry(conn, entry))
    }

    /// Batch insert-or-replace; all rows land atomically.
    pub fn put_entries(&self, entries: &[LeaderboardEntry]) -> RepoResult<()> {
        self.db.mutate(&[RecordKind::LeaderboardEntry], |conn| {
            let tx = conn.transaction()?;
            for entry in entries {
                insert_entry(&tx, entry)?;
            }
            tx.commit()?;
            Ok(())
        })
    }

    /// Point lookup; absent ids are `NotFound`.
    pub fn get_entry(&self, id: &str) -> RepoResult<LeaderboardEntry> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{ENTRY_SELECT_SQL} WHERE id = ?1;"))?;
            let mut rows = stmt.query([id])?;
            match rows.next()? {
                Some(row) => parse_entry_row(row),
                None => Err(RepoError::not_found(RecordKind::LeaderboardEntry, id)),
            }
        })
    }

    /// Full board for one test, best rank first.
    pub fn entries_for_test(&self, test_name: &str) -> RepoResult<Vec<LeaderboardEntry>> {
        self.db
            .with_conn(|conn| query_entries_for_test(conn, self.policy, test_name))
    }

    /// Board for one test restricted to one sport, best rank first.
    pub fn entries_for_test_and_sport(
        &self,
        test_name: &str,
        sport: &str,
    ) -> RepoResult<Vec<LeaderboardEntry>> {
        self.db
            .with_conn(|conn| query_entries_for_test_and_sport(conn, self.policy, test_name, sport))
    }

    /// Top of the board: entries with `rank <= n`.
    pub fn top_entries_for_test(
        &self,
        test_name: &str,
        n: i64,
    ) -> RepoResult<Vec<LeaderboardEntry>> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{ENTRY_SELECT_SQL}
                 WHERE test_name = ?1 AND rank <= ?2
                 ORDER BY rank ASC, athlete_id ASC;"
            ))?;
            let rows = stmt.query(params![test_name, n])?;
            collect_parsed(rows, self.policy, RecordKind::LeaderboardEntry, parse_entry_row)
        })
    }

    /// Idempotent delete; returns whether a row was removed.
    pub fn delete_entry(&self, id: &str) -> RepoResult<bool> {
        self.db.mutate(&[RecordKind::LeaderboardEntry], |conn| {
            let changed = conn.execute("DELETE FROM leaderboard_entries WHERE id = ?1;", [id])?;
            Ok(changed > 0)
        })
    }

    /// Drops every row of one test's board; returns the count removed.
    pub fn clear_test(&self, test_name: &str) -> RepoResult<usize> {
        self.db.mutate(&[RecordKind::LeaderboardEntry], |conn| {
            clear_partition(conn, test_name)
        })
    }

    /// Drops every leaderboard row.
    pub fn delete_all(&self) -> RepoResult<usize> {
        self.db.mutate(&[RecordKind::LeaderboardEntry], |conn| {
            let removed = conn.execute("DELETE FROM leaderboard_entries;", [])?;
            Ok(removed)
        })
    }
}

pub(crate) fn insert_entry(conn: &Connection, entry: &LeaderboardEntry) -> RepoResult<()> {
    conn.execute(
        "INSERT OR REPLACE INTO leaderboard_entries (
            id, athlete_id, athlete_name, rank, score, test_name, sport,
            location, verified
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
        params![
            entry.id,
            entry.athlete_id,
            entry.athlete_name,
            entry.rank,
            entry.score,
            entry.test_name,
            entry.sport,
            entry.location,
            bool_to_int(entry.verified),
        ],
    )?;
    Ok(())
}

pub(crate) fn clear_partition(conn: &Connection, test_name: &str) -> RepoResult<usize> {
    let removed = conn.execute(
        "DELETE FROM leaderboard_entries WHERE test_name = ?1;",
        [test_name],
    )?;
    Ok(removed)
}

pub(crate) fn query_entries_for_test(
    conn: &Connection,
    policy: DecodePolicy,
    test_name: &str,
) -> RepoResult<Vec<LeaderboardEntry>> {
    let mut stmt = conn.prepare(&format!(
        "{ENTRY_SELECT_SQL} WHERE test_name = ?1 ORDER BY rank ASC, athlete_id ASC;"
    ))?;
    let rows = stmt.query([test_name])?;
    collect_parsed(rows, policy, RecordKind::LeaderboardEntry, parse_entry_row)
}

pub(crate) fn query_entries_for_test_and_sport(
    conn: &Connection,
    policy: DecodePolicy,
    test_name: &str,
    sport: &str,
) -> RepoResult<Vec<LeaderboardEntry>> {
    let mut stmt = conn.prepare(&format!(
        "{ENTRY_SELECT_SQL}
         WHERE test_name = ?1 AND sport = ?2
         ORDER BY rank ASC, athlete_id ASC;"
    ))?;
    let rows = stmt.query(params![test_name, sport])?;
    collect_parsed(rows, policy, RecordKind::LeaderboardEntry, parse_entry_row)
}

pub(crate) fn parse_entry_row(row: &Row<'_>) -> RepoResult<LeaderboardEntry> {
    let verified: i64 = row.get("verified")?;
    Ok(LeaderboardEntry {
        id: row.get("id")?,
        athlete_id: row.get("athlete_id")?,
        athlete_name: row.get("athlete_name")?,
        rank: row.get("rank")?,
        score: row.get("score")?,
        test_name: row.get("test_name")?,
        sport: row.get("sport")?,
        location: row.get("location")?,
        verified: int_to_bool(verified, "leaderboard_entries", "verified")?,
    })
}
