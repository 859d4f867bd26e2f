//! Test result repository over the `test_results` table.
//!
//! # Responsibility
//! - Insert-or-replace scored attempts and answer the fixed result
//!   lookups (by athlete, by test, by pair, top-N).
//! - Expose the row-level helpers the result service composes into its
//!   personal-best/leaderboard transactions.
//!
//! # Invariants
//! - `is_personal_best` is stored as written; only `ResultService` keeps
//!   the one-winner-per-(athlete, test) invariant true.

use crate::db::CacheDb;
use crate::model::records::TestResult;
use crate::model::RecordKind;
use crate::repo::{
    bool_to_int, collect_parsed, ensure_connection_ready, int_to_bool, DecodePolicy, RepoError,
    RepoResult,
};
use rusqlite::{params, Connection, Row};

const RESULT_SELECT_SQL: &str = "SELECT
    id,
    athlete_id,
    test_name,
    score,
    unit,
    date,
    percentile,
    category,
    is_personal_best
FROM test_results";

const REQUIRED_COLUMNS: &[&str] = &["id", "athlete_id", "test_name", "score", "is_personal_best"];

/// SQLite-backed test result repository.
pub struct SqliteTestResultRepository<'db> {
    db: &'db CacheDb,
    policy: DecodePolicy,
}

impl<'db> SqliteTestResultRepository<'db> {
    /// Constructs a repository from a migrated/ready cache handle.
    pub fn try_new(db: &'db CacheDb) -> RepoResult<Self> {
        db.with_conn(|conn| ensure_connection_ready(conn, "test_results", REQUIRED_COLUMNS))?;
        Ok(Self {
            db,
            policy: DecodePolicy::default(),
        })
    }

    pub fn with_policy(mut self, policy: DecodePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Raw insert-or-replace. Callers that need aggregate maintenance
    /// (personal bests, leaderboards) go through `ResultService` instead.
    pub fn put_result(&self, result: &TestResult) -> RepoResult<()> {
        self.db
            .mutate(&[RecordKind::TestResult], |conn| insert_result(conn, result))
    }

    /// Batch insert-or-replace; all rows land atomically.
    pub fn put_results(&self, results: &[TestResult]) -> RepoResult<()> {
        self.db.mutate(&[RecordKind::TestResult], |conn| {
            let tx = conn.transaction()?;
            for result in results {
                insert_result(&tx, result)?;
            }
            tx.commit()?;
            Ok(())
        })
    }

    /// Point lookup; absent ids are `NotFound`.
    pub fn get_result(&self, id: &str) -> RepoResult<TestResult> {
        self.db.with_conn(|conn| {
            find_result(conn, id)?.ok_or_else(|| RepoError::not_found(RecordKind::TestResult, id))
        })
    }

    pub fn list_results(&self) -> RepoResult<Vec<TestResult>> {
        self.db.with_conn(|conn| {
            let mut stmt =
                conn.prepare(&format!("{RESULT_SELECT_SQL} ORDER BY date DESC, id ASC;"))?;
            let rows = stmt.query([])?;
            collect_parsed(rows, self.policy, RecordKind::TestResult, parse_result_row)
        })
    }

    /// All results for one athlete, newest first.
    pub fn results_for_athlete(&self, athlete_id: &str) -> RepoResult<Vec<TestResult>> {
        self.db
            .with_conn(|conn| query_results_for_athlete(conn, self.policy, athlete_id))
    }

    pub fn results_for_test(&self, test_name: &str) -> RepoResult<Vec<TestResult>> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{RESULT_SELECT_SQL} WHERE test_name = ?1 ORDER BY date DESC, id ASC;"
            ))?;
            let rows = stmt.query([test_name])?;
            collect_parsed(rows, self.policy, RecordKind::TestResult, parse_result_row)
        })
    }

    /// History of one athlete on one test, newest first.
    pub fn results_for_athlete_and_test(
        &self,
        athlete_id: &str,
        test_name: &str,
    ) -> RepoResult<Vec<TestResult>> {
        self.db
            .with_conn(|conn| query_results_for_pair(conn, self.policy, athlete_id, test_name))
    }

    /// Top `limit` scores for one test.
    ///
    /// `best_score_is_lowest` comes from the test category's comparison
    /// rule (see `service::ranking::ScoreOrder`).
    pub fn top_results_for_test(
        &self,
        test_name: &str,
        limit: u32,
        best_score_is_lowest: bool,
    ) -> RepoResult<Vec<TestResult>> {
        let direction = if best_score_is_lowest { "ASC" } else { "DESC" };
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{RESULT_SELECT_SQL}
                 WHERE test_name = ?1
                 ORDER BY score {direction}, date ASC, athlete_id ASC
                 LIMIT ?2;"
            ))?;
            let rows = stmt.query(params![test_name, limit])?;
            collect_parsed(rows, self.policy, RecordKind::TestResult, parse_result_row)
        })
    }

    /// Idempotent delete; returns whether a row was removed.
    pub fn delete_result(&self, id: &str) -> RepoResult<bool> {
        self.db.mutate(&[RecordKind::TestResult], |conn| {
            let changed = conn.execute("DELETE FROM test_results WHERE id = ?1;", [id])?;
            Ok(changed > 0)
        })
    }

    /// Delete-by-foreign-key; returns the count removed.
    pub fn delete_results_for_athlete(&self, athlete_id: &str) -> RepoResult<usize> {
        self.db.mutate(&[RecordKind::TestResult], |conn| {
            let removed =
                conn.execute("DELETE FROM test_results WHERE athlete_id = ?1;", [athlete_id])?;
            Ok(removed)
        })
    }
}

pub(crate) fn insert_result(conn: &Connection, result: &TestResult) -> RepoResult<()> {
    conn.execute(
        "INSERT OR REPLACE INTO test_results (
            id, athlete_id, test_name, score, unit, date, percentile,
            category, is_personal_best
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
        params![
            result.id,
            result.athlete_id,
            result.test_name,
            result.score,
            result.unit,
            result.date,
            result.percentile,
            result.category,
            bool_to_int(result.is_personal_best),
        ],
    )?;
    Ok(())
}

pub(crate) fn find_result(conn: &Connection, id: &str) -> RepoResult<Option<TestResult>> {
    let mut stmt = conn.prepare(&format!("{RESULT_SELECT_SQL} WHERE id = ?1;"))?;
    let mut rows = stmt.query([id])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_result_row(row)?));
    }
    Ok(None)
}

pub(crate) fn query_results_for_athlete(
    conn: &Connection,
    policy: DecodePolicy,
    athlete_id: &str,
) -> RepoResult<Vec<TestResult>> {
    let mut stmt = conn.prepare(&format!(
        "{RESULT_SELECT_SQL} WHERE athlete_id = ?1 ORDER BY date DESC, id ASC;"
    ))?;
    let rows = stmt.query([athlete_id])?;
    collect_parsed(rows, policy, RecordKind::TestResult, parse_result_row)
}

pub(crate) fn query_results_for_pair(
    conn: &Connection,
    policy: DecodePolicy,
    athlete_id: &str,
    test_name: &str,
) -> RepoResult<Vec<TestResult>> {
    let mut stmt = conn.prepare(&format!(
        "{RESULT_SELECT_SQL}
         WHERE athlete_id = ?1 AND test_name = ?2
         ORDER BY date DESC, id ASC;"
    ))?;
    let rows = stmt.query(params![athlete_id, test_name])?;
    collect_parsed(rows, policy, RecordKind::TestResult, parse_result_row)
}

/// Current personal-best rows for one test, one per athlete.
pub(crate) fn query_best_results_for_test(
    conn: &Connection,
    policy: DecodePolicy,
    test_name: &str,
) -> RepoResult<Vec<TestResult>> {
    let mut stmt = conn.prepare(&format!(
        "{RESULT_SELECT_SQL}
         WHERE test_name = ?1 AND is_personal_best = 1
         ORDER BY athlete_id ASC;"
    ))?;
    let rows = stmt.query([test_name])?;
    collect_parsed(rows, policy, RecordKind::TestResult, parse_result_row)
}

pub(crate) fn parse_result_row(row: &Row<'_>) -> RepoResult<TestResult> {
    let is_personal_best: i64 = row.get("is_personal_best")?;
    Ok(TestResult {
        id: row.get("id")?,
        athlete_id: row.get("athlete_id")?,
        test_name: row.get("test_name")?,
        score: row.get("score")?,
        unit: row.get("unit")?,
        date: row.get("date")?,
        percentile: row.get("percentile")?,
        category: row.get("category")?,
        is_personal_best: int_to_bool(is_personal_best, "test_results", "is_personal_best")?,
    })
}
