//! Fitness test catalog repository over the `fitness_tests` table.
//!
//! # Responsibility
//! - Insert-or-replace catalog entries describing test protocols and
//!   answer the fixed lookups (by category, by difficulty).
//!
//! # Invariants
//! - `difficulty` decodes strictly; unknown names are `InvalidData`.
//! - `instructions` decode falls back to an empty list on corruption.

use crate::db::CacheDb;
use crate::model::codec::{decode_string_list, encode_string_list};
use crate::model::records::{Difficulty, FitnessTest};
use crate::model::RecordKind;
use crate::repo::{
    collect_parsed, ensure_connection_ready, DecodePolicy, RepoError, RepoResult,
};
use rusqlite::{params, Connection, Row};

const TEST_SELECT_SQL: &str = "SELECT
    id,
    name,
    description,
    category,
    instructions,
    duration_secs,
    difficulty
FROM fitness_tests";

const REQUIRED_COLUMNS: &[&str] = &["id", "name", "category", "difficulty"];

/// SQLite-backed fitness test catalog repository.
pub struct SqliteFitnessTestRepository<'db> {
    db: &'db CacheDb,
    policy: DecodePolicy,
}

impl<'db> SqliteFitnessTestRepository<'db> {
    /// Constructs a repository from a migrated/ready cache handle.
    pub fn try_new(db: &'db CacheDb) -> RepoResult<Self> {
        db.with_conn(|conn| ensure_connection_ready(conn, "fitness_tests", REQUIRED_COLUMNS))?;
        Ok(Self {
            db,
            policy: DecodePolicy::default(),
        })
    }

    pub fn with_policy(mut self, policy: DecodePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Insert-or-replace by id; an existing row is fully overwritten.
    pub fn put_test(&self, test: &FitnessTest) -> RepoResult<()> {
        self.db
            .mutate(&[RecordKind::FitnessTest], |conn| insert_test(conn, test))
    }

    /// Batch insert-or-replace; all rows land atomically.
    pub fn put_tests(&self, tests: &[FitnessTest]) -> RepoResult<()> {
        self.db.mutate(&[RecordKind::FitnessTest], |conn| {
            let tx = conn.transaction()?;
            for test in tests {
                insert_test(&tx, test)?;
            }
            tx.commit()?;
            Ok(())
        })
    }

    /// Point lookup; absent ids are `NotFound`.
    pub fn get_test(&self, id: &str) -> RepoResult<FitnessTest> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{TEST_SELECT_SQL} WHERE id = ?1;"))?;
            let mut rows = stmt.query([id])?;
            match rows.next()? {
                Some(row) => parse_test_row(row),
                None => Err(RepoError::not_found(RecordKind::FitnessTest, id)),
            }
        })
    }

    pub fn list_tests(&self) -> RepoResult<Vec<FitnessTest>> {
        self.query_with_clause("", None)
    }

    pub fn tests_by_category(&self, category: &str) -> RepoResult<Vec<FitnessTest>> {
        self.query_with_clause(" WHERE category = ?1", Some(category))
    }

    pub fn tests_by_difficulty(&self, difficulty: Difficulty) -> RepoResult<Vec<FitnessTest>> {
        self.query_with_clause(" WHERE difficulty = ?1", Some(difficulty_to_db(difficulty)))
    }

    /// Idempotent delete; returns whether a row was removed.
    pub fn delete_test(&self, id: &str) -> RepoResult<bool> {
        self.db.mutate(&[RecordKind::FitnessTest], |conn| {
            let changed = conn.execute("DELETE FROM fitness_tests WHERE id = ?1;", [id])?;
            Ok(changed > 0)
        })
    }

    fn query_with_clause(&self, clause: &str, bind: Option<&str>) -> RepoResult<Vec<FitnessTest>> {
        self.db.with_conn(|conn| {
            let sql = format!("{TEST_SELECT_SQL}{clause} ORDER BY name ASC, id ASC;");
            let mut stmt = conn.prepare(&sql)?;
            let rows = match bind {
                Some(value) => stmt.query([value])?,
                None => stmt.query([])?,
            };
            collect_parsed(rows, self.policy, RecordKind::FitnessTest, parse_test_row)
        })
    }
}

pub(crate) fn insert_test(conn: &Connection, test: &FitnessTest) -> RepoResult<()> {
    conn.execute(
        "INSERT OR REPLACE INTO fitness_tests (
            id, name, description, category, instructions, duration_secs, difficulty
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
        params![
            test.id,
            test.name,
            test.description,
            test.category,
            encode_string_list(&test.instructions),
            test.duration_secs,
            difficulty_to_db(test.difficulty),
        ],
    )?;
    Ok(())
}

pub(crate) fn parse_test_row(row: &Row<'_>) -> RepoResult<FitnessTest> {
    let difficulty_text: String = row.get("difficulty")?;
    let instructions: Option<String> = row.get("instructions")?;
    Ok(FitnessTest {
        id: row.get("id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        category: row.get("category")?,
        instructions: decode_string_list("fitness_tests.instructions", instructions.as_deref()),
        duration_secs: row.get("duration_secs")?,
        difficulty: parse_difficulty(&difficulty_text).ok_or_else(|| {
            RepoError::InvalidData(format!(
                "invalid difficulty `{difficulty_text}` in fitness_tests.difficulty"
            ))
        })?,
    })
}

pub(crate) fn difficulty_to_db(difficulty: Difficulty) -> &'static str {
    match difficulty {
        Difficulty::Beginner => "beginner",
        Difficulty::Intermediate => "intermediate",
        Difficulty::Advanced => "advanced",
        Difficulty::Expert => "expert",
    }
}

pub(crate) fn parse_difficulty(value: &str) -> Option<Difficulty> {
    match value {
        "beginner" => Some(Difficulty::Beginner),
        "intermediate" => Some(Difficulty::Intermediate),
        "advanced" => Some(Difficulty::Advanced),
        "expert" => Some(Difficulty::Expert),
        _ => None,
    }
}
