//! Achievement repository over the `achievements` table.
//!
//! # Responsibility
//! - Insert-or-replace achievement records and answer the fixed lookups
//!   (by athlete, category, rarity).
//!
//! # Invariants
//! - `rarity` decodes strictly; unknown names are `InvalidData`.
//! - A `NULL` `unlocked_date` means the achievement is still locked.

use crate::db::CacheDb;
use crate::model::records::{Achievement, Rarity};
use crate::model::RecordKind;
use crate::repo::{
    collect_parsed, ensure_connection_ready, DecodePolicy, RepoError, RepoResult,
};
use rusqlite::{params, Connection, Row};

const ACHIEVEMENT_SELECT_SQL: &str = "SELECT
    id,
    athlete_id,
    title,
    description,
    category,
    rarity,
    unlocked_date
FROM achievements";

const REQUIRED_COLUMNS: &[&str] = &["id", "athlete_id", "category", "rarity"];

/// SQLite-backed achievement repository.
pub struct SqliteAchievementRepository<'db> {
    db: &'db CacheDb,
    policy: DecodePolicy,
}

impl<'db> SqliteAchievementRepository<'db> {
    /// Constructs a repository from a migrated/ready cache handle.
    pub fn try_new(db: &'db CacheDb) -> RepoResult<Self> {
        db.with_conn(|conn| ensure_connection_ready(conn, "achievements", REQUIRED_COLUMNS))?;
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
    pub fn put_achievement(&self, achievement: &Achievement) -> RepoResult<()> {
        self.db.mutate(&[RecordKind::Achievement], |conn| {
            insert_achievement(conn, achievement)
        })
    }

    /// Batch insert-or-replace; all rows land atomically.
    pub fn put_achievements(&self, achievements: &[Achievement]) -> RepoResult<()> {
        self.db.mutate(&[RecordKind::Achievement], |conn| {
            let tx = conn.transaction()?;
            for achievement in achievements {
                insert_achievement(&tx, achievement)?;
            }
            tx.commit()?;
            Ok(())
        })
    }

    /// Point lookup; absent ids are `NotFound`.
    pub fn get_achievement(&self, id: &str) -> RepoResult<Achievement> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{ACHIEVEMENT_SELECT_SQL} WHERE id = ?1;"))?;
            let mut rows = stmt.query([id])?;
            match rows.next()? {
                Some(row) => parse_achievement_row(row),
                None => Err(RepoError::not_found(RecordKind::Achievement, id)),
            }
        })
    }

    pub fn list_achievements(&self) -> RepoResult<Vec<Achievement>> {
        self.query_with_clause("", None)
    }

    /// Achievements earned by (or pending for) one athlete.
    pub fn achievements_for_athlete(&self, athlete_id: &str) -> RepoResult<Vec<Achievement>> {
        self.query_with_clause(" WHERE athlete_id = ?1", Some(athlete_id))
    }

    pub fn achievements_by_category(&self, category: &str) -> RepoResult<Vec<Achievement>> {
        self.query_with_clause(" WHERE category = ?1", Some(category))
    }

    pub fn achievements_by_rarity(&self, rarity: Rarity) -> RepoResult<Vec<Achievement>> {
        self.query_with_clause(" WHERE rarity = ?1", Some(rarity_to_db(rarity)))
    }

    /// Idempotent delete; returns whether a row was removed.
    pub fn delete_achievement(&self, id: &str) -> RepoResult<bool> {
        self.db.mutate(&[RecordKind::Achievement], |conn| {
            let changed = conn.execute("DELETE FROM achievements WHERE id = ?1;", [id])?;
            Ok(changed > 0)
        })
    }

    /// Delete-by-foreign-key; returns the count removed.
    pub fn delete_achievements_for_athlete(&self, athlete_id: &str) -> RepoResult<usize> {
        self.db.mutate(&[RecordKind::Achievement], |conn| {
            let removed = conn.execute(
                "DELETE FROM achievements WHERE athlete_id = ?1;",
                [athlete_id],
            )?;
            Ok(removed)
        })
    }

    fn query_with_clause(&self, clause: &str, bind: Option<&str>) -> RepoResult<Vec<Achievement>> {
        self.db.with_conn(|conn| {
            let sql = format!("{ACHIEVEMENT_SELECT_SQL}{clause} ORDER BY title ASC, id ASC;");
            let mut stmt = conn.prepare(&sql)?;
            let rows = match bind {
                Some(value) => stmt.query([value])?,
                None => stmt.query([])?,
            };
            collect_parsed(rows, self.policy, RecordKind::Achievement, parse_achievement_row)
        })
    }
}

pub(crate) fn insert_achievement(conn: &Connection, achievement: &Achievement) -> RepoResult<()> {
    conn.execute(
        "INSERT OR REPLACE INTO achievements (
            id, athlete_id, title, description, category, rarity, unlocked_date
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
        params![
            achievement.id,
            achievement.athlete_id,
            achievement.title,
            achievement.description,
            achievement.category,
            rarity_to_db(achievement.rarity),
            achievement.unlocked_date,
        ],
    )?;
    Ok(())
}

pub(crate) fn parse_achievement_row(row: &Row<'_>) -> RepoResult<Achievement> {
    let rarity_text: String = row.get("rarity")?;
    Ok(Achievement {
        id: row.get("id")?,
        athlete_id: row.get("athlete_id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        category: row.get("category")?,
        rarity: parse_rarity(&rarity_text).ok_or_else(|| {
            RepoError::InvalidData(format!(
                "invalid rarity `{rarity_text}` in achievements.rarity"
            ))
        })?,
        unlocked_date: row.get("unlocked_date")?,
    })
}

pub(crate) fn rarity_to_db(rarity: Rarity) -> &'static str {
    match rarity {
        Rarity::Common => "common",
        Rarity::Rare => "rare",
        Rarity::Epic => "epic",
        Rarity::Legendary => "legendary",
    }
}

pub(crate) fn parse_rarity(value: &str) -> Option<Rarity> {
    match value {
        "common" => Some(Rarity::Common),
        "rare" => Some(Rarity::Rare),
        "epic" => Some(Rarity::Epic),
        "legendary" => Some(Rarity::Legendary),
        _ => None,
    }
}
