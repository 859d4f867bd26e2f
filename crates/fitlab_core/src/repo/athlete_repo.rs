//! Athlete repository over the `athletes` table.
//!
//! # Responsibility
//! - Insert-or-replace athlete profiles and answer the fixed athlete
//!   lookups (by id, sport, location, following, verified).
//! - Translate between the flat stored row (JSON composite columns) and
//!   the logical [`Athlete`] shape.
//!
//! # Invariants
//! - `personal_bests`/`achievements`/`social_media` decode falls back to
//!   empty containers; a corrupt composite never fails a profile read.

use crate::db::CacheDb;
use crate::model::codec::{
    decode_string_list, decode_string_map, encode_string_list, encode_string_map,
};
use crate::model::records::Athlete;
use crate::model::RecordKind;
use crate::repo::{
    bool_to_int, collect_parsed, ensure_connection_ready, int_to_bool, DecodePolicy, RepoError,
    RepoResult,
};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::BTreeMap;

const ATHLETE_SELECT_SQL: &str = "SELECT
    id,
    name,
    age,
    sport,
    location,
    bio,
    verified,
    following,
    personal_bests,
    achievements,
    social_media
FROM athletes";

const REQUIRED_COLUMNS: &[&str] = &["id", "sport", "location", "following", "personal_bests"];

/// SQLite-backed athlete repository.
#[derive(Debug)]
pub struct SqliteAthleteRepository<'db> {
    db: &'db CacheDb,
    policy: DecodePolicy,
}

impl<'db> SqliteAthleteRepository<'db> {
    /// Constructs a repository from a migrated/ready cache handle.
    pub fn try_new(db: &'db CacheDb) -> RepoResult<Self> {
        db.with_conn(|conn| ensure_connection_ready(conn, "athletes", REQUIRED_COLUMNS))?;
        Ok(Self {
            db,
            policy: DecodePolicy::default(),
        })
    }

    /// Switches list queries to the given decode policy.
    pub fn with_policy(mut self, policy: DecodePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Insert-or-replace by id; an existing row is fully overwritten.
    pub fn put_athlete(&self, athlete: &Athlete) -> RepoResult<()> {
        self.db
            .mutate(&[RecordKind::Athlete], |conn| insert_athlete(conn, athlete))
    }

    /// Batch insert-or-replace; all rows land atomically.
    pub fn put_athletes(&self, athletes: &[Athlete]) -> RepoResult<()> {
        self.db.mutate(&[RecordKind::Athlete], |conn| {
            let tx = conn.transaction()?;
            for athlete in athletes {
                insert_athlete(&tx, athlete)?;
            }
            tx.commit()?;
            Ok(())
        })
    }

    /// Point lookup; absent ids are `NotFound`.
    pub fn get_athlete(&self, id: &str) -> RepoResult<Athlete> {
        self.db.with_conn(|conn| {
            find_athlete(conn, id)?.ok_or_else(|| RepoError::not_found(RecordKind::Athlete, id))
        })
    }

    pub fn list_athletes(&self) -> RepoResult<Vec<Athlete>> {
        self.db
            .with_conn(|conn| query_athletes(conn, self.policy, AthleteFilter::All))
    }

    pub fn athletes_by_sport(&self, sport: &str) -> RepoResult<Vec<Athlete>> {
        self.db
            .with_conn(|conn| query_athletes(conn, self.policy, AthleteFilter::Sport(sport)))
    }

    pub fn athletes_by_location(&self, location: &str) -> RepoResult<Vec<Athlete>> {
        self.db
            .with_conn(|conn| query_athletes(conn, self.policy, AthleteFilter::Location(location)))
    }

    pub fn following_athletes(&self) -> RepoResult<Vec<Athlete>> {
        self.db
            .with_conn(|conn| query_athletes(conn, self.policy, AthleteFilter::Following))
    }

    pub fn verified_athletes(&self) -> RepoResult<Vec<Athlete>> {
        self.db
            .with_conn(|conn| query_athletes(conn, self.policy, AthleteFilter::Verified))
    }

    /// Targeted flag update; fails with `NotFound` when the id is absent.
    pub fn set_following(&self, id: &str, following: bool) -> RepoResult<()> {
        self.db.mutate(&[RecordKind::Athlete], |conn| {
            let changed = conn.execute(
                "UPDATE athletes SET following = ?2 WHERE id = ?1;",
                params![id, bool_to_int(following)],
            )?;
            if changed == 0 {
                return Err(RepoError::not_found(RecordKind::Athlete, id));
            }
            Ok(())
        })
    }

    /// Idempotent delete; returns whether a row was removed.
    pub fn delete_athlete(&self, id: &str) -> RepoResult<bool> {
        self.db.mutate(&[RecordKind::Athlete], |conn| {
            let changed = conn.execute("DELETE FROM athletes WHERE id = ?1;", [id])?;
            Ok(changed > 0)
        })
    }
}

/// Fixed athlete lookup shapes.
#[derive(Debug, Clone, Copy)]
pub(crate) enum AthleteFilter<'a> {
    All,
    Sport(&'a str),
    Location(&'a str),
    Following,
    Verified,
}

pub(crate) fn insert_athlete(conn: &Connection, athlete: &Athlete) -> RepoResult<()> {
    conn.execute(
        "INSERT OR REPLACE INTO athletes (
            id, name, age, sport, location, bio, verified, following,
            personal_bests, achievements, social_media
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11);",
        params![
            athlete.id,
            athlete.name,
            athlete.age,
            athlete.sport,
            athlete.location,
            athlete.bio,
            bool_to_int(athlete.verified),
            bool_to_int(athlete.following),
            encode_string_map(&athlete.personal_bests),
            encode_string_list(&athlete.achievements),
            encode_string_map(&athlete.social_media),
        ],
    )?;
    Ok(())
}

pub(crate) fn find_athlete(conn: &Connection, id: &str) -> RepoResult<Option<Athlete>> {
    let parts = conn
        .query_row(&format!("{ATHLETE_SELECT_SQL} WHERE id = ?1;"), [id], row_to_parts)
        .optional()?;
    parts.map(parts_to_athlete).transpose()
}

pub(crate) fn query_athletes(
    conn: &Connection,
    policy: DecodePolicy,
    filter: AthleteFilter<'_>,
) -> RepoResult<Vec<Athlete>> {
    let (clause, bind): (&str, Option<&str>) = match filter {
        AthleteFilter::All => ("", None),
        AthleteFilter::Sport(sport) => (" WHERE sport = ?1", Some(sport)),
        AthleteFilter::Location(location) => (" WHERE location = ?1", Some(location)),
        AthleteFilter::Following => (" WHERE following = 1", None),
        AthleteFilter::Verified => (" WHERE verified = 1", None),
    };
    let sql = format!("{ATHLETE_SELECT_SQL}{clause} ORDER BY name ASC, id ASC;");
    let mut stmt = conn.prepare(&sql)?;
    let rows = match bind {
        Some(value) => stmt.query([value])?,
        None => stmt.query([])?,
    };
    collect_parsed(rows, policy, RecordKind::Athlete, parse_athlete_row)
}

/// Overwrites only the cached personal-bests map for one athlete.
pub(crate) fn write_personal_bests(
    conn: &Connection,
    id: &str,
    personal_bests: &BTreeMap<String, String>,
) -> RepoResult<()> {
    conn.execute(
        "UPDATE athletes SET personal_bests = ?2 WHERE id = ?1;",
        params![id, encode_string_map(personal_bests)],
    )?;
    Ok(())
}

// Raw column values captured inside the rusqlite row callback, converted
// outside it so decode errors surface as RepoError instead of panics.
type AthleteParts = (
    String,
    String,
    i64,
    String,
    String,
    String,
    i64,
    i64,
    Option<String>,
    Option<String>,
    Option<String>,
);

fn row_to_parts(row: &Row<'_>) -> rusqlite::Result<AthleteParts> {
    Ok((
        row.get("id")?,
        row.get("name")?,
        row.get("age")?,
        row.get("sport")?,
        row.get("location")?,
        row.get("bio")?,
        row.get("verified")?,
        row.get("following")?,
        row.get("personal_bests")?,
        row.get("achievements")?,
        row.get("social_media")?,
    ))
}

fn parts_to_athlete(parts: AthleteParts) -> RepoResult<Athlete> {
    let (id, name, age, sport, location, bio, verified, following, bests, achievements, social) =
        parts;
    Ok(Athlete {
        id,
        name,
        age,
        sport,
        location,
        bio,
        verified: int_to_bool(verified, "athletes", "verified")?,
        following: int_to_bool(following, "athletes", "following")?,
        personal_bests: decode_string_map("athletes.personal_bests", bests.as_deref()),
        achievements: decode_string_list("athletes.achievements", achievements.as_deref()),
        social_media: decode_string_map("athletes.social_media", social.as_deref()),
    })
}

pub(crate) fn parse_athlete_row(row: &Row<'_>) -> RepoResult<Athlete> {
    parts_to_athlete(row_to_parts(row)?)
}
