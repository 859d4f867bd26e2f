//! Opportunity repository over the `opportunities` table.
//!
//! # Responsibility
//! - Insert-or-replace opportunity postings and answer the fixed lookups
//!   (by type, sport, location, applied state, upcoming-by-deadline).
//!
//! # Invariants
//! - `type` decodes strictly; unknown names are `InvalidData`.
//! - Deadlines are epoch milliseconds; "upcoming" is `deadline >= now`,
//!   soonest first.

use crate::db::CacheDb;
use crate::model::codec::{decode_string_list, encode_string_list};
use crate::model::records::{Opportunity, OpportunityType};
use crate::model::RecordKind;
use crate::repo::{
    bool_to_int, collect_parsed, ensure_connection_ready, int_to_bool, DecodePolicy, RepoError,
    RepoResult,
};
use rusqlite::{params, Connection, Row};

const OPPORTUNITY_SELECT_SQL: &str = "SELECT
    id,
    title,
    organization,
    type,
    sport,
    location,
    deadline,
    description,
    requirements,
    benefits,
    applied
FROM opportunities";

const REQUIRED_COLUMNS: &[&str] = &["id", "type", "sport", "deadline", "applied"];

/// SQLite-backed opportunity repository.
pub struct SqliteOpportunityRepository<'db> {
    db: &'db CacheDb,
    policy: DecodePolicy,
}

impl<'db> SqliteOpportunityRepository<'db> {
    /// Constructs a repository from a migrated/ready cache handle.
    pub fn try_new(db: &'db CacheDb) -> RepoResult<Self> {
        db.with_conn(|conn| ensure_connection_ready(conn, "opportunities", REQUIRED_COLUMNS))?;
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
    pub fn put_opportunity(&self, opportunity: &Opportunity) -> RepoResult<()> {
        self.db.mutate(&[RecordKind::Opportunity], |conn| {
            insert_opportunity(conn, opportunity)
        })
    }

    /// Batch insert-or-replace; all rows land atomically.
    pub fn put_opportunities(&self, opportunities: &[Opportunity]) -> RepoResult<()> {
        self.db.mutate(&[RecordKind::Opportunity], |conn| {
            let tx = conn.transaction()?;
            for opportunity in opportunities {
                insert_opportunity(&tx, opportunity)?;
            }
            tx.commit()?;
            Ok(())
        })
    }

    /// Point lookup; absent ids are `NotFound`.
    pub fn get_opportunity(&self, id: &str) -> RepoResult<Opportunity> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{OPPORTUNITY_SELECT_SQL} WHERE id = ?1;"))?;
            let mut rows = stmt.query([id])?;
            match rows.next()? {
                Some(row) => parse_opportunity_row(row),
                None => Err(RepoError::not_found(RecordKind::Opportunity, id)),
            }
        })
    }

    /// All postings, nearest deadline first.
    pub fn list_opportunities(&self) -> RepoResult<Vec<Opportunity>> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{OPPORTUNITY_SELECT_SQL} ORDER BY deadline ASC, id ASC;"
            ))?;
            let rows = stmt.query([])?;
            collect_parsed(rows, self.policy, RecordKind::Opportunity, parse_opportunity_row)
        })
    }

    pub fn opportunities_by_type(&self, kind: OpportunityType) -> RepoResult<Vec<Opportunity>> {
        self.query_with_clause(" WHERE type = ?1", Some(opportunity_type_to_db(kind)))
    }

    pub fn opportunities_by_sport(&self, sport: &str) -> RepoResult<Vec<Opportunity>> {
        self.query_with_clause(" WHERE sport = ?1", Some(sport))
    }

    pub fn opportunities_by_location(&self, location: &str) -> RepoResult<Vec<Opportunity>> {
        self.query_with_clause(" WHERE location = ?1", Some(location))
    }

    /// Postings the athlete has already applied to.
    pub fn applied_opportunities(&self) -> RepoResult<Vec<Opportunity>> {
        self.query_with_clause(" WHERE applied = 1", None)
    }

    /// Postings still open for application.
    pub fn available_opportunities(&self) -> RepoResult<Vec<Opportunity>> {
        self.query_with_clause(" WHERE applied = 0", None)
    }

    /// Postings whose deadline is at or after `now_millis`, soonest first.
    pub fn upcoming_opportunities(&self, now_millis: i64) -> RepoResult<Vec<Opportunity>> {
        self.db
            .with_conn(|conn| query_upcoming_opportunities(conn, self.policy, now_millis))
    }

    /// Targeted flag update; fails with `NotFound` when the id is absent.
    pub fn set_applied(&self, id: &str, applied: bool) -> RepoResult<()> {
        self.db.mutate(&[RecordKind::Opportunity], |conn| {
            let changed = conn.execute(
                "UPDATE opportunities SET applied = ?2 WHERE id = ?1;",
                params![id, bool_to_int(applied)],
            )?;
            if changed == 0 {
                return Err(RepoError::not_found(RecordKind::Opportunity, id));
            }
            Ok(())
        })
    }

    /// Idempotent delete; returns whether a row was removed.
    pub fn delete_opportunity(&self, id: &str) -> RepoResult<bool> {
        self.db.mutate(&[RecordKind::Opportunity], |conn| {
            let changed = conn.execute("DELETE FROM opportunities WHERE id = ?1;", [id])?;
            Ok(changed > 0)
        })
    }

    fn query_with_clause(&self, clause: &str, bind: Option<&str>) -> RepoResult<Vec<Opportunity>> {
        self.db.with_conn(|conn| {
            let sql = format!("{OPPORTUNITY_SELECT_SQL}{clause} ORDER BY deadline ASC, id ASC;");
            let mut stmt = conn.prepare(&sql)?;
            let rows = match bind {
                Some(value) => stmt.query([value])?,
                None => stmt.query([])?,
            };
            collect_parsed(rows, self.policy, RecordKind::Opportunity, parse_opportunity_row)
        })
    }
}

pub(crate) fn insert_opportunity(conn: &Connection, opportunity: &Opportunity) -> RepoResult<()> {
    conn.execute(
        "INSERT OR REPLACE INTO opportunities (
            id, title, organization, type, sport, location, deadline,
            description, requirements, benefits, applied
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11);",
        params![
            opportunity.id,
            opportunity.title,
            opportunity.organization,
            opportunity_type_to_db(opportunity.kind),
            opportunity.sport,
            opportunity.location,
            opportunity.deadline,
            opportunity.description,
            encode_string_list(&opportunity.requirements),
            encode_string_list(&opportunity.benefits),
            bool_to_int(opportunity.applied),
        ],
    )?;
    Ok(())
}

pub(crate) fn query_upcoming_opportunities(
    conn: &Connection,
    policy: DecodePolicy,
    now_millis: i64,
) -> RepoResult<Vec<Opportunity>> {
    let mut stmt = conn.prepare(&format!(
        "{OPPORTUNITY_SELECT_SQL} WHERE deadline >= ?1 ORDER BY deadline ASC, id ASC;"
    ))?;
    let rows = stmt.query([now_millis])?;
    collect_parsed(rows, policy, RecordKind::Opportunity, parse_opportunity_row)
}

pub(crate) fn parse_opportunity_row(row: &Row<'_>) -> RepoResult<Opportunity> {
    let type_text: String = row.get("type")?;
    let applied: i64 = row.get("applied")?;
    let requirements: Option<String> = row.get("requirements")?;
    let benefits: Option<String> = row.get("benefits")?;
    Ok(Opportunity {
        id: row.get("id")?,
        title: row.get("title")?,
        organization: row.get("organization")?,
        kind: parse_opportunity_type(&type_text).ok_or_else(|| {
            RepoError::InvalidData(format!(
                "invalid opportunity type `{type_text}` in opportunities.type"
            ))
        })?,
        sport: row.get("sport")?,
        location: row.get("location")?,
        deadline: row.get("deadline")?,
        description: row.get("description")?,
        requirements: decode_string_list("opportunities.requirements", requirements.as_deref()),
        benefits: decode_string_list("opportunities.benefits", benefits.as_deref()),
        applied: int_to_bool(applied, "opportunities", "applied")?,
    })
}

pub(crate) fn opportunity_type_to_db(kind: OpportunityType) -> &'static str {
    match kind {
        OpportunityType::Scholarship => "scholarship",
        OpportunityType::Trial => "trial",
        OpportunityType::Camp => "camp",
        OpportunityType::Internship => "internship",
        OpportunityType::Job => "job",
        OpportunityType::Competition => "competition",
    }
}

pub(crate) fn parse_opportunity_type(value: &str) -> Option<OpportunityType> {
    match value {
        "scholarship" => Some(OpportunityType::Scholarship),
        "trial" => Some(OpportunityType::Trial),
        "camp" => Some(OpportunityType::Camp),
        "internship" => Some(OpportunityType::Internship),
        "job" => Some(OpportunityType::Job),
        "competition" => Some(OpportunityType::Competition),
        _ => None,
    }
}
