//! Repository layer: per-kind persistence and the fixed query vocabulary.
//!
//! # Responsibility
//! - Define the shared error taxonomy for store and query operations.
//! - Guard repository construction behind schema-readiness checks.
//! - Keep SQL details inside the persistence boundary; services and live
//!   queries reuse the row-level helpers these modules export.
//!
//! # Invariants
//! - Inserts are insert-or-replace by key; replaced rows leave no trace.
//! - Point lookups and targeted updates report absent keys as `NotFound`;
//!   deletes are idempotent.
//! - Enum columns decode strictly; a row with an unrecognized name is an
//!   `InvalidData` error handled per the repository's `DecodePolicy`.

pub mod achievement_repo;
pub mod athlete_repo;
pub mod fitness_test_repo;
pub mod leaderboard_repo;
pub mod message_repo;
pub mod opportunity_repo;
pub mod test_result_repo;

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::RecordKind;
use log::warn;
use rusqlite::{Connection, Row, Rows};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Generic repository error for persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    NotFound { kind: RecordKind, id: String },
    InvalidData(String),
    UninitializedConnection { expected_version: u32, actual_version: u32 },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn { table: &'static str, column: &'static str },
}

impl RepoError {
    pub(crate) fn not_found(kind: RecordKind, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { kind, id } => write!(f, "{kind} record not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection not migrated: schema version {actual_version}, expected {expected_version}"
            ),
            Self::MissingRequiredTable(table) => write!(f, "missing required table `{table}`"),
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "missing required column `{table}.{column}`")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// How list queries treat rows that fail strict decoding.
///
/// `Lenient` (default) skips and logs the offending row so one bad record
/// cannot blank a whole screen; `Strict` aborts the batch with the error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecodePolicy {
    #[default]
    Lenient,
    Strict,
}

/// Verifies the connection is migrated and carries the repository's table.
pub(crate) fn ensure_connection_ready(
    conn: &Connection,
    table: &'static str,
    required_columns: &[&'static str],
) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    let table_exists: bool = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1;",
            [table],
            |row| row.get::<_, i64>(0),
        )
        .map(|count| count > 0)?;
    if !table_exists {
        return Err(RepoError::MissingRequiredTable(table));
    }

    for column in required_columns {
        let column_exists: bool = conn
            .query_row(
                &format!("SELECT COUNT(*) FROM pragma_table_info('{table}') WHERE name = ?1;"),
                [*column],
                |row| row.get::<_, i64>(0),
            )
            .map(|count| count > 0)?;
        if !column_exists {
            return Err(RepoError::MissingRequiredColumn { table, column });
        }
    }

    Ok(())
}

/// Drains `rows` through `parse`, applying the repository decode policy to
/// per-row `InvalidData` failures.
pub(crate) fn collect_parsed<T>(
    mut rows: Rows<'_>,
    policy: DecodePolicy,
    kind: RecordKind,
    parse: impl Fn(&Row<'_>) -> RepoResult<T>,
) -> RepoResult<Vec<T>> {
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        match parse(row) {
            Ok(value) => out.push(value),
            Err(RepoError::InvalidData(message)) if policy == DecodePolicy::Lenient => {
                warn!("event=row_decode module=repo status=skipped kind={kind} error={message}");
            }
            Err(err) => return Err(err),
        }
    }
    Ok(out)
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

pub(crate) fn int_to_bool(value: i64, table: &str, column: &str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid boolean value `{other}` in {table}.{column}"
        ))),
    }
}
