//! Schema migrations for the cache tables.
//!
//! # Responsibility
//! - Hold the ordered migration scripts and bring a connection from any
//!   older schema to the current one in a single transaction.
//!
//! # Invariants
//! - The applied version lives in `PRAGMA user_version`; a database
//!   stamped newer than this binary is refused, never downgraded.

use crate::db::{DbError, DbResult};
use rusqlite::Connection;

// Ordered by version; every entry ships with the binary.
const MIGRATIONS: &[(u32, &str)] = &[
    (1, include_str!("0001_init.sql")),
    (2, include_str!("0002_indexes.sql")),
];

/// Schema version this binary was built for.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |(version, _)| *version)
}

/// Brings `conn` up to [`latest_version`], applying pending scripts
/// atomically. Already-current connections are left untouched.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let stored = stored_version(conn)?;
    let latest = latest_version();

    if stored > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: stored,
            latest_supported: latest,
        });
    }
    if stored == latest {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for (version, sql) in MIGRATIONS.iter().filter(|(version, _)| *version > stored) {
        tx.execute_batch(sql)?;
        tx.execute_batch(&format!("PRAGMA user_version = {version};"))?;
    }
    tx.commit()?;

    Ok(())
}

fn stored_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?)
}
