//! SQLite storage bootstrap and the shared cache handle.
//!
//! # Responsibility
//! - Open and configure SQLite connections for the local cache.
//! - Apply schema migrations in deterministic order.
//! - Own [`CacheDb`]: the single ownership root every repository, service
//!   and live query goes through.
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - Core code must not read/write application data before migrations
//!   succeed.
//! - All mutations flow through [`CacheDb::mutate`] so affected live
//!   queries are re-evaluated before the mutating call returns.
//! - Lock order is always connection, then subscription registry.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::info;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use rusqlite::Connection;

use crate::live::{ChangeHub, Live, SnapshotFn};
use crate::model::RecordKind;
use crate::repo::RepoResult;

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    /// The process-wide handle was already created for a different file.
    AlreadyOpen {
        existing: PathBuf,
        requested: PathBuf,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
            Self::AlreadyOpen {
                existing,
                requested,
            } => write!(
                f,
                "cache already open at `{}`; refusing to switch to `{}`",
                existing.display(),
                requested.display()
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } | Self::AlreadyOpen { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

static GLOBAL_CACHE: OnceCell<Arc<CacheDb>> = OnceCell::new();

/// Shared handle over the backing store.
///
/// Serializes all statement execution behind one lock; mutations
/// additionally fan out to the subscription registry. Cheap to share via
/// `Arc`; repositories borrow it per call.
#[derive(Debug)]
pub struct CacheDb {
    conn: Mutex<Connection>,
    hub: ChangeHub,
    path: Option<PathBuf>,
}

impl CacheDb {
    /// Opens (creating if needed) a file-backed cache.
    pub fn open(path: impl AsRef<Path>) -> DbResult<Arc<Self>> {
        let path = path.as_ref().to_path_buf();
        let conn = open_db(&path)?;
        Ok(Arc::new(Self {
            conn: Mutex::new(conn),
            hub: ChangeHub::new(),
            path: Some(path),
        }))
    }

    /// Opens a private in-memory cache. Each call is an independent store.
    pub fn open_in_memory() -> DbResult<Arc<Self>> {
        let conn = open_db_in_memory()?;
        Ok(Arc::new(Self {
            conn: Mutex::new(conn),
            hub: ChangeHub::new(),
            path: None,
        }))
    }

    /// Returns the process-wide cache, creating it on first call.
    ///
    /// # Invariants
    /// - At most one instance is ever created; concurrent first callers
    ///   all receive the same handle.
    /// - A later call with a different path is rejected instead of
    ///   silently returning a cache backed by another file.
    pub fn global(path: impl AsRef<Path>) -> DbResult<Arc<Self>> {
        let requested = path.as_ref().to_path_buf();
        let cache = GLOBAL_CACHE.get_or_try_init(|| {
            info!(
                "event=cache_global_init module=db status=ok path={}",
                requested.display()
            );
            Self::open(&requested)
        })?;

        match &cache.path {
            Some(existing) if *existing == requested => Ok(Arc::clone(cache)),
            Some(existing) => Err(DbError::AlreadyOpen {
                existing: existing.clone(),
                requested,
            }),
            // Unreachable through this constructor; treat as a conflict.
            None => Err(DbError::AlreadyOpen {
                existing: PathBuf::from(":memory:"),
                requested,
            }),
        }
    }

    /// Runs a read-only closure against the connection.
    pub(crate) fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> RepoResult<T>,
    ) -> RepoResult<T> {
        let conn = self.conn.lock();
        f(&conn)
    }

    /// Runs a mutation and then re-evaluates live queries covering any of
    /// the touched kinds.
    ///
    /// # Contract
    /// - `f` sees an exclusive connection; multi-statement work must use a
    ///   transaction so readers never observe a partial batch.
    /// - Notification happens after the write lock is released and before
    ///   this call returns.
    pub(crate) fn mutate<T>(
        &self,
        kinds: &[RecordKind],
        f: impl FnOnce(&mut Connection) -> RepoResult<T>,
    ) -> RepoResult<T> {
        let out = {
            let mut conn = self.conn.lock();
            f(&mut conn)?
        };
        let conn = self.conn.lock();
        self.hub.notify(&conn, kinds);
        Ok(out)
    }

    /// Registers a live query over the given kinds.
    ///
    /// Evaluates `eval` immediately and delivers the current result as the
    /// first snapshot. Registration happens under the connection lock, so
    /// no mutation can slip between the initial evaluation and the first
    /// notification.
    pub fn subscribe<T, F>(&self, kinds: &[RecordKind], eval: F) -> RepoResult<Live<T>>
    where
        T: Send + 'static,
        F: Fn(&Connection) -> RepoResult<Vec<T>> + Send + 'static,
    {
        let conn = self.conn.lock();
        let initial = eval(&conn)?;
        let live = self.hub.register(kinds, SnapshotFn::new(eval), initial);
        drop(conn);
        Ok(live)
    }

    /// Number of currently registered live queries (observability hook).
    pub fn live_query_count(&self) -> usize {
        self.hub.subscriber_count()
    }
}
