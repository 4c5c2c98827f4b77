pub mod migrations;
pub mod models;
pub mod queries;

mod content;
mod relationships;
mod users;

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::Context;
use circle_types::{Error, Result};
use parking_lot::Mutex;
use rusqlite::{Connection, OpenFlags, Transaction, TransactionBehavior};
use tracing::info;

pub use queries::Reader;
pub use users::{DestroyedCounts, InsertUser, UserChanges};

#[derive(Debug, Clone)]
pub struct DbOptions {
    /// Upper bound on any wait for the writer or for a SQLite lock.
    pub busy_timeout: Duration,
    pub reader_pool_size: usize,
}

impl Default for DbOptions {
    fn default() -> Self {
        Self {
            busy_timeout: Duration::from_millis(5000),
            reader_pool_size: 4,
        }
    }
}

/// One writer connection plus a round-robin pool of read-only connections.
///
/// Every write runs in a `BEGIN IMMEDIATE` transaction on the writer; every
/// read runs in a deferred transaction on a reader, so a multi-query read
/// sees a single WAL snapshot.
pub struct Database {
    writer: Mutex<Connection>,
    readers: Vec<Mutex<Connection>>,
    reader_idx: AtomicUsize,
    busy_timeout: Duration,
}

impl Database {
    pub fn open(path: &Path, options: &DbOptions) -> anyhow::Result<Self> {
        let writer = Connection::open(path)
            .with_context(|| format!("opening {}", path.display()))?;

        // WAL mode for concurrent reads
        writer.pragma_update(None, "journal_mode", "WAL")?;
        writer.pragma_update(None, "foreign_keys", "ON")?;
        writer.busy_timeout(options.busy_timeout)?;

        migrations::run(&writer)?;

        let pool_size = options.reader_pool_size.max(1);
        let mut readers = Vec::with_capacity(pool_size);
        for _ in 0..pool_size {
            let conn = Connection::open_with_flags(
                path,
                OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?;
            conn.busy_timeout(options.busy_timeout)?;
            readers.push(Mutex::new(conn));
        }

        info!(
            "Database opened at {} (1 writer + {} readers)",
            path.display(),
            pool_size
        );
        Ok(Self {
            writer: Mutex::new(writer),
            readers,
            reader_idx: AtomicUsize::new(0),
            busy_timeout: options.busy_timeout,
        })
    }

    /// Run `f` against one consistent read snapshot.
    pub fn read<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Reader<'_>) -> Result<T>,
    {
        let idx = self.reader_idx.fetch_add(1, Ordering::Relaxed) % self.readers.len();
        let conn = self.readers[idx]
            .try_lock_for(self.busy_timeout)
            .ok_or_else(|| Error::Unavailable("timed out waiting for a reader".into()))?;

        let tx = Transaction::new_unchecked(&conn, TransactionBehavior::Deferred).store()?;
        let out = f(&Reader::new(&tx))?;
        tx.finish().store()?;
        Ok(out)
    }

    /// Run `f` in a write transaction. Commits only if `f` returns `Ok`;
    /// any error rolls back everything `f` did.
    pub(crate) fn with_conn_mut<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        let conn = self
            .writer
            .try_lock_for(self.busy_timeout)
            .ok_or_else(|| Error::Unavailable("timed out waiting for the writer".into()))?;

        let tx = Transaction::new_unchecked(&conn, TransactionBehavior::Immediate).store()?;
        let out = f(&tx)?;
        tx.commit().store()?;
        Ok(out)
    }
}

/// Maps SQLite failures onto the core error kinds.
pub(crate) fn map_sqlite(err: rusqlite::Error) -> Error {
    use rusqlite::ErrorCode;
    use rusqlite::ffi;

    match &err {
        rusqlite::Error::SqliteFailure(e, _) => match e.code {
            ErrorCode::ConstraintViolation
                if e.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
                    || e.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
            {
                Error::Conflict(err.to_string())
            }
            ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked => {
                Error::Unavailable(err.to_string())
            }
            _ => Error::Internal(err.to_string()),
        },
        _ => Error::Internal(err.to_string()),
    }
}

/// Extension trait for rusqlite results
pub(crate) trait SqlResultExt<T> {
    fn store(self) -> Result<T>;
    fn optional(self) -> Result<Option<T>>;
}

impl<T> SqlResultExt<T> for std::result::Result<T, rusqlite::Error> {
    fn store(self) -> Result<T> {
        self.map_err(map_sqlite)
    }

    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(map_sqlite(e)),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn failure(code: std::os::raw::c_int) -> rusqlite::Error {
        rusqlite::Error::SqliteFailure(rusqlite::ffi::Error::new(code), None)
    }

    #[test]
    fn unique_violation_is_conflict() {
        let err = map_sqlite(failure(rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE));
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[test]
    fn busy_is_unavailable() {
        assert!(matches!(
            map_sqlite(failure(rusqlite::ffi::SQLITE_BUSY)),
            Error::Unavailable(_)
        ));
        assert!(matches!(
            map_sqlite(failure(rusqlite::ffi::SQLITE_LOCKED)),
            Error::Unavailable(_)
        ));
    }

    #[test]
    fn other_constraints_are_internal() {
        let err = map_sqlite(failure(rusqlite::ffi::SQLITE_CONSTRAINT_CHECK));
        assert!(matches!(err, Error::Internal(_)));
    }

    #[test]
    fn optional_maps_no_rows_to_none() {
        let res: std::result::Result<i32, _> = Err(rusqlite::Error::QueryReturnedNoRows);
        assert!(res.optional().unwrap().is_none());
    }

    #[test]
    fn reopening_keeps_schema() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("reopen.db");
        drop(Database::open(&path, &DbOptions::default()).unwrap());
        let db = Database::open(&path, &DbOptions::default()).unwrap();
        let version = db.read(|r| r.schema_version()).unwrap();
        assert_eq!(version, migrations::LATEST_VERSION);
    }
}
