//! Database connection management.
//!
//! The [`Database`] struct owns a [`rusqlite::Connection`] and guarantees that
//! migrations are run before any other operation. All manager operations run
//! against a [`UnitOfWork`], a transaction that commits when the closure
//! returns `Ok` and rolls back on every other exit path.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::error::{Result, StoreError};
use crate::migrations;

/// How long a writer waits for another connection's write lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Wrapper around a [`rusqlite::Connection`].
pub struct Database {
    conn: Connection,
}

/// A transaction-scoped handle passed into every manager operation.
///
/// Dropping it without going through [`Database::unit_of_work`]'s commit
/// rolls everything back.
pub struct UnitOfWork<'c> {
    tx: Transaction<'c>,
}

impl UnitOfWork<'_> {
    /// The connection the transaction runs on.
    pub fn conn(&self) -> &Connection {
        &self.tx
    }
}

impl Database {
    /// Open (or create) the default application database.
    ///
    /// The database file is placed in the platform-appropriate data directory:
    /// - Linux:   `~/.local/share/souq/souq.db`
    /// - macOS:   `~/Library/Application Support/com.souq.souq/souq.db`
    /// - Windows: `{FOLDERID_RoamingAppData}\souq\souq\data\souq.db`
    pub fn new() -> Result<Self> {
        let db_path = Self::default_path()?;
        tracing::info!(path = %db_path.display(), "opening database");
        Self::open_at(&db_path)
    }

    /// Location used by [`Database::new`]; creates the parent directory.
    pub fn default_path() -> Result<PathBuf> {
        let project_dirs = ProjectDirs::from("com", "souq", "souq").ok_or(StoreError::NoDataDir)?;

        let data_dir = project_dirs.data_dir();
        std::fs::create_dir_all(data_dir)?;

        Ok(data_dir.join("souq.db"))
    }

    /// Open (or create) a database at an explicit path.
    ///
    /// Several handles may be opened on the same file; their write
    /// transactions serialize on SQLite's database lock.
    pub fn open_at(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;

        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.busy_timeout(BUSY_TIMEOUT)?;

        migrations::run_migrations(&conn)?;

        Ok(Self { conn })
    }

    /// Run `f` inside a write transaction.
    ///
    /// The transaction is opened with `BEGIN IMMEDIATE`, so the write lock is
    /// held from the first read: a read-check-write sequence inside `f`
    /// cannot interleave with another connection's.
    pub fn unit_of_work<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&UnitOfWork<'_>) -> Result<T>,
    {
        self.run(TransactionBehavior::Immediate, f)
    }

    /// Run `f` inside a deferred (read) transaction.
    pub fn read<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&UnitOfWork<'_>) -> Result<T>,
    {
        self.run(TransactionBehavior::Deferred, f)
    }

    fn run<T, F>(&mut self, behavior: TransactionBehavior, f: F) -> Result<T>
    where
        F: FnOnce(&UnitOfWork<'_>) -> Result<T>,
    {
        let tx = self.conn.transaction_with_behavior(behavior)?;
        let uow = UnitOfWork { tx };

        match f(&uow) {
            Ok(value) => {
                uow.tx.commit()?;
                Ok(value)
            }
            Err(e) => {
                if e.is_transaction_failure() {
                    tracing::error!(error = %e, "transaction aborted, rolling back");
                } else {
                    tracing::debug!(error = %e, "unit of work rejected, rolling back");
                }
                // Dropping the transaction rolls it back.
                drop(uow);
                Err(e)
            }
        }
    }

    /// Return a reference to the underlying `rusqlite::Connection`.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Return the filesystem path of the open database (if any).
    pub fn path(&self) -> Option<PathBuf> {
        self.conn.path().map(PathBuf::from)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tempfile::TempDir;

    pub(crate) fn test_db() -> (Database, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(&dir.path().join("test.db")).unwrap();
        (db, dir)
    }

    #[test]
    fn open_round_trip() {
        let (db, _dir) = test_db();
        assert!(db.path().is_some());
    }

    #[test]
    fn failed_unit_of_work_rolls_back() {
        let (mut db, _dir) = test_db();

        let result: Result<()> = db.unit_of_work(|uow| {
            uow.conn().execute(
                "INSERT INTO settings (key, value, updated_at) VALUES ('k', 'v', 'now')",
                [],
            )?;
            Err(StoreError::Validation("abort".into()))
        });
        assert!(result.is_err());

        let count: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM settings WHERE key = 'k'", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn successful_unit_of_work_commits() {
        let (mut db, _dir) = test_db();

        db.unit_of_work(|uow| {
            uow.conn().execute(
                "INSERT INTO settings (key, value, updated_at) VALUES ('k', 'v', 'now')",
                [],
            )?;
            Ok(())
        })
        .unwrap();

        let value: String = db
            .conn()
            .query_row("SELECT value FROM settings WHERE key = 'k'", [], |row| row.get(0))
            .unwrap();
        assert_eq!(value, "v");
    }
}
