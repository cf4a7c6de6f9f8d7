//! Shared async handle to the database.

use std::sync::Arc;

use tokio::sync::Mutex;

use souq_store::{Database, Result, UnitOfWork};

/// Cloneable handle serializing access to one [`Database`] connection.
///
/// The lock is held only for the duration of one unit of work; closures
/// run synchronously and never await.
#[derive(Clone)]
pub struct Store {
    db: Arc<Mutex<Database>>,
}

impl Store {
    pub fn new(db: Database) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
        }
    }

    /// Run `f` in a write transaction (`BEGIN IMMEDIATE`).
    pub async fn write<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&UnitOfWork<'_>) -> Result<T> + Send,
        T: Send,
    {
        let mut db = self.db.lock().await;
        db.unit_of_work(f)
    }

    /// Run `f` in a read transaction.
    pub async fn read<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&UnitOfWork<'_>) -> Result<T> + Send,
        T: Send,
    {
        let mut db = self.db.lock().await;
        db.read(f)
    }
}
