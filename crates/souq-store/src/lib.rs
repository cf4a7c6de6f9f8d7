//! # souq-store
//!
//! Transactional storage for the Souq bot, backed by SQLite.
//!
//! The crate exposes a synchronous [`Database`] handle wrapping a
//! `rusqlite::Connection`. Every manager operation (accounts, ledger,
//! catalog, admins, settings, tickets) is a method on [`UnitOfWork`], so
//! callers always compose them inside one transaction:
//!
//! ```no_run
//! # use souq_store::{Database, Result};
//! # use souq_shared::{ProductId, UserId};
//! # fn demo(db: &mut Database) -> Result<()> {
//! let order_id = db.unit_of_work(|uow| uow.create_order(UserId(7), ProductId(1), 2))?;
//! # let _ = order_id;
//! # Ok(())
//! # }
//! ```

pub mod accounts;
pub mod admins;
pub mod catalog;
pub mod database;
pub mod ledger;
pub mod migrations;
pub mod models;
pub mod settings;
pub mod tickets;

mod error;

pub use accounts::{LeaderboardEntry, Registration, Resolved};
pub use database::{Database, UnitOfWork};
pub use error::{Result, StoreError};
pub use models::*;
