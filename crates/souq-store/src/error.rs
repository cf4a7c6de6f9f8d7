use souq_shared::{ProductId, UserId};
use thiserror::Error;

/// Errors produced by the store layer.
///
/// Domain rejections (`InsufficientBalance`, `InsufficientStock`, ...) are
/// raised before any write, so the enclosing unit of work rolls back with
/// nothing to undo.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite error, including aborted or busy transactions.
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Failed to determine a platform data directory.
    #[error("Could not determine application data directory")]
    NoDataDir,

    /// Generic I/O error (e.g. creating the database directory).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A referenced record does not exist.
    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    /// Input rejected before touching the database.
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Debit would take the balance below zero.
    #[error("Insufficient balance for user {user_id}")]
    InsufficientBalance { user_id: UserId },

    /// Point adjustment would take the point total below zero.
    #[error("Insufficient points for user {user_id}")]
    InsufficientPoints { user_id: UserId },

    /// Product missing, inactive or short of the requested quantity.
    #[error("Insufficient stock for product {product_id}")]
    InsufficientStock { product_id: ProductId },

    /// Every referral code candidate collided with an existing one.
    #[error("Could not generate a unique referral code for user {user_id}")]
    CodeGenerationExhausted { user_id: UserId },

    /// Migration failure.
    #[error("Migration error: {0}")]
    Migration(String),
}

impl StoreError {
    pub(crate) fn not_found(entity: &'static str) -> Self {
        StoreError::NotFound { entity }
    }

    /// Whether the error comes from the database engine rather than from a
    /// domain rule.
    pub fn is_transaction_failure(&self) -> bool {
        matches!(
            self,
            StoreError::Sqlite(_) | StoreError::Io(_) | StoreError::NoDataDir | StoreError::Migration(_)
        )
    }
}

/// Map `QueryReturnedNoRows` to a typed [`StoreError::NotFound`].
pub(crate) fn map_not_found(entity: &'static str) -> impl FnOnce(rusqlite::Error) -> StoreError {
    move |e| match e {
        rusqlite::Error::QueryReturnedNoRows => StoreError::not_found(entity),
        other => StoreError::Sqlite(other),
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
