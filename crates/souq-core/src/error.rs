use souq_shared::{ParseError, UserId};
use souq_store::StoreError;
use thiserror::Error;

use crate::payload::Reply;

/// Errors raised while handling an inbound event.
///
/// None of them escape [`Bot::handle`](crate::Bot::handle): each one is
/// turned into a user-visible [`Reply`] by [`BotError::into_reply`].
#[derive(Error, Debug)]
pub enum BotError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("User {user_id} is not an admin")]
    PermissionDenied { user_id: UserId },

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("Invalid input: {0}")]
    Validation(String),
}

impl BotError {
    /// Map the error onto the reply shown to the user. Store failures are
    /// logged here, once, and collapse into a generic retry message.
    pub fn into_reply(self) -> Reply {
        match self {
            BotError::PermissionDenied { .. } => Reply::PermissionDenied,
            BotError::Parse(e) => Reply::InvalidInput { reason: e.to_string() },
            BotError::Validation(reason) => Reply::InvalidInput { reason },
            BotError::Store(e) => match e {
                StoreError::InsufficientBalance { .. } => Reply::InsufficientBalance,
                StoreError::InsufficientPoints { .. } => Reply::InsufficientPoints,
                StoreError::InsufficientStock { .. } => Reply::OutOfStock,
                StoreError::NotFound { entity } => Reply::NotFound { entity },
                StoreError::Validation(reason) => Reply::InvalidInput { reason },
                other => {
                    tracing::error!(error = %other, "store operation failed");
                    Reply::OperationFailed
                }
            },
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, BotError>;
