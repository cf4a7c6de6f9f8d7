use thiserror::Error;

/// Failures turning user-typed or stored text into domain values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Invalid numeric id: {0:?}")]
    InvalidId(String),

    #[error("Admin level out of range: {0}")]
    InvalidAdminLevel(i64),

    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    #[error("Unknown status: {0}")]
    UnknownStatus(String),
}
