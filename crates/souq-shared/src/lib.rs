//! # souq-shared
//!
//! Identifier newtypes, ranks, categories and constants shared by the store,
//! the chat core and the server binary.

pub mod constants;
pub mod error;
pub mod types;

pub use error::ParseError;
pub use types::*;
