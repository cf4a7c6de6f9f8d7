//! Command and session-input handlers.
//!
//! Each sub-module adds methods to [`Bot`](crate::Bot) for one menu. Handlers
//! return the payloads for the acting user; admin-only commands are gated in
//! the router before they get here.

mod admin;
mod games;
mod menu;
mod profile;
mod shop;
mod support;
mod wallet;

pub use admin::Stats;
