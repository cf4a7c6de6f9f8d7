//! # souq-core
//!
//! The chat-driven side of the Souq bot: inbound routing, the dispatch
//! table, per-user sessions, handlers, the admin console and broadcast.
//!
//! Transports stay outside this crate. A host feeds [`InboundEvent`]s into
//! [`Bot::handle`], sends the returned [`OutboundPayload`]s itself, and
//! supplies an [`OutboundSink`] for messages the bot pushes on its own
//! (broadcasts).

pub mod broadcast;
pub mod config;
pub mod console;
pub mod dispatch;
pub mod error;
pub mod handlers;
pub mod oracle;
pub mod payload;
pub mod router;
pub mod session;
pub mod sink;
pub mod store;

pub use broadcast::{BroadcastEngine, DeliveryReport};
pub use config::BotConfig;
pub use error::BotError;
pub use handlers::Stats;
pub use oracle::{GameOracle, RandomOracle};
pub use payload::{Menu, OutboundPayload, Prompt, Reply, SettingTopic};
pub use router::{Bot, InboundEvent};
pub use session::SessionState;
pub use sink::{DeliveryFailure, OutboundSink};
pub use store::Store;
