//! Outbound delivery port.

use async_trait::async_trait;
use thiserror::Error;

use souq_shared::UserId;

use crate::payload::OutboundPayload;

/// A single recipient could not be reached.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("delivery to {recipient} failed: {reason}")]
pub struct DeliveryFailure {
    pub recipient: UserId,
    pub reason: String,
}

impl DeliveryFailure {
    pub fn new(recipient: UserId, reason: impl Into<String>) -> Self {
        Self {
            recipient,
            reason: reason.into(),
        }
    }
}

/// Pushes a payload to a user outside of a request/response exchange.
///
/// Implemented by the transport. The core only calls it from the broadcast
/// engine; ordinary replies are returned from [`Bot::handle`](crate::Bot::handle).
#[async_trait]
pub trait OutboundSink: Send + Sync {
    async fn deliver(&self, recipient: UserId, payload: &OutboundPayload) -> Result<(), DeliveryFailure>;
}
