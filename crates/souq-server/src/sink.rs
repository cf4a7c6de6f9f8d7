//! HTTP push delivery for messages the bot sends on its own.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use souq_core::{DeliveryFailure, OutboundPayload, OutboundSink};
use souq_shared::UserId;

/// POSTs `{"user_id", "payload"}` to the transport's delivery endpoint.
/// Any non-2xx answer counts as a failed delivery.
pub struct WebhookSink {
    client: reqwest::Client,
    url: Option<String>,
}

#[derive(Serialize)]
struct Delivery<'a> {
    user_id: UserId,
    payload: &'a OutboundPayload,
}

impl WebhookSink {
    pub fn new(url: Option<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        if url.is_none() {
            tracing::warn!("DELIVERY_URL not set, pushed messages will be dropped");
        }
        Ok(Self { client, url })
    }
}

#[async_trait]
impl OutboundSink for WebhookSink {
    async fn deliver(&self, recipient: UserId, payload: &OutboundPayload) -> Result<(), DeliveryFailure> {
        let Some(url) = self.url.as_deref() else {
            return Err(DeliveryFailure::new(recipient, "no delivery endpoint configured"));
        };

        let response = self
            .client
            .post(url)
            .json(&Delivery {
                user_id: recipient,
                payload,
            })
            .send()
            .await
            .map_err(|e| DeliveryFailure::new(recipient, e.to_string()))?;

        response
            .error_for_status()
            .map(|_| ())
            .map_err(|e| DeliveryFailure::new(recipient, e.to_string()))
    }
}
