//! Broadcast fan-out.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use souq_store::StoreError;

use crate::payload::{OutboundPayload, Reply};
use crate::sink::OutboundSink;
use crate::store::Store;

/// Outcome of one broadcast run. `delivered <= attempted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DeliveryReport {
    pub attempted: usize,
    pub delivered: usize,
}

pub struct BroadcastEngine {
    store: Store,
    sink: Arc<dyn OutboundSink>,
    page_size: u32,
    pacing: Duration,
}

impl BroadcastEngine {
    pub fn new(store: Store, sink: Arc<dyn OutboundSink>, page_size: u32, pacing: Duration) -> Self {
        Self {
            store,
            sink,
            page_size,
            pacing,
        }
    }

    /// Deliver `reply` to one page of accounts, one at a time.
    ///
    /// Per-recipient failures are counted and skipped. The store is only
    /// locked while the recipient list is read.
    pub async fn broadcast(&self, reply: &Reply) -> Result<DeliveryReport, StoreError> {
        let page_size = self.page_size;
        let recipients = self
            .store
            .read(move |uow| uow.list_account_ids(page_size, 0))
            .await?;

        tracing::info!(recipients = recipients.len(), "broadcast started");

        let mut report = DeliveryReport::default();
        for (i, recipient) in recipients.into_iter().enumerate() {
            if i > 0 && !self.pacing.is_zero() {
                tokio::time::sleep(self.pacing).await;
            }

            report.attempted += 1;
            let payload = OutboundPayload::new(recipient, reply.clone());
            match self.sink.deliver(recipient, &payload).await {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    tracing::debug!(user_id = %recipient, error = %e, "broadcast delivery failed");
                }
            }
        }

        tracing::info!(
            attempted = report.attempted,
            delivered = report.delivered,
            "broadcast finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use async_trait::async_trait;
    use tokio::sync::Mutex;

    use souq_shared::UserId;
    use souq_store::{Database, Registration};

    use super::*;
    use crate::sink::DeliveryFailure;

    /// Records every delivery; fails for the listed recipients.
    #[derive(Default)]
    pub(crate) struct RecordingSink {
        pub delivered: Mutex<Vec<OutboundPayload>>,
        pub failing: Vec<UserId>,
    }

    #[async_trait]
    impl OutboundSink for RecordingSink {
        async fn deliver(&self, recipient: UserId, payload: &OutboundPayload) -> Result<(), DeliveryFailure> {
            if self.failing.contains(&recipient) {
                return Err(DeliveryFailure::new(recipient, "blocked the bot"));
            }
            self.delivered.lock().await.push(payload.clone());
            Ok(())
        }
    }

    fn store_with_accounts(ids: &[i64]) -> (Store, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let mut db = Database::open_at(&dir.path().join("broadcast.db")).unwrap();
        db.unit_of_work(|uow| {
            for id in ids {
                uow.resolve_account(&Registration {
                    user_id: UserId(*id),
                    display_name: "user",
                    referral_code: None,
                    welcome_bonus: 0,
                    referral_bonus: 0,
                })?;
            }
            Ok(())
        })
        .unwrap();
        (Store::new(db), dir)
    }

    #[tokio::test]
    async fn failed_recipient_is_counted_and_skipped() {
        let (store, _dir) = store_with_accounts(&[1, 2, 3]);
        let sink = Arc::new(RecordingSink {
            failing: vec![UserId(2)],
            ..Default::default()
        });
        let engine = BroadcastEngine::new(store, sink.clone(), 5000, Duration::ZERO);

        let report = engine
            .broadcast(&Reply::Broadcast { body: "sale today".into() })
            .await
            .unwrap();

        assert_eq!(report, DeliveryReport { attempted: 3, delivered: 2 });
        let delivered = sink.delivered.lock().await;
        assert_eq!(delivered.len(), 2);
        assert!(delivered.iter().all(|p| p.recipient != UserId(2)));
        assert!(delivered[0].text.contains("sale today"));
    }

    #[tokio::test]
    async fn page_size_caps_recipients() {
        let (store, _dir) = store_with_accounts(&[1, 2, 3, 4]);
        let sink = Arc::new(RecordingSink::default());
        let engine = BroadcastEngine::new(store, sink, 3, Duration::ZERO);

        let report = engine.broadcast(&Reply::Broadcast { body: "hi".into() }).await.unwrap();
        assert_eq!(report.attempted, 3);
        assert_eq!(report.delivered, 3);
    }

    #[tokio::test]
    async fn deliveries_are_paced() {
        let (store, _dir) = store_with_accounts(&[1, 2, 3]);
        let sink = Arc::new(RecordingSink::default());
        let engine = BroadcastEngine::new(store, sink, 5000, Duration::from_millis(50));

        let started = std::time::Instant::now();
        engine.broadcast(&Reply::Broadcast { body: "hi".into() }).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(100));
    }
}
