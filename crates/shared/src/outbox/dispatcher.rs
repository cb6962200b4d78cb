use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{debug, error, info};

use crate::abstract_trait::DynKafka;
use crate::errors::ServiceError;
use crate::events::{
    ATTR_AGGREGATE_ID, ATTR_AGGREGATE_TYPE, ATTR_EVENT_ID, ATTR_EVENT_TYPE, ATTR_MESSAGE_ID,
};
use crate::outbox::{OutboxEvent, OutboxSourceTrait, message_id};

pub type DynOutboxSource = Arc<dyn OutboxSourceTrait + Send + Sync>;

/// Long-running worker that drains committed-but-unpublished events to the
/// broker. Publish and mark happen outside the aggregate transaction, so a
/// crash between them only causes a republish that consumers dedupe on
/// `message_id`.
pub struct OutboxDispatcher {
    source: DynOutboxSource,
    kafka: DynKafka,
    poll_interval: Duration,
    batch_size: i64,
    running: Arc<AtomicBool>,
}

impl OutboxDispatcher {
    pub fn new(
        source: DynOutboxSource,
        kafka: DynKafka,
        poll_interval: Duration,
        batch_size: i64,
    ) -> Self {
        Self {
            source,
            kafka,
            poll_interval,
            batch_size,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Readiness handle: true while the dispatcher loop is alive.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }

    pub async fn run(&self, mut shutdown_rx: broadcast::Receiver<()>) {
        info!("🚚 Outbox dispatcher started (every {:?})", self.poll_interval);
        self.running.store(true, Ordering::SeqCst);

        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("🛑 Outbox dispatcher received shutdown signal");
                    break;
                }
                _ = interval.tick() => {
                    if let Err(e) = self.process_batch().await {
                        error!("❌ Outbox batch failed: {e:?}");
                    }
                }
            }
        }

        self.running.store(false, Ordering::SeqCst);
        info!("✅ Outbox dispatcher stopped gracefully");
    }

    async fn process_batch(&self) -> Result<(), ServiceError> {
        let events = self
            .source
            .fetch_unpublished(self.batch_size)
            .await
            .map_err(ServiceError::Repo)?;

        if events.is_empty() {
            return Ok(());
        }

        info!("📦 Processing {} outbox events", events.len());

        for event in &events {
            if let Err(e) = self.publish_event(event).await {
                error!("❌ Failed to publish event {}: {e:?}", event.id);
                continue;
            }

            if let Err(e) = self.source.mark_published(event.id).await {
                // The event will be republished next tick; consumers dedupe
                // on the message id.
                error!("❌ Failed to mark event {} published: {e:?}", event.id);
                continue;
            }

            info!(
                "📤 Event published | id={} type={}",
                event.id, event.event_type
            );
        }

        Ok(())
    }

    async fn publish_event(&self, event: &OutboxEvent) -> Result<(), ServiceError> {
        let payload = serde_json::to_vec(&event.payload)
            .map_err(|e| ServiceError::Internal(format!("Failed to serialize payload: {e}")))?;

        let dedup_id = message_id(&event.id);
        let headers = [
            (ATTR_EVENT_ID, event.id.to_string()),
            (ATTR_AGGREGATE_TYPE, event.aggregate_type.clone()),
            (ATTR_AGGREGATE_ID, event.aggregate_id.clone()),
            (ATTR_EVENT_TYPE, event.event_type.clone()),
            (ATTR_MESSAGE_ID, dedup_id.clone()),
        ];

        self.kafka
            .publish_with_headers(&event.event_type, &event.aggregate_id, &payload, &headers)
            .await?;

        debug!(
            "Published to broker | topic={} message_id={}",
            event.event_type, dedup_id
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use async_trait::async_trait;
    use chrono::Utc;
    use tokio::sync::Mutex;
    use uuid::Uuid;

    use super::*;
    use crate::abstract_trait::KafkaTrait;
    use crate::errors::RepositoryError;

    #[derive(Clone, Debug)]
    struct SentMessage {
        topic: String,
        key: String,
        message_id: String,
    }

    #[derive(Default)]
    struct FakeKafka {
        sent: Mutex<Vec<SentMessage>>,
        fail_publish: std::sync::atomic::AtomicBool,
    }

    #[async_trait]
    impl KafkaTrait for FakeKafka {
        async fn publish(&self, topic: &str, key: &str, _value: &[u8]) -> Result<(), ServiceError> {
            self.publish_with_headers(topic, key, _value, &[]).await
        }

        async fn publish_with_headers(
            &self,
            topic: &str,
            key: &str,
            _value: &[u8],
            headers: &[(&str, String)],
        ) -> Result<(), ServiceError> {
            if self.fail_publish.load(Ordering::SeqCst) {
                return Err(ServiceError::Kafka("broker unreachable".into()));
            }

            let message_id = headers
                .iter()
                .find(|(name, _)| *name == ATTR_MESSAGE_ID)
                .map(|(_, value)| value.clone())
                .unwrap_or_default();

            self.sent.lock().await.push(SentMessage {
                topic: topic.to_string(),
                key: key.to_string(),
                message_id,
            });
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeSource {
        events: Mutex<Vec<OutboxEvent>>,
        fail_mark: std::sync::atomic::AtomicBool,
    }

    impl FakeSource {
        async fn push(&self, event_type: &str, aggregate_id: &str) -> Uuid {
            let id = Uuid::new_v4();
            self.events.lock().await.push(OutboxEvent {
                id,
                aggregate_type: "order".into(),
                aggregate_id: aggregate_id.into(),
                event_type: event_type.into(),
                payload: serde_json::json!({"order_id": aggregate_id}),
                published: false,
                published_at: None,
                created_at: Utc::now(),
            });
            id
        }

        async fn unpublished_count(&self) -> usize {
            self.events
                .lock()
                .await
                .iter()
                .filter(|e| !e.published)
                .count()
        }
    }

    #[async_trait]
    impl OutboxSourceTrait for FakeSource {
        async fn fetch_unpublished(
            &self,
            limit: i64,
        ) -> Result<Vec<OutboxEvent>, RepositoryError> {
            Ok(self
                .events
                .lock()
                .await
                .iter()
                .filter(|e| !e.published)
                .take(limit as usize)
                .cloned()
                .collect())
        }

        async fn mark_published(&self, id: Uuid) -> Result<(), RepositoryError> {
            if self.fail_mark.load(Ordering::SeqCst) {
                return Err(RepositoryError::Custom("mark failed".into()));
            }
            let mut events = self.events.lock().await;
            if let Some(event) = events.iter_mut().find(|e| e.id == id && !e.published) {
                event.published = true;
                event.published_at = Some(Utc::now());
            }
            Ok(())
        }
    }

    fn dispatcher(source: Arc<FakeSource>, kafka: Arc<FakeKafka>) -> OutboxDispatcher {
        OutboxDispatcher::new(source, kafka, Duration::from_millis(10), 100)
    }

    #[tokio::test]
    async fn publishes_with_sha256_message_id_and_marks_rows() {
        let source = Arc::new(FakeSource::default());
        let kafka = Arc::new(FakeKafka::default());
        let id = source.push("order.created", "o1").await;

        dispatcher(source.clone(), kafka.clone())
            .process_batch()
            .await
            .unwrap();

        let sent = kafka.sent.lock().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].topic, "order.created");
        assert_eq!(sent[0].key, "o1");
        assert_eq!(sent[0].message_id, message_id(&id));
        drop(sent);

        assert_eq!(source.unpublished_count().await, 0);
    }

    #[tokio::test]
    async fn publish_failure_leaves_row_for_next_tick() {
        let source = Arc::new(FakeSource::default());
        let kafka = Arc::new(FakeKafka::default());
        source.push("order.created", "o1").await;
        kafka.fail_publish.store(true, Ordering::SeqCst);

        let dispatcher = dispatcher(source.clone(), kafka.clone());
        dispatcher.process_batch().await.unwrap();
        assert_eq!(source.unpublished_count().await, 1);

        // Broker recovers; the next tick drains the row.
        kafka.fail_publish.store(false, Ordering::SeqCst);
        dispatcher.process_batch().await.unwrap();
        assert_eq!(source.unpublished_count().await, 0);
        assert_eq!(kafka.sent.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn mark_failure_causes_republish_that_consumers_dedupe() {
        let source = Arc::new(FakeSource::default());
        let kafka = Arc::new(FakeKafka::default());
        source.push("order.created", "o1").await;
        source.fail_mark.store(true, Ordering::SeqCst);

        let dispatcher = dispatcher(source.clone(), kafka.clone());
        dispatcher.process_batch().await.unwrap();
        // Published but not marked; the row is picked up again.
        assert_eq!(source.unpublished_count().await, 1);

        source.fail_mark.store(false, Ordering::SeqCst);
        dispatcher.process_batch().await.unwrap();

        let sent = kafka.sent.lock().await;
        assert_eq!(sent.len(), 2);

        // A consumer keyed on message_id sees exactly one delivery.
        let mut seen = HashSet::new();
        let delivered = sent
            .iter()
            .filter(|m| seen.insert(m.message_id.clone()))
            .count();
        assert_eq!(delivered, 1);
    }

    #[tokio::test]
    async fn run_drains_and_exits_on_shutdown() {
        let source = Arc::new(FakeSource::default());
        let kafka = Arc::new(FakeKafka::default());
        source.push("order.created", "o1").await;

        let dispatcher = Arc::new(dispatcher(source.clone(), kafka.clone()));
        let running = dispatcher.running_flag();
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let worker = {
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move { dispatcher.run(shutdown_rx).await })
        };

        // Give the loop a couple of ticks to drain the row.
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(running.load(Ordering::SeqCst));
        assert_eq!(source.unpublished_count().await, 0);

        shutdown_tx.send(()).unwrap();
        worker.await.unwrap();
        assert!(!running.load(Ordering::SeqCst));
    }
}
