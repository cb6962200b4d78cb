use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rdkafka::Message;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::message::Headers;
use shared::errors::{RepositoryError, ServiceError};
use shared::events::{
    ATTR_MESSAGE_ID, OrderCancelledPayload, OrderCreatedPayload, PaymentSucceededPayload,
    TOPIC_ORDER_CANCELLED, TOPIC_ORDER_CREATED, TOPIC_PAYMENT_SUCCEEDED,
};
use shared::idempotency::IdempotencyStore;
use tokio::sync::broadcast;
use tokio::time::{Duration, sleep};
use tracing::{debug, error, info, warn};

use crate::abstract_trait::inventory::service::DynInventoryCommandService;
use crate::domain::requests::ReserveStockRequest;
use crate::model::ReservationItem;

const SUBSCRIBED_TOPICS: [&str; 3] = [
    TOPIC_ORDER_CREATED,
    TOPIC_ORDER_CANCELLED,
    TOPIC_PAYMENT_SUCCEEDED,
];

// Applies order lifecycle events to stock. The reservation id is the order
// id, so the flow is replay-safe even without the message-id dedupe.
pub struct OrderEventHandler {
    command: DynInventoryCommandService,
    idempotency: IdempotencyStore,
}

impl OrderEventHandler {
    pub fn new(command: DynInventoryCommandService, idempotency: IdempotencyStore) -> Self {
        Self {
            command,
            idempotency,
        }
    }

    pub async fn handle(
        &self,
        topic: &str,
        message_id: Option<&str>,
        payload: &[u8],
    ) -> Result<(), ServiceError> {
        let claim_key = message_id.map(|id| format!("processed:{id}"));

        if let Some(key) = &claim_key {
            if !self.idempotency.claim(key).await {
                info!("🔁 Duplicate message {key}, skipping");
                return Ok(());
            }
        }

        let result = self.dispatch(topic, payload).await;

        if result.is_err() {
            // Give the claim back so the broker redelivery can retry.
            if let Some(key) = &claim_key {
                self.idempotency.release_claim(key).await;
            }
        }

        result
    }

    async fn dispatch(&self, topic: &str, payload: &[u8]) -> Result<(), ServiceError> {
        match topic {
            TOPIC_ORDER_CREATED => {
                let event: OrderCreatedPayload = decode(payload)?;
                let request = ReserveStockRequest {
                    reservation_id: event.order_id.clone(),
                    items: event
                        .items
                        .iter()
                        .map(|item| ReservationItem {
                            product_id: item.product_id.clone(),
                            quantity: item.quantity,
                        })
                        .collect(),
                    ttl_seconds: None,
                };

                match self.command.reserve_stock(&request).await {
                    Ok(()) => Ok(()),
                    Err(ServiceError::Repo(RepositoryError::AlreadyExists(_))) => {
                        debug!("Order {} already reserved", event.order_id);
                        Ok(())
                    }
                    Err(ServiceError::Repo(RepositoryError::InsufficientStock { .. })) => {
                        // Business outcome, not a delivery failure: the hold
                        // simply cannot be placed and retrying will not help.
                        warn!("Cannot reserve stock for order {}", event.order_id);
                        Ok(())
                    }
                    Err(e) => Err(e),
                }
            }
            TOPIC_ORDER_CANCELLED => {
                let event: OrderCancelledPayload = decode(payload)?;
                match self
                    .command
                    .release_stock(&event.order_id, "order cancelled")
                    .await
                {
                    Ok(()) => Ok(()),
                    Err(ServiceError::Repo(RepositoryError::NotFound)) => {
                        debug!("No active reservation for cancelled order {}", event.order_id);
                        Ok(())
                    }
                    Err(e) => Err(e),
                }
            }
            TOPIC_PAYMENT_SUCCEEDED => {
                let event: PaymentSucceededPayload = decode(payload)?;
                match self.command.commit_stock(&event.order_id).await {
                    Ok(()) => Ok(()),
                    Err(ServiceError::Repo(RepositoryError::NotFound)) => {
                        debug!("No active reservation for paid order {}", event.order_id);
                        Ok(())
                    }
                    Err(e) => Err(e),
                }
            }
            other => {
                debug!("Ignoring message on topic {other}");
                Ok(())
            }
        }
    }
}

fn decode<T: serde::de::DeserializeOwned>(payload: &[u8]) -> Result<T, ServiceError> {
    serde_json::from_slice(payload)
        .map_err(|e| ServiceError::Custom(format!("Failed to deserialize event: {e}")))
}

pub struct KafkaEventConsumer {
    consumer: StreamConsumer,
    handler: Arc<OrderEventHandler>,
    running: Arc<AtomicBool>,
}

impl KafkaEventConsumer {
    pub fn new(brokers: &str, group_id: &str, handler: Arc<OrderEventHandler>) -> Self {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("group.id", group_id)
            .set("enable.partition.eof", "false")
            .set("session.timeout.ms", "6000")
            .set("enable.auto.commit", "true")
            .set("auto.offset.reset", "earliest")
            .set("allow.auto.create.topics", "true")
            .create()
            .expect("Failed to create Kafka consumer");

        Self {
            consumer,
            handler,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    // Readiness handle: true while the consumer loop is alive.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }

    pub async fn start_with_shutdown(
        self,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> anyhow::Result<()> {
        self.consumer.subscribe(&SUBSCRIBED_TOPICS)?;
        info!("✅ Kafka consumer started, subscribed to order events");

        let handler = self.handler;
        let consumer = self.consumer;
        let running = self.running;
        running.store(true, Ordering::SeqCst);

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("🛑 Kafka consumer received shutdown signal");
                    break;
                }

                message_result = consumer.recv() => {
                    match message_result {
                        Err(e) => {
                            error!("Kafka receive error: {e}");
                            sleep(Duration::from_secs(5)).await;
                            continue;
                        }
                        Ok(message) => {
                            let topic = message.topic().to_string();

                            let payload = match message.payload() {
                                None => {
                                    error!(topic, "Empty message payload");
                                    continue;
                                }
                                Some(p) => p,
                            };

                            let message_id = message.headers().and_then(|headers| {
                                headers
                                    .iter()
                                    .find(|header| header.key == ATTR_MESSAGE_ID)
                                    .and_then(|header| header.value)
                                    .and_then(|value| std::str::from_utf8(value).ok())
                                    .map(str::to_string)
                            });

                            if let Err(e) = handler
                                .handle(&topic, message_id.as_deref(), payload)
                                .await
                            {
                                error!(topic, "Failed to handle event: {e}");
                            } else {
                                debug!(topic, "✅ Event processed");
                            }
                        }
                    }
                }
            }
        }

        running.store(false, Ordering::SeqCst);
        info!("✅ Kafka consumer stopped gracefully");
        Ok(())
    }
}
