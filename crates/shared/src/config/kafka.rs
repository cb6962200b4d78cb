use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::error::KafkaResult;
use rdkafka::message::{Header, OwnedHeaders};
use rdkafka::producer::{BaseProducer, BaseRecord, Producer};
use tokio::time::Duration;
use tracing::info;

use crate::abstract_trait::KafkaTrait;
use crate::errors::ServiceError;

pub struct Kafka {
    producer: BaseProducer,
}

impl Kafka {
    pub fn new(brokers: &str) -> Self {
        let producer: BaseProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("message.timeout.ms", "6000")
            .set("allow.auto.create.topics", "true")
            .create()
            .expect("Failed to create Kafka producer");
        info!("Kafka producer connected successfully");
        Kafka { producer }
    }

    pub fn send_message(
        &self,
        topic: &str,
        key: &str,
        value: &[u8],
        headers: Option<OwnedHeaders>,
    ) -> KafkaResult<()> {
        let mut record = BaseRecord::to(topic).key(key).payload(value);
        if let Some(headers) = headers {
            record = record.headers(headers);
        }

        if let Err((kafka_error, _record)) = self.producer.send(record) {
            return Err(kafka_error);
        }

        let _ = self.producer.flush(Duration::from_secs(1));
        info!(topic, "Message sent successfully");
        Ok(())
    }
}

#[async_trait]
impl KafkaTrait for Kafka {
    async fn publish(&self, topic: &str, key: &str, value: &[u8]) -> Result<(), ServiceError> {
        self.send_message(topic, key, value, None)
            .map_err(ServiceError::from)
    }

    async fn publish_with_headers(
        &self,
        topic: &str,
        key: &str,
        value: &[u8],
        headers: &[(&str, String)],
    ) -> Result<(), ServiceError> {
        let mut owned = OwnedHeaders::new_with_capacity(headers.len());
        for (name, value) in headers {
            owned = owned.insert(Header {
                key: name,
                value: Some(value.as_str()),
            });
        }

        self.send_message(topic, key, value, Some(owned))
            .map_err(ServiceError::from)
    }
}
