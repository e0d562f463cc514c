//! Kafka [`Transport`] on top of `rdkafka`.

use std::time::Duration;

use async_trait::async_trait;
use rdkafka::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use tracing::info;

use super::producer::{Message, ProducerConfig, Transport, TransportError};

const METADATA_TIMEOUT: Duration = Duration::from_secs(10);

/// Produces to one partition of one topic.
pub struct KafkaTransport {
    producer: FutureProducer,
    partition: i32,
}

impl KafkaTransport {
    /// Creates the client and fetches the topic's metadata, which fails when
    /// no bootstrap broker answers.
    pub async fn connect(config: &ProducerConfig) -> Result<Self, TransportError> {
        let producer: FutureProducer = client_config(config)
            .create()
            .map_err(|e| TransportError::Unreachable(Box::new(e)))?;

        let probe = producer.clone();
        let topic = config.topic.clone();
        tokio::task::spawn_blocking(move || probe.client().fetch_metadata(Some(&topic), METADATA_TIMEOUT))
            .await
            .map_err(|e| TransportError::Unreachable(Box::new(e)))?
            .map_err(|e| TransportError::Unreachable(Box::new(e)))?;

        info!(
            topic = %config.topic,
            partition = config.partition,
            acks = config.acks.as_str(),
            "connected to kafka"
        );
        Ok(Self { producer, partition: config.partition })
    }
}

fn client_config(config: &ProducerConfig) -> ClientConfig {
    let mut client = ClientConfig::new();
    client
        .set("bootstrap.servers", config.brokers.join(","))
        .set("acks", config.acks.as_str())
        // Batches are already formed by the delivery task.
        .set("queue.buffering.max.ms", "5");
    client
}

#[async_trait]
impl Transport for KafkaTransport {
    async fn deliver(&self, topic: &str, batch: &[Message]) -> Result<(), TransportError> {
        let mut pending = Vec::with_capacity(batch.len());
        for message in batch {
            let mut record = FutureRecord::<[u8], [u8]>::to(topic)
                .payload(message.value.as_ref())
                .partition(self.partition);
            if let Some(key) = &message.key {
                record = record.key(key.as_ref());
            }
            let delivery = self
                .producer
                .send_result(record)
                .map_err(|(e, _)| TransportError::Delivery(Box::new(e)))?;
            pending.push(delivery);
        }

        for delivery in pending {
            match delivery.await {
                Ok(Ok(_)) => {}
                Ok(Err((e, _))) => return Err(TransportError::Delivery(Box::new(e))),
                Err(_) => return Err(TransportError::Delivery("delivery report dropped".into())),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::producer::Acks;

    #[test]
    fn client_applies_acks_and_brokers() {
        let config = ProducerConfig::new(["k1:9092", "k2:9092"], "access");
        let client = client_config(&config);
        assert_eq!(client.get("bootstrap.servers"), Some("k1:9092,k2:9092"));
        assert_eq!(client.get("acks"), Some("1"));

        let config = ProducerConfig { acks: Acks::All, ..config };
        assert_eq!(client_config(&config).get("acks"), Some("all"));
    }
}
