use async_trait::async_trait;
use rail_core::EventPublisher;
use rail_shared::LedgerEvent;
use tokio::sync::broadcast;
use tracing::debug;

#[cfg(feature = "kafka")]
use rdkafka::config::ClientConfig;
#[cfg(feature = "kafka")]
use rdkafka::producer::{FutureProducer, FutureRecord};
#[cfg(feature = "kafka")]
use tracing::{error, info};

/// Fans ledger notifications out to in-process subscribers and, when built
/// with the `kafka` feature, to the message bus.
#[derive(Clone)]
pub struct EventProducer {
    tx: broadcast::Sender<LedgerEvent>,
    #[cfg(feature = "kafka")]
    kafka: Option<FutureProducer>,
}

impl EventProducer {
    pub fn new(channel_capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(channel_capacity);
        Self {
            tx,
            #[cfg(feature = "kafka")]
            kafka: None,
        }
    }

    #[cfg(feature = "kafka")]
    pub fn with_kafka(mut self, brokers: &str) -> Result<Self, rdkafka::error::KafkaError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("message.timeout.ms", "5000")
            .create()?;

        self.kafka = Some(producer);
        Ok(self)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.tx.subscribe()
    }

    /// Enqueue on the producer and log the delivery report in the background.
    /// Enqueueing is synchronous, so records keep their publish order within
    /// a partition while callers never wait on the broker.
    #[cfg(feature = "kafka")]
    fn send_to_kafka(&self, producer: &FutureProducer, event: &LedgerEvent) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let topic = event.topic();
        let key = event.key();
        let payload = serde_json::to_string(event)?;

        let record = FutureRecord::to(topic)
            .key(key.as_str())
            .payload(payload.as_str());

        let delivery = producer.send_result(record).map_err(|(e, _record)| {
            error!("Failed to enqueue message to {}: {}", topic, e);
            e
        })?;

        tokio::spawn(async move {
            match delivery.await {
                Ok(Ok(delivery)) => {
                    info!("Sent message to {}/{}: partition {} offset {}", topic, key, delivery.partition, delivery.offset);
                }
                Ok(Err((e, _msg))) => error!("Failed to send message to {}: {}", topic, e),
                Err(_) => error!("Delivery report for {} dropped", topic),
            }
        });

        Ok(())
    }
}

#[async_trait]
impl EventPublisher for EventProducer {
    async fn publish(&self, event: &LedgerEvent) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        // A send error only means nobody is listening right now
        if self.tx.send(event.clone()).is_err() {
            debug!("No subscribers for {} event", event.topic());
        }

        self.forward(event).await
    }
}

impl EventProducer {
    #[cfg(feature = "kafka")]
    async fn forward(&self, event: &LedgerEvent) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        match &self.kafka {
            Some(producer) => self.send_to_kafka(producer, event),
            None => Ok(()),
        }
    }

    #[cfg(not(feature = "kafka"))]
    async fn forward(&self, _event: &LedgerEvent) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Ok(())
    }
}
