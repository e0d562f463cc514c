//! Asynchronous, fire-and-forget message-queue producer.
//!
//! ```text
//! send() ──▶ bounded input channel ──▶ delivery task ──▶ Transport::deliver
//!                                            │ (batch, every flush interval)
//!                                            ▼ failures
//!                                      error channel ──▶ drain task ──▶ tracing::error!
//! ```
//!
//! `send` only waits when the input channel is full. Delivery outcomes are
//! never reported back to the sender; the drain task logs failures. Nothing
//! is retried.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, info, warn};

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

// ── Configuration ────────────────────────────────────────────────────────────

/// Broker acknowledgement the transport waits for before a batch counts as
/// delivered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Acks {
    None,
    #[default]
    Leader,
    All,
}

impl Acks {
    /// The Kafka `acks` producer setting.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "0",
            Self::Leader => "1",
            Self::All => "all",
        }
    }
}

/// Producer settings. Applied once, at construction.
#[derive(Debug, Clone, Deserialize)]
pub struct ProducerConfig {
    pub brokers: Vec<String>,
    pub topic: String,
    #[serde(default)]
    pub acks: Acks,
    /// How often buffered messages are flushed to the transport.
    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,
    /// A batch is flushed early once it holds this many messages.
    #[serde(default = "default_max_batch")]
    pub max_batch: usize,
    /// Input channel capacity. `send` waits while the channel is full.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    #[serde(default)]
    pub partition: i32,
}

fn default_flush_interval_ms() -> u64 { 500 }
fn default_max_batch() -> usize { 256 }
fn default_channel_capacity() -> usize { 256 }

impl ProducerConfig {
    pub fn new<I, S>(brokers: I, topic: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            brokers: brokers.into_iter().map(Into::into).collect(),
            topic: topic.into(),
            acks: Acks::default(),
            flush_interval_ms: default_flush_interval_ms(),
            max_batch: default_max_batch(),
            channel_capacity: default_channel_capacity(),
            partition: 0,
        }
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms.max(1))
    }

    fn validate(&self) -> Result<(), ProducerError> {
        if self.brokers.iter().all(|b| b.trim().is_empty()) {
            return Err(ProducerError::NoBrokers);
        }
        if self.topic.trim().is_empty() {
            return Err(ProducerError::NoTopic);
        }
        Ok(())
    }
}

// ── Errors ───────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("no broker reachable: {0}")]
    Unreachable(#[source] BoxError),

    #[error("delivery failed: {0}")]
    Delivery(#[source] BoxError),
}

#[derive(Debug, thiserror::Error)]
pub enum ProducerError {
    #[error("at least one broker address is required")]
    NoBrokers,

    #[error("topic name is required")]
    NoTopic,

    #[error("producer key is empty")]
    EmptyKey,

    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("producer is closed")]
    Closed,

    #[error("no queue transport compiled in; enable the `kafka` feature")]
    NoTransport,

    #[error(transparent)]
    Transport(#[from] TransportError),
}

// ── Transport ────────────────────────────────────────────────────────────────

/// One encoded message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub key: Option<Bytes>,
    pub value: Bytes,
}

/// The wire client underneath a [`QueueProducer`].
///
/// Implementations are connected before they are handed to the producer and
/// are only ever called from its delivery task.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn deliver(&self, topic: &str, batch: &[Message]) -> Result<(), TransportError>;
}

/// A failed batch, as seen by the drain task.
#[derive(Debug)]
pub struct DeliveryFailure {
    pub messages: usize,
    pub error: TransportError,
}

// ── Producer ─────────────────────────────────────────────────────────────────

/// A shared, long-lived queue producer.
///
/// Create one at startup, wrap it in an `Arc`, and call [`close`](Self::close)
/// once at shutdown.
pub struct QueueProducer {
    topic: String,
    input: Mutex<Option<mpsc::Sender<Message>>>,
    tasks: Mutex<Option<Tasks>>,
}

struct Tasks {
    delivery: JoinHandle<()>,
    drain: JoinHandle<()>,
}

impl QueueProducer {
    /// Starts a producer over an already connected transport.
    ///
    /// Spawns the delivery and error-drain tasks, so it must be called from
    /// within a Tokio runtime.
    pub fn new(config: ProducerConfig, transport: Arc<dyn Transport>) -> Result<Self, ProducerError> {
        config.validate()?;

        let (input, rx) = mpsc::channel(config.channel_capacity.max(1));
        let (failures, failures_rx) = mpsc::unbounded_channel();

        let delivery = tokio::spawn(deliver_loop(
            transport,
            config.topic.clone(),
            rx,
            failures,
            config.flush_interval(),
            config.max_batch.max(1),
        ));
        let drain = tokio::spawn(drain_failures(config.topic.clone(), failures_rx));

        info!(
            topic = %config.topic,
            brokers = ?config.brokers,
            acks = ?config.acks,
            flush_interval_ms = config.flush_interval_ms,
            "queue producer started"
        );

        Ok(Self {
            topic: config.topic,
            input: Mutex::new(Some(input)),
            tasks: Mutex::new(Some(Tasks { delivery, drain })),
        })
    }

    /// Connects the compiled-in transport to `config.brokers` and starts a
    /// producer on it. Fails when no broker can be reached.
    pub async fn connect(config: ProducerConfig) -> Result<Self, ProducerError> {
        config.validate()?;
        let transport = connect_transport(&config).await?;
        Self::new(config, transport)
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Encodes `value` as JSON and enqueues it without a key.
    pub async fn send<T: Serialize + ?Sized>(&self, value: &T) -> Result<(), ProducerError> {
        let value = serde_json::to_vec(value)?;
        self.enqueue(Message { key: None, value: value.into() }).await
    }

    /// Like [`send`](Self::send), with a partitioning key.
    pub async fn send_with_key<T: Serialize + ?Sized>(
        &self,
        value: &T,
        key: &str,
    ) -> Result<(), ProducerError> {
        let value = serde_json::to_vec(value)?;
        if key.is_empty() {
            return Err(ProducerError::EmptyKey);
        }
        self.enqueue(Message { key: Some(Bytes::copy_from_slice(key.as_bytes())), value: value.into() })
            .await
    }

    async fn enqueue(&self, message: Message) -> Result<(), ProducerError> {
        let input = self
            .input
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(ProducerError::Closed)?;
        input.send(message).await.map_err(|_| ProducerError::Closed)
    }

    /// Stops accepting messages, flushes what is buffered and waits for both
    /// background tasks. A second call returns [`ProducerError::Closed`].
    pub async fn close(&self) -> Result<(), ProducerError> {
        let input = self.input.lock().unwrap_or_else(PoisonError::into_inner).take();
        let tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner).take();
        let (Some(input), Some(tasks)) = (input, tasks) else {
            return Err(ProducerError::Closed);
        };
        drop(input);

        if let Err(e) = tasks.delivery.await {
            warn!(error = %e, topic = %self.topic, "delivery task ended abnormally");
        }
        if let Err(e) = tasks.drain.await {
            warn!(error = %e, topic = %self.topic, "error drain task ended abnormally");
        }
        info!(topic = %self.topic, "queue producer closed");
        Ok(())
    }
}

#[cfg(feature = "kafka")]
async fn connect_transport(config: &ProducerConfig) -> Result<Arc<dyn Transport>, ProducerError> {
    let transport = super::kafka::KafkaTransport::connect(config).await?;
    Ok(Arc::new(transport))
}

#[cfg(not(feature = "kafka"))]
async fn connect_transport(_config: &ProducerConfig) -> Result<Arc<dyn Transport>, ProducerError> {
    Err(ProducerError::NoTransport)
}

async fn deliver_loop(
    transport: Arc<dyn Transport>,
    topic: String,
    mut input: mpsc::Receiver<Message>,
    failures: mpsc::UnboundedSender<DeliveryFailure>,
    flush_interval: Duration,
    max_batch: usize,
) {
    let mut batch = Vec::with_capacity(max_batch);
    let mut ticker = interval(flush_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            message = input.recv() => match message {
                Some(message) => {
                    batch.push(message);
                    if batch.len() >= max_batch {
                        flush(transport.as_ref(), &topic, &mut batch, &failures).await;
                    }
                }
                None => {
                    flush(transport.as_ref(), &topic, &mut batch, &failures).await;
                    break;
                }
            },
            _ = ticker.tick() => {
                flush(transport.as_ref(), &topic, &mut batch, &failures).await;
            }
        }
    }
    debug!(topic = %topic, "delivery task stopped");
}

async fn flush(
    transport: &dyn Transport,
    topic: &str,
    batch: &mut Vec<Message>,
    failures: &mpsc::UnboundedSender<DeliveryFailure>,
) {
    if batch.is_empty() {
        return;
    }
    if let Err(error) = transport.deliver(topic, batch).await {
        let _ = failures.send(DeliveryFailure { messages: batch.len(), error });
    }
    batch.clear();
}

async fn drain_failures(topic: String, mut failures: mpsc::UnboundedReceiver<DeliveryFailure>) {
    while let Some(failure) = failures.recv().await {
        error!(
            topic = %topic,
            messages = failure.messages,
            error = %failure.error,
            "failed to deliver messages to queue"
        );
    }
    debug!(topic = %topic, "error drain task stopped");
}

// ── Test doubles ─────────────────────────────────────────────────────────────

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    /// Keeps every delivered batch.
    #[derive(Default)]
    pub struct RecordingTransport {
        batches: Mutex<Vec<Vec<Message>>>,
    }

    impl RecordingTransport {
        pub fn messages(&self) -> Vec<Message> {
            self.batches.lock().unwrap().iter().flatten().cloned().collect()
        }

        pub fn batch_sizes(&self) -> Vec<usize> {
            self.batches.lock().unwrap().iter().map(Vec::len).collect()
        }
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn deliver(&self, _topic: &str, batch: &[Message]) -> Result<(), TransportError> {
            self.batches.lock().unwrap().push(batch.to_vec());
            Ok(())
        }
    }

    /// Rejects everything.
    #[derive(Default)]
    pub struct FailingTransport {
        pub attempts: AtomicUsize,
    }

    #[async_trait]
    impl Transport for FailingTransport {
        async fn deliver(&self, _topic: &str, _batch: &[Message]) -> Result<(), TransportError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(TransportError::Delivery("broker not available".into()))
        }
    }
}
