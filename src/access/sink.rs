//! Where access records go.
//!
//! | Variant | Delivery | On failure |
//! |---|---|---|
//! | [`Sink::Default`] | `tracing` event, synchronous | n/a |
//! | [`Sink::File`] | JSON line appended to a file, synchronous | `tracing` warning |
//! | [`Sink::Queue`] | [`QueueProducer`], asynchronous | `tracing` error |
//!
//! None of them ever hands an error back to the request path.

use std::fs::{self, OpenOptions};
use std::io::{self, LineWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use tracing::{error, info, warn};

use super::producer::QueueProducer;
use super::record::AccessRecord;
use crate::config::SinkConfig;

/// `tracing` target of every access event the default sink emits.
pub const ACCESS_TARGET: &str = "footprint::access";

/// The configured destination for access records.
pub enum Sink {
    Default(DefaultSink),
    File(FileSink),
    Queue(QueueSink),
}

impl Default for Sink {
    fn default() -> Self {
        Self::Default(DefaultSink)
    }
}

impl Sink {
    /// Hands one record over. Never fails from the caller's point of view.
    pub async fn write(&self, record: AccessRecord) {
        match self {
            Self::Default(sink) => sink.write(&record),
            Self::File(sink) => sink.write(&record),
            Self::Queue(sink) => sink.write(&record).await,
        }
    }

    /// Builds the sink `config` asks for.
    ///
    /// A queue sink whose producer cannot be constructed is not installed;
    /// the reason is logged and the default sink is returned instead.
    pub async fn from_config(config: &SinkConfig) -> Self {
        match config {
            SinkConfig::Default => Self::default(),
            SinkConfig::File { path } => Self::File(FileSink::open(path)),
            SinkConfig::Queue(producer) => match QueueProducer::connect(producer.clone()).await {
                Ok(producer) => Self::Queue(QueueSink::new(Arc::new(producer))),
                Err(e) => {
                    error!(error = %e, topic = %producer.topic, "queue sink unavailable, falling back to default sink");
                    Self::default()
                }
            },
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Default(_) => "default",
            Self::File(_) => "file",
            Self::Queue(_) => "queue",
        }
    }
}

/// Emits each record as a `tracing` event: ERROR when the request failed,
/// INFO otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultSink;

impl DefaultSink {
    pub fn write(&self, record: &AccessRecord) {
        let error = record.error.as_deref().unwrap_or_default();
        if record.has_error() {
            error!(
                target: ACCESS_TARGET,
                time = %record.timestamp.to_rfc3339(),
                remote_ip = %record.remote_ip,
                host = %record.host,
                method = %record.method,
                uri = %record.uri,
                user_agent = %record.user_agent,
                status = record.status,
                error = %error,
                latency = record.latency,
                bytes_out = record.bytes_sent,
                "accesslog"
            );
        } else {
            info!(
                target: ACCESS_TARGET,
                time = %record.timestamp.to_rfc3339(),
                remote_ip = %record.remote_ip,
                host = %record.host,
                method = %record.method,
                uri = %record.uri,
                user_agent = %record.user_agent,
                status = record.status,
                error = %error,
                latency = record.latency,
                bytes_out = record.bytes_sent,
                "accesslog"
            );
        }
    }
}

/// Appends one JSON object per record to a file opened once, at
/// construction.
pub struct FileSink {
    out: Mutex<LineWriter<Box<dyn Write + Send>>>,
}

#[derive(Serialize)]
struct FileLine<'a> {
    level: &'static str,
    #[serde(flatten)]
    record: &'a AccessRecord,
}

impl FileSink {
    /// Opens `path` for appending, creating it and its parent directories if
    /// needed. If that fails the sink writes to stderr instead.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let out: Box<dyn Write + Send> = match open_append(path) {
            Ok(file) => Box::new(file),
            Err(e) => {
                info!(error = %e, path = %path.display(), "failed to open access log file, using stderr");
                Box::new(io::stderr())
            }
        };
        Self::from_writer(out)
    }

    pub(crate) fn from_writer(out: Box<dyn Write + Send>) -> Self {
        Self { out: Mutex::new(LineWriter::new(out)) }
    }

    pub fn write(&self, record: &AccessRecord) {
        let line = FileLine {
            level: if record.has_error() { "error" } else { "info" },
            record,
        };
        let mut bytes = match serde_json::to_vec(&line) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, request_id = %record.request_id, "failed to encode access record");
                return;
            }
        };
        bytes.push(b'\n');

        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = out.write_all(&bytes).and_then(|()| out.flush()) {
            warn!(error = %e, request_id = %record.request_id, "failed to write access record");
        }
    }
}

fn open_append(path: &Path) -> io::Result<fs::File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Publishes records through a shared [`QueueProducer`].
pub struct QueueSink {
    producer: Arc<QueueProducer>,
}

impl QueueSink {
    pub fn new(producer: Arc<QueueProducer>) -> Self {
        Self { producer }
    }

    pub fn producer(&self) -> &Arc<QueueProducer> {
        &self.producer
    }

    pub async fn write(&self, record: &AccessRecord) {
        if let Err(e) = self.producer.send(record).await {
            error!(error = %e, request_id = %record.request_id, "failed to send access record to queue");
        }
    }
}
