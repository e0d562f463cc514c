//! Access logging: one structured record per HTTP request.
//!
//! The pieces, in the order a request meets them:
//!
//! - [`CaptureEnvelope`] snapshots the request and times it.
//! - [`RouteResolver`] names the request (`controller` / `action`).
//! - [`Sink`] writes the finished [`AccessRecord`] somewhere.
//!
//! [`AccessLogger`](crate::middleware::AccessLogger) wires them into the
//! middleware chain.

mod capture;
mod identity;
#[cfg(feature = "kafka")]
mod kafka;
pub mod producer;
mod record;
mod resolve;
mod sink;

pub use capture::{
    CaptureEnvelope, HEADER_FORWARDED_FOR, HEADER_REAL_IP, HEADER_REQUEST_ID, ceil_micros,
    is_body_capturable, redact_secrets, remote_ip,
};
pub use identity::{TokenInfo, token_info};
#[cfg(feature = "kafka")]
pub use kafka::KafkaTransport;
pub use producer::{
    Acks, DeliveryFailure, Message, ProducerConfig, ProducerError, QueueProducer, Transport,
    TransportError,
};
pub use record::{AccessRecord, CapturedBody};
pub use resolve::{RouteLabel, RouteResolver, RouteTable, split_handler_name};
pub use sink::{ACCESS_TARGET, DefaultSink, FileSink, QueueSink, Sink};
