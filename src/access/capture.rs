//! Building an [`AccessRecord`] around one request.
//!
//! [`CaptureEnvelope::begin`] runs before the handler and records everything
//! the request itself says; [`CaptureEnvelope::complete`] runs once after the
//! handler and adds the outcome.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::net::SocketAddr;
use std::sync::LazyLock;
use std::time::{Duration, Instant};

use chrono::Utc;
use http::request::Parts;
use http::{HeaderMap, Uri};
use regex::Regex;
use serde_json::value::RawValue;
use uuid::Uuid;

use super::identity::token_info;
use super::record::{AccessRecord, CapturedBody};
use crate::method::Method;
use crate::request::Request;
use crate::response::Response;

pub const HEADER_REQUEST_ID: &str = "x-request-id";
pub const HEADER_FORWARDED_FOR: &str = "x-forwarded-for";
pub const HEADER_REAL_IP: &str = "x-real-ip";

const JSON_MEDIA_TYPE: &str = "application/json";

static SECRET_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""(password|passwd)"\s*:\s*"(?:[^"\\]|\\.)*""#)
        .expect("secret field pattern is valid")
});

/// A partially built record plus the instant the request entered the
/// pipeline.
#[derive(Debug)]
pub struct CaptureEnvelope {
    record: AccessRecord,
    started: Instant,
}

/// The parts of a request the record is built from.
struct Head<'a> {
    method: &'a str,
    capturable: bool,
    uri: &'a Uri,
    headers: &'a HeaderMap,
    body: &'a [u8],
    params: Option<&'a HashMap<String, String>>,
    peer: Option<SocketAddr>,
}

impl Head<'_> {
    fn header(&self, name: &str) -> Option<&str> {
        header(self.headers, name)
    }
}

impl CaptureEnvelope {
    /// Captures identity, request descriptors, query/path parameters and,
    /// when eligible, a redacted body snapshot. Starts the latency clock.
    pub fn begin(req: &Request, hostname: &str) -> Self {
        Self::capture(
            Head {
                method: req.method().as_str(),
                capturable: req.method().is_body_capturable(),
                uri: req.uri(),
                headers: req.headers(),
                body: req.body(),
                params: Some(req.params()),
                peer: req.remote_addr(),
            },
            hostname,
        )
    }

    /// Like [`begin`](Self::begin), for a request the server answered before
    /// routing. There is no body and there are no path parameters.
    pub fn rejected(head: &Parts, peer: Option<SocketAddr>, hostname: &str) -> Self {
        Self::capture(
            Head {
                method: head.method.as_str(),
                capturable: false,
                uri: &head.uri,
                headers: &head.headers,
                body: &[],
                params: None,
                peer,
            },
            hostname,
        )
    }

    fn capture(head: Head<'_>, hostname: &str) -> Self {
        let started = Instant::now();

        let request_id = match head.header(HEADER_REQUEST_ID) {
            Some(id) if !id.is_empty() => id.to_owned(),
            _ => Uuid::new_v4().simple().to_string(),
        };
        let token = token_info(head.header(http::header::AUTHORIZATION.as_str()).unwrap_or_default());

        let path = match head.uri.path() {
            "" => "/".to_owned(),
            p => p.to_owned(),
        };
        let uri = head
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_owned())
            .unwrap_or_else(|| path.clone());
        let host = head
            .header(http::header::HOST.as_str())
            .map(str::to_owned)
            .or_else(|| head.uri.authority().map(|a| a.to_string()))
            .unwrap_or_default();

        let mut params = BTreeMap::new();
        if let Some(query) = head.uri.query() {
            for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
                params.entry(key.into_owned()).or_insert_with(|| value.into_owned());
            }
        }
        for (key, value) in head.params.into_iter().flatten() {
            params.insert(key.clone(), value.clone());
        }

        let content_type = head.header(http::header::CONTENT_TYPE.as_str());
        let body = (head.capturable && is_json(content_type)).then(|| capture_body(head.body));

        let record = AccessRecord {
            request_id,
            session_id: token.session_id,
            user_id: token.user_id,
            timestamp: Utc::now(),
            remote_ip: client_ip(head.headers, head.peer),
            host,
            uri,
            method: head.method.to_owned(),
            path,
            referer: head.header(http::header::REFERER.as_str()).unwrap_or_default().to_owned(),
            user_agent: head.header(http::header::USER_AGENT.as_str()).unwrap_or_default().to_owned(),
            request_length: head
                .header(http::header::CONTENT_LENGTH.as_str())
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or_default(),
            hostname: hostname.to_owned(),
            body,
            params,
            ..AccessRecord::default()
        };

        Self { record, started }
    }

    /// Records status, bytes sent, latency and error summary. Consumes the
    /// envelope: a record is completed exactly once.
    pub fn complete(self, res: &Response) -> AccessRecord {
        let elapsed = self.started.elapsed();
        self.finish(res, elapsed)
    }

    fn finish(mut self, res: &Response, elapsed: Duration) -> AccessRecord {
        self.record.status = res.status_code().as_u16();
        self.record.bytes_sent = res.bytes_sent();
        self.record.latency = ceil_micros(elapsed);
        self.record.error = res.error().map(str::to_owned);
        self.record
    }
}

/// Body snapshots are taken for mutating methods carrying JSON.
pub fn is_body_capturable(method: Method, content_type: Option<&str>) -> bool {
    method.is_body_capturable() && is_json(content_type)
}

fn is_json(content_type: Option<&str>) -> bool {
    content_type.is_some_and(|ct| {
        ct.len() >= JSON_MEDIA_TYPE.len()
            && ct.as_bytes()[..JSON_MEDIA_TYPE.len()].eq_ignore_ascii_case(JSON_MEDIA_TYPE.as_bytes())
    })
}

/// Masks the value of every `"password"` / `"passwd"` string field.
///
/// ```rust
/// use footprint::access::redact_secrets;
///
/// assert_eq!(
///     redact_secrets(r#"{"password":"abc123","name":"x"}"#),
///     r#"{"password": "*","name":"x"}"#,
/// );
/// ```
pub fn redact_secrets(body: &str) -> Cow<'_, str> {
    SECRET_FIELD.replace_all(body, r#""${1}": "*""#)
}

fn capture_body(raw: &[u8]) -> CapturedBody {
    let text = String::from_utf8_lossy(raw);
    let redacted = redact_secrets(&text).into_owned();
    match RawValue::from_string(redacted.trim().to_owned()) {
        Ok(json) => CapturedBody::Json(json),
        Err(_) => CapturedBody::Text(redacted),
    }
}

/// First `X-Forwarded-For` hop, then `X-Real-IP`, then the peer address.
pub fn remote_ip(req: &Request) -> String {
    client_ip(req.headers(), req.remote_addr())
}

fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    if let Some(forwarded) = header(headers, HEADER_FORWARDED_FOR).filter(|v| !v.is_empty()) {
        return forwarded.split(',').next().unwrap_or_default().trim().to_owned();
    }
    if let Some(real_ip) = header(headers, HEADER_REAL_IP).filter(|v| !v.is_empty()) {
        return real_ip.to_owned();
    }
    peer.map(|addr| addr.ip().to_string()).unwrap_or_default()
}

/// Seconds with six decimals, rounded up so latency is never under-reported.
pub fn ceil_micros(elapsed: Duration) -> f64 {
    let micros = elapsed.as_nanos().div_ceil(1_000);
    micros as f64 / 1_000_000.0
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
