//! Access-log middleware.

use std::net::SocketAddr;
use std::sync::Arc;

use http::StatusCode;
use http::request::Parts;
use tracing::{error, warn};

use super::{Middleware, Next};
use crate::access::{CaptureEnvelope, RouteResolver, Sink};
use crate::handler::BoxFuture;
use crate::request::Request;
use crate::response::Response;

/// Writes one [`AccessRecord`](crate::access::AccessRecord) per request to a
/// [`Sink`].
///
/// Add it as the first layer so the latency it records covers every other
/// middleware. It never alters the response.
#[derive(Clone)]
pub struct AccessLogger {
    inner: Arc<Inner>,
}

struct Inner {
    sink: Sink,
    resolver: RouteResolver,
    hostname: String,
}

impl AccessLogger {
    pub fn new(sink: Sink) -> Self {
        let hostname = match hostname::get() {
            Ok(name) => name.to_string_lossy().into_owned(),
            Err(e) => {
                warn!(error = %e, "could not read hostname; access records will omit it");
                String::new()
            }
        };
        Self::with_hostname(sink, hostname)
    }

    /// Like [`new`](Self::new) with a fixed hostname instead of the
    /// machine's.
    pub fn with_hostname(sink: Sink, hostname: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(Inner { sink, resolver: RouteResolver::new(), hostname: hostname.into() }),
        }
    }

    pub fn sink(&self) -> &Sink {
        &self.inner.sink
    }
}

impl Middleware for AccessLogger {
    /// The chain and the record write run in their own task. If the caller
    /// drops the returned future (client gone), the handler still finishes
    /// and the record is still written.
    fn handle(&self, req: Request, next: Next) -> BoxFuture {
        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(async move {
            let envelope = CaptureEnvelope::begin(&req, &inner.hostname);
            let method = req.method();
            let stash = req.stash().clone();
            let routes = Arc::clone(req.routes());
            let route = req.route().unwrap_or(req.path()).to_owned();

            let res = next.run(req).await;

            let mut record = envelope.complete(&res);
            let label = inner.resolver.resolve(method, &route, &stash, &*routes);
            record.controller = label.controller;
            record.action = label.action;
            inner.sink.write(record).await;
            res
        });

        Box::pin(async move {
            match task.await {
                Ok(res) => res,
                Err(e) => {
                    error!(error = %e, "request task failed");
                    Response::status(StatusCode::INTERNAL_SERVER_ERROR)
                }
            }
        })
    }

    fn rejected(&self, head: &Parts, peer: Option<SocketAddr>, res: &Response) -> BoxFuture<()> {
        let record = CaptureEnvelope::rejected(head, peer, &self.inner.hostname).complete(res);
        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(async move { inner.sink.write(record).await });
        Box::pin(async move {
            if let Err(e) = task.await {
                error!(error = %e, "access record task failed");
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::access::FileSink;
    use crate::method::Method;
    use crate::router::Router;

    static COUNTER: AtomicU64 = AtomicU64::new(0);

    fn log_path() -> std::path::PathBuf {
        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        std::env::temp_dir()
            .join(format!("footprint-access-log-{}-{n}", std::process::id()))
            .join("access.log")
    }

    fn records(path: &std::path::Path) -> Vec<serde_json::Value> {
        std::fs::read_to_string(path)
            .unwrap_or_default()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    async fn slow(_req: Request) -> &'static str {
        tokio::time::sleep(Duration::from_millis(200)).await;
        "done"
    }

    #[tokio::test]
    async fn dropped_request_still_writes_its_record() {
        let path = log_path();
        let app = Router::new()
            .layer(AccessLogger::with_hostname(Sink::File(FileSink::open(&path)), "node-1"))
            .named(Method::Get, "/slow", "Reports.slow", slow);

        let cut_short =
            tokio::time::timeout(Duration::from_millis(20), app.call(Request::builder().uri("/slow").build())).await;
        assert!(cut_short.is_err());
        assert!(records(&path).is_empty());

        tokio::time::sleep(Duration::from_millis(400)).await;
        let written = records(&path);
        assert_eq!(written.len(), 1);
        assert_eq!(written[0]["status"], 200);
        assert_eq!(written[0]["action"], "slow");
        assert!(written[0]["latency"].as_f64().unwrap() >= 0.2);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[tokio::test]
    async fn rejected_requests_are_recorded() {
        let path = log_path();
        let app = Router::new()
            .layer(AccessLogger::with_hostname(Sink::File(FileSink::open(&path)), "node-1"));

        let (head, ()) = http::Request::builder()
            .method("PROPFIND")
            .uri("/files")
            .body(())
            .unwrap()
            .into_parts();
        let res = app.reject(&head, None, StatusCode::METHOD_NOT_ALLOWED).await;
        assert_eq!(res.status_code(), StatusCode::METHOD_NOT_ALLOWED);

        let written = records(&path);
        assert_eq!(written.len(), 1);
        assert_eq!(written[0]["method"], "PROPFIND");
        assert_eq!(written[0]["status"], 405);
        assert_eq!(written[0]["hostname"], "node-1");
        assert!(written[0].get("controller").is_none());

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
