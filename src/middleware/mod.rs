//! Middleware layer.
//!
//! Middleware intercepts requests and responses and is the right place for
//! cross-cutting concerns. A middleware receives the request and a [`Next`]
//! continuation; it may answer on its own or call `next.run(req)` and inspect
//! the response on the way out.
//!
//! Built-in middleware:
//! - [`AccessLogger`]: one structured access record per request
//! - [`Authenticate`]: bearer-token gate with glob skip rules
//!
//! ```rust,no_run
//! use footprint::middleware::{AccessLogger, Middleware, Next};
//! use footprint::{BoxFuture, Request, Router};
//! use footprint::access::Sink;
//!
//! struct Banner;
//!
//! impl Middleware for Banner {
//!     fn handle(&self, req: Request, next: Next) -> BoxFuture {
//!         Box::pin(async move {
//!             let mut res = next.run(req).await;
//!             res.headers_mut().push(("x-powered-by".into(), "footprint".into()));
//!             res
//!         })
//!     }
//! }
//!
//! let app = Router::new()
//!     .layer(AccessLogger::new(Sink::default()))
//!     .layer(Banner);
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use http::request::Parts;

use crate::handler::{BoxFuture, BoxedHandler};
use crate::request::Request;
use crate::response::Response;

mod access_log;
mod auth;

pub use access_log::AccessLogger;
pub use auth::{Authenticate, SkipList, SkipRule, TokenVerifier};

/// A request interceptor. See the [module docs](self).
pub trait Middleware: Send + Sync + 'static {
    fn handle(&self, req: Request, next: Next) -> BoxFuture;

    /// Sees a request the server answered before routing (unknown method,
    /// unreadable body). `res` is what the client gets. Ignored by default.
    fn rejected(&self, _head: &Parts, _peer: Option<SocketAddr>, _res: &Response) -> BoxFuture<()> {
        Box::pin(async {})
    }
}

/// The rest of the chain: remaining middleware, then the route handler.
pub struct Next {
    chain: Arc<Vec<Arc<dyn Middleware>>>,
    index: usize,
    endpoint: BoxedHandler,
}

impl Next {
    pub(crate) fn new(chain: Arc<Vec<Arc<dyn Middleware>>>, endpoint: BoxedHandler) -> Self {
        Self { chain, index: 0, endpoint }
    }

    /// Passes `req` to the next layer.
    pub fn run(self, req: Request) -> BoxFuture {
        match self.chain.get(self.index) {
            Some(layer) => {
                let layer = Arc::clone(layer);
                let next = Self { index: self.index + 1, ..self };
                layer.handle(req, next)
            }
            None => self.endpoint.call(req),
        }
    }
}
