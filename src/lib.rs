//! # footprint
//!
//! A small HTTP framework for services behind a reverse proxy, with a
//! request-observability pipeline built in.
//!
//! Every request that passes through [`AccessLogger`](middleware::AccessLogger)
//! leaves one structured [`AccessRecord`](access::AccessRecord): who called
//! (session and user hints from the bearer token), what they asked for
//! (method, URI, parameters, a redacted JSON body), how it went (status,
//! bytes, latency, error summary) and which `controller` / `action` served
//! it. Records go to one of three sinks:
//!
//! - the process `tracing` subscriber,
//! - a JSON-lines file,
//! - a message queue, through an asynchronous batching producer.
//!
//! What the proxy already owns (TLS, rate limiting, body-size limits) is left
//! to the proxy.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use footprint::access::Sink;
//! use footprint::config::Config;
//! use footprint::middleware::AccessLogger;
//! use footprint::{HttpError, Method, Request, Response, Router, Server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), footprint::Error> {
//!     let config = Config::default();
//!     let _ = footprint::logging::init(&config.logging);
//!
//!     let app = Router::new()
//!         .layer(AccessLogger::new(Sink::from_config(&config.access_log).await))
//!         .named(Method::Get,  "/users/{id}", "Users.show",   show_user)
//!         .named(Method::Post, "/users",      "Users.create", create_user);
//!
//!     Server::bind("0.0.0.0:3000").serve(app).await
//! }
//!
//! async fn show_user(req: Request) -> Response {
//!     let id = req.param("id").unwrap_or("unknown");
//!     Response::json(format!(r#"{{"id":"{id}"}}"#))
//! }
//!
//! async fn create_user(req: Request) -> Result<Response, HttpError> {
//!     if req.body().is_empty() {
//!         return Err(HttpError::bad_request("empty body"));
//!     }
//!     Ok(Response::builder()
//!         .status(http::StatusCode::CREATED)
//!         .header("location", "/users/99")
//!         .json(req.body().clone()))
//! }
//! ```

mod error;
mod handler;
mod method;
mod request;
mod response;
mod router;
mod server;

pub mod access;
pub mod config;
pub mod logging;
pub mod middleware;
pub mod wildcard;

pub use error::{Error, ErrorRenderer, HttpError};
pub use handler::{BoxFuture, Handler};
pub use method::{Method, UnknownMethod};
pub use request::{ACTION_KEY, CONTROLLER_KEY, Request, RequestBuilder, Stash};
pub use response::{IntoResponse, Response, ResponseBuilder};
pub use router::{RouteCatalog, RouteInfo, RouteSource, Router};
pub use server::Server;
