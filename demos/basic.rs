//! Minimal footprint service: JSON endpoints, a token gate and access logs.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/health
//!   curl -H 'authorization: Bearer demo' http://localhost:3000/users/42
//!   curl -X POST http://localhost:3000/users \
//!        -H 'authorization: Bearer demo' \
//!        -H 'content-type: application/json' \
//!        -d '{"name":"alice","password":"hunter2"}'
//!
//! Set `ACCESS_LOG=/tmp/access.log` to get JSON lines in a file instead of
//! tracing events.

use std::error::Error as StdError;

use footprint::access::Sink;
use footprint::config::{AuthConfig, Config, SinkConfig};
use footprint::middleware::{AccessLogger, Authenticate, TokenVerifier};
use footprint::{HttpError, Method, Request, Response, Router, Server};
use http::StatusCode;

struct DemoVerifier;

#[async_trait::async_trait]
impl TokenVerifier for DemoVerifier {
    async fn verify(&self, token: &str) -> Result<(), Box<dyn StdError + Send + Sync>> {
        if token == "demo" { Ok(()) } else { Err(format!("unknown token `{token}`").into()) }
    }
}

#[tokio::main]
async fn main() -> Result<(), footprint::Error> {
    let config = Config {
        access_log: match std::env::var("ACCESS_LOG") {
            Ok(path) => SinkConfig::File { path: path.into() },
            Err(_) => SinkConfig::Default,
        },
        auth: AuthConfig { skip: vec!["GET /health".into()] },
        ..Config::default()
    };
    let _ = footprint::logging::init(&config.logging);

    let app = Router::new()
        .layer(AccessLogger::new(Sink::from_config(&config.access_log).await))
        .layer(Authenticate::new(DemoVerifier, config.auth.skip_list()))
        .named(Method::Get,    "/health",     "Health.check", health)
        .named(Method::Get,    "/users/{id}", "Users.show",   get_user)
        .named(Method::Post,   "/users",      "Users.create", create_user)
        .named(Method::Delete, "/users/{id}", "Users.delete", delete_user);

    Server::bind("0.0.0.0:3000").serve(app).await
}

async fn health(_req: Request) -> &'static str {
    "ok"
}

async fn get_user(req: Request) -> Response {
    let id = req.param("id").unwrap_or("unknown");
    Response::json(format!(r#"{{"id":"{id}","name":"alice"}}"#))
}

async fn create_user(req: Request) -> Result<Response, HttpError> {
    let input: serde_json::Value = serde_json::from_slice(req.body())
        .map_err(|e| HttpError::bad_request("Parameter error").with_internal(e))?;
    let name = input["name"].as_str().unwrap_or("new_user");

    Ok(Response::builder()
        .status(StatusCode::CREATED)
        .header("location", "/users/99")
        .json(format!(r#"{{"id":"99","name":"{name}"}}"#)))
}

async fn delete_user(_req: Request) -> StatusCode {
    StatusCode::NO_CONTENT
}
