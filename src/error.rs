//! Error types.
//!
//! Two layers, split by who gets to see them:
//!
//! - [`Error`]: infrastructure failures (binding, accepting). Returned from
//!   [`Server::serve`](crate::Server::serve).
//! - [`HttpError`]: what a handler returns when a request fails. It renders
//!   as an HTTP response and tells the access log what went wrong.

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use http::StatusCode;

/// Infrastructure error returned by the server.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid socket address `{0}`")]
    Addr(String),
}

type Cause = Box<dyn StdError + Send + Sync + 'static>;

/// A failed request.
///
/// Carries the status to answer with, a public message, optional details and
/// an optional internal cause. The cause never reaches the client; the access
/// log records it as the request's error summary.
///
/// Any `std::error::Error` converts into a `500` `HttpError` with itself as
/// the cause, so `?` works inside handlers returning `Result<_, HttpError>`:
///
/// ```rust
/// use footprint::{HttpError, Request, Response};
///
/// async fn read_config(_req: Request) -> Result<Response, HttpError> {
///     let raw = std::fs::read_to_string("/etc/app.toml")?;
///     Ok(Response::text(raw))
/// }
/// ```
pub struct HttpError {
    status: StatusCode,
    message: String,
    details: Option<String>,
    internal: Option<Cause>,
}

impl HttpError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status, message: message.into(), details: None, internal: None }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// Attaches the underlying cause.
    pub fn with_internal(mut self, cause: impl Into<Cause>) -> Self {
        self.internal = Some(cause.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn status(&self) -> StatusCode { self.status }
    pub fn message(&self) -> &str { &self.message }
    pub fn details(&self) -> Option<&str> { self.details.as_deref() }

    pub fn internal(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.internal.as_deref()
    }

    /// One-line description for logs: the internal cause when there is one,
    /// otherwise this error's own rendering.
    pub fn summary(&self) -> String {
        match &self.internal {
            Some(cause) => cause.to_string(),
            None => self.to_string(),
        }
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.status.as_u16(), self.message)?;
        match &self.details {
            Some(details) if *details != self.message => write!(f, " ({details})"),
            _ => Ok(()),
        }
    }
}

impl fmt::Debug for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpError")
            .field("status", &self.status)
            .field("message", &self.message)
            .field("details", &self.details)
            .field("internal", &self.internal.as_ref().map(|c| c.to_string()))
            .finish()
    }
}

impl<E> From<E> for HttpError
where
    E: StdError + Send + Sync + 'static,
{
    fn from(e: E) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").with_internal(e)
    }
}

/// Builds [`HttpError`]s stamped with a service prefix.
///
/// The prefix is fixed when the renderer is created at startup; share the
/// renderer (it is cheap to clone) instead of mutating any global state.
///
/// ```rust
/// use footprint::ErrorRenderer;
/// use http::StatusCode;
///
/// let render = ErrorRenderer::new("orders");
/// let err = render.error(StatusCode::CONFLICT, "Resource already exist");
/// assert_eq!(err.details(), Some("orders: Resource already exist"));
/// ```
#[derive(Clone, Debug, Default)]
pub struct ErrorRenderer {
    prefix: Option<Arc<str>>,
}

impl ErrorRenderer {
    pub fn new(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        Self { prefix: (!prefix.is_empty()).then(|| prefix.into()) }
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// An error with no underlying cause. Details repeat the message.
    pub fn error(&self, status: StatusCode, message: &str) -> HttpError {
        HttpError::new(status, message).with_details(self.stamp(message))
    }

    /// An error caused by `cause`. Details carry the cause's message, so a
    /// chain of services reads `serviceB: serviceA: invalid sql`.
    pub fn wrap(
        &self,
        status: StatusCode,
        message: &str,
        cause: impl Into<Cause>,
    ) -> HttpError {
        let cause = cause.into();
        let details = self.stamp(&cause.to_string());
        HttpError::new(status, message).with_details(details).with_internal(cause)
    }

    fn stamp(&self, text: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}: {text}"),
            None => text.to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_prefers_internal_cause() {
        let err = HttpError::unauthorized("missing token")
            .with_internal(std::io::Error::other("header absent"));
        assert_eq!(err.summary(), "header absent");
    }

    #[test]
    fn summary_falls_back_to_own_rendering() {
        let err = HttpError::not_found("Resource not found");
        assert_eq!(err.summary(), "[404] Resource not found");
    }

    #[test]
    fn std_errors_convert_to_internal_server_error() {
        let err: HttpError = std::io::Error::other("invalid sql").into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.summary(), "invalid sql");
    }

    #[test]
    fn renderer_stamps_prefix_on_wrapped_cause() {
        let render = ErrorRenderer::new("serviceB");
        let err = render.wrap(
            StatusCode::BAD_GATEWAY,
            "Remote service error",
            "serviceA: invalid sql",
        );
        assert_eq!(err.details(), Some("serviceB: serviceA: invalid sql"));
        assert_eq!(err.message(), "Remote service error");
        assert_eq!(err.summary(), "serviceA: invalid sql");
    }

    #[test]
    fn renderer_without_prefix_leaves_details_alone() {
        let render = ErrorRenderer::new("");
        assert_eq!(render.prefix(), None);
        let err = render.error(StatusCode::BAD_REQUEST, "Parameter error");
        assert_eq!(err.details(), Some("Parameter error"));
        assert_eq!(err.to_string(), "[400] Parameter error");
    }
}
