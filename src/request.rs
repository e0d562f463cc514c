//! Incoming HTTP request type.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Uri};

use crate::method::Method;
use crate::router::RouteCatalog;

/// Stash key for an explicitly assigned controller name.
pub const CONTROLLER_KEY: &str = "controller";
/// Stash key for an explicitly assigned action name.
pub const ACTION_KEY: &str = "action";

/// An incoming HTTP request with its body already buffered.
pub struct Request {
    pub(crate) method: Method,
    pub(crate) uri: Uri,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Bytes,
    pub(crate) params: HashMap<String, String>,
    pub(crate) remote_addr: Option<SocketAddr>,
    pub(crate) route: Option<Arc<str>>,
    pub(crate) stash: Stash,
    pub(crate) routes: Arc<RouteCatalog>,
}

impl Request {
    pub(crate) fn from_parts(
        parts: http::request::Parts,
        method: Method,
        body: Bytes,
        remote_addr: Option<SocketAddr>,
    ) -> Self {
        Self {
            method,
            uri: parts.uri,
            headers: parts.headers,
            body,
            params: HashMap::new(),
            remote_addr,
            route: None,
            stash: Stash::default(),
            routes: Arc::default(),
        }
    }

    /// Builds a request without a socket, for tests and in-process dispatch
    /// through [`Router::call`](crate::Router::call).
    pub fn builder() -> RequestBuilder {
        RequestBuilder {
            method: Method::Get,
            uri: Uri::from_static("/"),
            headers: HeaderMap::new(),
            body: Bytes::new(),
            remote_addr: None,
        }
    }

    pub fn method(&self) -> Method { self.method }
    pub fn uri(&self) -> &Uri { &self.uri }
    pub fn path(&self) -> &str { self.uri.path() }
    pub fn query(&self) -> Option<&str> { self.uri.query() }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &Bytes { &self.body }
    pub fn remote_addr(&self) -> Option<SocketAddr> { self.remote_addr }

    /// Case-insensitive header lookup. Non-UTF-8 values read as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/users/{id}`, `req.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub fn params(&self) -> &HashMap<String, String> { &self.params }

    /// The registered pattern this request matched (e.g. `/users/{id}`).
    pub fn route(&self) -> Option<&str> { self.route.as_deref() }

    /// Per-request scratch space shared by middleware and the handler.
    pub fn stash(&self) -> &Stash { &self.stash }

    /// Every route registered on the router that dispatched this request.
    pub fn routes(&self) -> &Arc<RouteCatalog> { &self.routes }

    /// Names this request for the access log, overriding whatever the route
    /// table says. Both halves must be set for the override to apply.
    pub fn set_route_label(&self, controller: &str, action: &str) {
        self.stash.set(CONTROLLER_KEY, controller);
        self.stash.set(ACTION_KEY, action);
    }
}

/// String key/value storage attached to one request.
///
/// Clones share the same storage, so a middleware can keep a clone across
/// `next.run(req)` and read what the handler wrote.
#[derive(Clone, Debug, Default)]
pub struct Stash(Arc<Mutex<HashMap<String, String>>>);

impl Stash {
    pub fn set(&self, key: &str, value: &str) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_owned(), value.to_owned());
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }
}

/// Fluent builder for [`Request`]. Obtain via [`Request::builder()`].
pub struct RequestBuilder {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
    remote_addr: Option<SocketAddr>,
}

impl RequestBuilder {
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Sets the request target. An unparsable target leaves the previous one.
    pub fn uri(mut self, uri: &str) -> Self {
        if let Ok(uri) = uri.parse() {
            self.uri = uri;
        }
        self
    }

    /// Appends a header. Invalid names or values are skipped.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) =
            (HeaderName::try_from(name), HeaderValue::try_from(value))
        {
            self.headers.append(name, value);
        }
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    pub fn build(self) -> Request {
        Request {
            method: self.method,
            uri: self.uri,
            headers: self.headers,
            body: self.body,
            params: HashMap::new(),
            remote_addr: self.remote_addr,
            route: None,
            stash: Stash::default(),
            routes: Arc::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_lookup_ignores_case() {
        let req = Request::builder()
            .header("Content-Type", "application/json")
            .build();
        assert_eq!(req.header("content-type"), Some("application/json"));
        assert_eq!(req.header("CONTENT-TYPE"), Some("application/json"));
    }

    #[test]
    fn stash_clones_share_storage() {
        let req = Request::builder().build();
        let held = req.stash().clone();
        req.set_route_label("Orders", "create");
        assert_eq!(held.get(CONTROLLER_KEY).as_deref(), Some("Orders"));
        assert_eq!(held.get(ACTION_KEY).as_deref(), Some("create"));
    }

    #[test]
    fn builder_keeps_previous_uri_on_garbage() {
        let req = Request::builder().uri("/ok?x=1").uri("not a uri").build();
        assert_eq!(req.path(), "/ok");
        assert_eq!(req.query(), Some("x=1"));
    }
}
