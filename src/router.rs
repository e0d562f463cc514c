//! Radix-tree request router.
//!
//! One tree per HTTP method. O(path-length) lookup. Every registration is
//! also recorded in a [`RouteCatalog`] (method, pattern, logical name),
//! which the access log uses to name requests.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use http::StatusCode;
use http::request::Parts;
use matchit::Router as MatchitRouter;

use crate::handler::{BoxFuture, BoxedHandler, Handler};
use crate::method::Method;
use crate::middleware::{Middleware, Next};
use crate::request::Request;
use crate::response::Response;

/// One registered route.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteInfo {
    pub method: Method,
    pub path: String,
    /// Logical handler name, e.g. `UserController.list`.
    pub name: String,
}

/// Everything registered on a router, in registration order.
#[derive(Clone, Debug, Default)]
pub struct RouteCatalog(Vec<RouteInfo>);

impl RouteCatalog {
    pub fn new(routes: Vec<RouteInfo>) -> Self {
        Self(routes)
    }
}

/// Anything that can enumerate registered routes.
pub trait RouteSource {
    fn routes(&self) -> &[RouteInfo];
}

impl RouteSource for RouteCatalog {
    fn routes(&self) -> &[RouteInfo] { &self.0 }
}

#[derive(Clone)]
struct Endpoint {
    handler: BoxedHandler,
    pattern: Arc<str>,
}

/// The application router.
///
/// Build it once at startup; pass it to [`Server::serve`](crate::Server::serve).
/// Each builder call returns `self` so registrations chain naturally.
pub struct Router {
    routes: HashMap<Method, MatchitRouter<Endpoint>>,
    catalog: Arc<RouteCatalog>,
    middleware: Arc<Vec<Arc<dyn Middleware>>>,
    fallback: BoxedHandler,
}

impl Router {
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
            catalog: Arc::default(),
            middleware: Arc::default(),
            fallback: not_found.into_boxed_handler(),
        }
    }

    /// Register a handler for a method + path pair.
    ///
    /// The route's logical name is derived from the handler's Rust path
    /// (`app::users::list` → controller `users`, action `list`). Use
    /// [`Router::named`] to choose the name yourself.
    ///
    /// ```rust,no_run
    /// # use footprint::{Method, Request, Response, Router};
    /// # async fn get_user(_: Request) -> Response { Response::text("") }
    /// # async fn create_user(_: Request) -> Response { Response::text("") }
    /// Router::new()
    ///     .on(Method::Get,  "/users/{id}", get_user)
    ///     .on(Method::Post, "/users",      create_user);
    /// ```
    pub fn on(self, method: Method, path: &str, handler: impl Handler) -> Self {
        let name = handler.logical_name();
        self.add(method, path, name, handler)
    }

    /// Register a handler under an explicit `Controller.action` name.
    pub fn named(self, method: Method, path: &str, name: &str, handler: impl Handler) -> Self {
        self.add(method, path, name.to_owned(), handler)
    }

    /// Wrap every route (and the 404 fallback) in `middleware`.
    ///
    /// The first layer added is the outermost: it sees the request first and
    /// the response last.
    pub fn layer(mut self, middleware: impl Middleware) -> Self {
        Arc::make_mut(&mut self.middleware).push(Arc::new(middleware));
        self
    }

    fn add(mut self, method: Method, path: &str, name: String, handler: impl Handler) -> Self {
        let endpoint = Endpoint { handler: handler.into_boxed_handler(), pattern: path.into() };
        self.routes
            .entry(method)
            .or_default()
            .insert(path, endpoint)
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
        Arc::make_mut(&mut self.catalog).0.push(RouteInfo {
            method,
            path: path.to_owned(),
            name,
        });
        self
    }

    /// Dispatches one request through the middleware chain and the matching
    /// handler. Unmatched requests get `404 Not Found`.
    pub fn call(&self, mut req: Request) -> BoxFuture {
        req.routes = Arc::clone(&self.catalog);
        let handler = match self.lookup(req.method, req.path()) {
            Some((endpoint, params)) => {
                req.params = params;
                req.route = Some(endpoint.pattern);
                endpoint.handler
            }
            None => Arc::clone(&self.fallback),
        };
        Next::new(Arc::clone(&self.middleware), handler).run(req)
    }

    /// Answers a request that never became a [`Request`] (its method is
    /// unknown or its body could not be read) with `status`, and shows it to
    /// every layer through [`Middleware::rejected`].
    pub async fn reject(&self, head: &Parts, peer: Option<SocketAddr>, status: StatusCode) -> Response {
        let res = Response::status(status);
        for layer in self.middleware.iter() {
            layer.rejected(head, peer, &res).await;
        }
        res
    }

    fn lookup(&self, method: Method, path: &str) -> Option<(Endpoint, HashMap<String, String>)> {
        let tree = self.routes.get(&method)?;
        let matched = tree.at(path).ok()?;
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some((matched.value.clone(), params))
    }
}

impl RouteSource for Router {
    fn routes(&self) -> &[RouteInfo] { self.catalog.routes() }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}

async fn not_found(_req: Request) -> StatusCode {
    StatusCode::NOT_FOUND
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Response;

    async fn show(req: Request) -> Response {
        Response::text(req.param("id").unwrap_or("none").to_owned())
    }

    #[tokio::test]
    async fn routes_by_method_and_extracts_params() {
        let app = Router::new().named(Method::Get, "/users/{id}", "Users.show", show);

        let res = app.call(Request::builder().uri("/users/42").build()).await;
        assert_eq!(res.status_code(), StatusCode::OK);
        assert_eq!(res.body().as_ref(), b"42");

        let res = app
            .call(Request::builder().method(Method::Post).uri("/users/42").build())
            .await;
        assert_eq!(res.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn catalog_records_registration_order_and_names() {
        let app = Router::new()
            .named(Method::Get, "/users/{id}", "Users.show", show)
            .on(Method::Delete, "/users/{id}", show);

        let routes = app.routes();
        assert_eq!(routes.len(), 2);
        assert_eq!(routes[0].name, "Users.show");
        assert_eq!(routes[1].method, Method::Delete);
        assert!(routes[1].name.ends_with("/tests.show"));
    }
}
