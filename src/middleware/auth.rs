//! Bearer-token gate.

use std::error::Error as StdError;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::{Middleware, Next};
use crate::error::HttpError;
use crate::handler::BoxFuture;
use crate::method::Method;
use crate::request::Request;
use crate::response::IntoResponse;
use crate::wildcard;

/// Checks a bearer token. Signature validation, expiry and claims policy are
/// entirely up to the application.
#[async_trait]
pub trait TokenVerifier: Send + Sync + 'static {
    async fn verify(&self, token: &str) -> Result<(), Box<dyn StdError + Send + Sync>>;
}

/// One `METHOD pattern` exemption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkipRule {
    pub method: Method,
    pub pattern: String,
}

impl SkipRule {
    pub fn matches(&self, method: Method, path: &str) -> bool {
        self.method == method && wildcard::matches(&self.pattern, path)
    }
}

/// Requests that bypass token verification.
#[derive(Debug, Clone, Default)]
pub struct SkipList {
    rules: Vec<SkipRule>,
}

impl SkipList {
    /// Parses `"METHOD pattern"` entries, e.g. `"GET /public/*"`.
    ///
    /// Entries that are not exactly two space-separated tokens, or whose
    /// method is unknown, are dropped.
    pub fn parse<S: AsRef<str>>(entries: &[S]) -> Self {
        let rules = entries
            .iter()
            .filter_map(|entry| {
                let entry = entry.as_ref();
                let mut tokens = entry.split(' ');
                let (Some(method), Some(pattern), None) = (tokens.next(), tokens.next(), tokens.next())
                else {
                    debug!(entry, "ignoring malformed skip rule");
                    return None;
                };
                match method.parse() {
                    Ok(method) => Some(SkipRule { method, pattern: pattern.to_owned() }),
                    Err(_) => {
                        debug!(entry, "ignoring skip rule with unknown method");
                        None
                    }
                }
            })
            .collect();
        Self { rules }
    }

    pub fn is_skipped(&self, method: Method, path: &str) -> bool {
        self.rules.iter().any(|rule| rule.matches(method, path))
    }

    pub fn rules(&self) -> &[SkipRule] { &self.rules }
    pub fn len(&self) -> usize { self.rules.len() }
    pub fn is_empty(&self) -> bool { self.rules.is_empty() }
}

/// Rejects requests without a valid bearer token with `401 Unauthorized`,
/// unless a [`SkipRule`] exempts them.
///
/// ```rust,no_run
/// use footprint::middleware::{Authenticate, SkipList, TokenVerifier};
/// use footprint::Router;
///
/// struct AcceptAll;
///
/// #[async_trait::async_trait]
/// impl TokenVerifier for AcceptAll {
///     async fn verify(&self, _token: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
///         Ok(())
///     }
/// }
///
/// let app = Router::new()
///     .layer(Authenticate::new(AcceptAll, SkipList::parse(&["GET /health"])));
/// ```
pub struct Authenticate {
    verifier: Arc<dyn TokenVerifier>,
    skip: Arc<SkipList>,
}

impl Authenticate {
    pub fn new(verifier: impl TokenVerifier, skip: SkipList) -> Self {
        Self { verifier: Arc::new(verifier), skip: Arc::new(skip) }
    }
}

impl Middleware for Authenticate {
    fn handle(&self, req: Request, next: Next) -> BoxFuture {
        if self.skip.is_skipped(req.method(), req.path()) {
            return next.run(req);
        }

        let verifier = Arc::clone(&self.verifier);
        Box::pin(async move {
            let Some(token) = bearer_token(&req) else {
                return HttpError::unauthorized("missing token").into_response();
            };
            if let Err(cause) = verifier.verify(token).await {
                return HttpError::unauthorized("invalid token")
                    .with_internal(cause)
                    .into_response();
            }
            next.run(req).await
        })
    }
}

fn bearer_token(req: &Request) -> Option<&str> {
    let value = req.header(http::header::AUTHORIZATION.as_str())?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use http::StatusCode;

    use super::*;
    use crate::response::Response;
    use crate::router::Router;

    struct FixedToken(&'static str);

    #[async_trait]
    impl TokenVerifier for FixedToken {
        async fn verify(&self, token: &str) -> Result<(), Box<dyn StdError + Send + Sync>> {
            if token == self.0 { Ok(()) } else { Err("signature mismatch".into()) }
        }
    }

    async fn ok(_req: Request) -> Response {
        Response::text("ok")
    }

    fn app() -> Router {
        Router::new()
            .layer(Authenticate::new(
                FixedToken("good"),
                SkipList::parse(&["GET /public/*", "POST /login"]),
            ))
            .named(Method::Get, "/public/{page}", "Public.show", ok)
            .named(Method::Post, "/login", "Auth.login", ok)
            .named(Method::Get, "/me", "Users.me", ok)
    }

    #[test]
    fn parse_drops_malformed_entries() {
        let skip = SkipList::parse(&["GET /a", "GET", "GET /a extra", "FETCH /b", "get /c", "POST /d*"]);
        assert_eq!(
            skip.rules(),
            &[
                SkipRule { method: Method::Get, pattern: "/a".into() },
                SkipRule { method: Method::Post, pattern: "/d*".into() },
            ]
        );
    }

    #[test]
    fn skip_requires_method_and_pattern() {
        let skip = SkipList::parse(&["GET /public/*"]);
        assert!(skip.is_skipped(Method::Get, "/public/docs/intro"));
        assert!(!skip.is_skipped(Method::Post, "/public/docs"));
        assert!(!skip.is_skipped(Method::Get, "/private"));
    }

    #[tokio::test]
    async fn skipped_routes_need_no_token() {
        let res = app().call(Request::builder().uri("/public/faq").build()).await;
        assert_eq!(res.status_code(), StatusCode::OK);

        let res = app().call(Request::builder().method(Method::Post).uri("/login").build()).await;
        assert_eq!(res.status_code(), StatusCode::OK);
    }

    #[tokio::test]
    async fn missing_token_is_unauthorized() {
        let res = app().call(Request::builder().uri("/me").build()).await;
        assert_eq!(res.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(res.body().as_ref(), b"missing token");

        let res = app()
            .call(Request::builder().uri("/me").header("authorization", "Bearer ").build())
            .await;
        assert_eq!(res.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn rejected_token_carries_verifier_cause() {
        let res = app()
            .call(Request::builder().uri("/me").header("authorization", "Bearer bad").build())
            .await;
        assert_eq!(res.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(res.error(), Some("signature mismatch"));
    }

    #[tokio::test]
    async fn valid_token_reaches_handler() {
        let res = app()
            .call(Request::builder().uri("/me").header("authorization", "bearer good").build())
            .await;
        assert_eq!(res.status_code(), StatusCode::OK);
        assert_eq!(res.body().as_ref(), b"ok");
    }
}
