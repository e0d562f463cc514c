//! Request → `controller` / `action` naming.
//!
//! Names come from, in order:
//!
//! 1. an explicit label stashed on the request
//!    ([`Request::set_route_label`](crate::Request::set_route_label)),
//! 2. the logical name the matched route was registered under,
//! 3. nothing (both halves empty).

use std::collections::HashMap;
use std::sync::OnceLock;

use tracing::debug;

use crate::method::Method;
use crate::request::{ACTION_KEY, CONTROLLER_KEY, Stash};
use crate::router::RouteSource;

/// Controller and action of one request. Either half may be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteLabel {
    pub controller: String,
    pub action: String,
}

/// `(method, path) → logical name`, built once and then only read.
#[derive(Debug, Default)]
pub struct RouteTable {
    names: HashMap<Method, HashMap<String, String>>,
}

impl RouteTable {
    pub fn build(source: &dyn RouteSource) -> Self {
        let mut names: HashMap<Method, HashMap<String, String>> = HashMap::new();
        for route in source.routes() {
            let path = if route.path.starts_with('/') {
                route.path.clone()
            } else {
                format!("/{}", route.path)
            };
            names.entry(route.method).or_default().insert(path, route.name.clone());
        }
        Self { names }
    }

    pub fn get(&self, method: Method, path: &str) -> Option<&str> {
        self.names.get(&method)?.get(path).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Resolves requests to [`RouteLabel`]s.
///
/// The [`RouteTable`] is built from the route source on the first call. Calls
/// racing on a cold resolver block until the single build finishes; every
/// later call reads the table without locking.
#[derive(Debug, Default)]
pub struct RouteResolver {
    table: OnceLock<RouteTable>,
}

impl RouteResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// `path` is the matched route pattern when there is one (e.g.
    /// `/users/{id}`), otherwise the raw request path.
    pub fn resolve(
        &self,
        method: Method,
        path: &str,
        stash: &Stash,
        source: &dyn RouteSource,
    ) -> RouteLabel {
        if let (Some(controller), Some(action)) = (stash.get(CONTROLLER_KEY), stash.get(ACTION_KEY)) {
            if !controller.is_empty() && !action.is_empty() {
                return RouteLabel { controller, action };
            }
        }

        let table = self.table.get_or_init(|| {
            let table = RouteTable::build(source);
            debug!(routes = table.len(), "built route table");
            table
        });

        table
            .get(method, path)
            .map(split_handler_name)
            .unwrap_or_default()
    }
}

/// Splits a logical handler name into controller and action.
///
/// Explicit names like `Users.list` split at the last `.`. The same rule
/// also accepts introspected names such as
/// `github.com/acme/api/handlers.(*UserHandler).List-fm` or the
/// `app/users.list` form derived from Rust paths:
///
/// - the controller loses one layer of parentheses, a leading `*`, and
///   everything up to its last `/` or `.`;
/// - the action loses a `-fm` method-value suffix and trailing `)`.
///
/// A name without any `.` has no controller.
///
/// Only the literal `-fm` suffix is removed, not any run of `-`, `f` and `m`
/// characters, so `Forms.submitForm` keeps its action as `submitForm`.
///
/// ```rust
/// use footprint::access::split_handler_name;
///
/// let label = split_handler_name("(*pkg.UserHandler).List-fm");
/// assert_eq!(label.controller, "UserHandler");
/// assert_eq!(label.action, "List");
/// ```
pub fn split_handler_name(name: &str) -> RouteLabel {
    let (controller, action) = match name.rfind('.') {
        Some(i) => (&name[..i], &name[i + 1..]),
        None => ("", name),
    };

    let controller = match controller.find('(') {
        Some(i) => &controller[i + 1..],
        None => controller,
    };
    let controller = match controller.find(')') {
        Some(i) => &controller[..i],
        None => controller,
    };
    let controller = controller.strip_prefix('*').unwrap_or(controller);
    let controller = match controller.rfind(['/', '.']) {
        Some(i) => &controller[i + 1..],
        None => controller,
    };

    let action = action.strip_suffix("-fm").unwrap_or(action);
    let action = action.trim_end_matches(')');

    RouteLabel { controller: controller.to_owned(), action: action.to_owned() }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::router::{RouteCatalog, RouteInfo};

    fn label(controller: &str, action: &str) -> RouteLabel {
        RouteLabel { controller: controller.into(), action: action.into() }
    }

    fn catalog() -> RouteCatalog {
        RouteCatalog::new(vec![
            RouteInfo { method: Method::Get, path: "/users/{id}".into(), name: "Users.show".into() },
            RouteInfo { method: Method::Post, path: "orders".into(), name: "Orders.create".into() },
        ])
    }

    #[test]
    fn splits_method_value_names() {
        assert_eq!(split_handler_name("(*pkg.UserHandler).List-fm"), label("UserHandler", "List"));
        assert_eq!(
            split_handler_name("github.com/acme/api/handlers.(*UserHandler).Create-fm"),
            label("UserHandler", "Create"),
        );
    }

    #[test]
    fn splits_rust_derived_and_explicit_names() {
        assert_eq!(split_handler_name("app/users.list"), label("users", "list"));
        assert_eq!(split_handler_name("Users.show"), label("Users", "show"));
    }

    #[test]
    fn no_separator_means_no_controller() {
        assert_eq!(split_handler_name("healthz"), label("", "healthz"));
        assert_eq!(split_handler_name("closure-fm"), label("", "closure"));
        assert_eq!(split_handler_name(""), label("", ""));
    }

    #[test]
    fn keeps_actions_ending_in_closure_letters() {
        assert_eq!(split_handler_name("Forms.submitForm"), label("Forms", "submitForm"));
    }

    #[test]
    fn looks_up_by_method_and_normalized_path() {
        let resolver = RouteResolver::new();
        let stash = Stash::default();
        let source = catalog();

        assert_eq!(resolver.resolve(Method::Get, "/users/{id}", &stash, &source), label("Users", "show"));
        assert_eq!(resolver.resolve(Method::Post, "/orders", &stash, &source), label("Orders", "create"));
        assert_eq!(resolver.resolve(Method::Delete, "/users/{id}", &stash, &source), RouteLabel::default());
    }

    #[test]
    fn stashed_label_wins() {
        let resolver = RouteResolver::new();
        let stash = Stash::default();
        stash.set(CONTROLLER_KEY, "Admin");
        stash.set(ACTION_KEY, "impersonate");

        assert_eq!(
            resolver.resolve(Method::Get, "/users/{id}", &stash, &catalog()),
            label("Admin", "impersonate"),
        );
    }

    #[test]
    fn half_a_stashed_label_falls_back_to_table() {
        let resolver = RouteResolver::new();
        let stash = Stash::default();
        stash.set(CONTROLLER_KEY, "Admin");

        assert_eq!(
            resolver.resolve(Method::Get, "/users/{id}", &stash, &catalog()),
            label("Users", "show"),
        );
    }

    struct CountingSource {
        inner: RouteCatalog,
        calls: AtomicUsize,
    }

    impl RouteSource for CountingSource {
        fn routes(&self) -> &[RouteInfo] {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.routes()
        }
    }

    #[test]
    fn table_is_built_once_under_concurrent_first_use() {
        let resolver = Arc::new(RouteResolver::new());
        let source = Arc::new(CountingSource { inner: catalog(), calls: AtomicUsize::new(0) });

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let resolver = Arc::clone(&resolver);
                let source = Arc::clone(&source);
                std::thread::spawn(move || {
                    resolver.resolve(Method::Get, "/users/{id}", &Stash::default(), source.as_ref())
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), label("Users", "show"));
        }
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }
}
