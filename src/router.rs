//! Radix-tree request router.
//!
//! Every registered route becomes an [`Endpoint`]: a unique name, a method, a
//! path and a [`Route`]. Lookup is one `matchit` tree per method that maps a
//! path to the endpoint's index, so registrars can re-decorate endpoints in
//! place without touching the trees.

use std::collections::HashMap;

use http::{Method, StatusCode};
use matchit::Router as MatchitRouter;
use tracing::{debug, error};

use crate::error::Abort;
use crate::handler::{Handler, Route};
use crate::request::Request;
use crate::response::Response;

/// A registered route, addressable by name.
///
/// Endpoint names are the route's name, prefixed with `"<blueprint>."` for
/// routes mounted from a [`Blueprint`].
#[derive(Debug, Clone)]
pub struct Endpoint {
    name: String,
    method: Method,
    path: String,
    route: Route,
}

impl Endpoint {
    pub fn name(&self) -> &str { &self.name }
    pub fn method(&self) -> &Method { &self.method }
    pub fn path(&self) -> &str { &self.path }
    pub fn route(&self) -> &Route { &self.route }

    pub fn set_route(&mut self, route: Route) {
        self.route = route;
    }
}

/// The application router.
///
/// Build it once at startup, optionally run registrars over it, then pass it
/// to [`Server::serve`](crate::Server::serve). Each [`Router::on`] call
/// returns `self` so registrations chain naturally.
pub struct Router {
    endpoints: Vec<Endpoint>,
    trees: HashMap<Method, MatchitRouter<usize>>,
}

impl Router {
    pub fn new() -> Self {
        Self { endpoints: Vec::new(), trees: HashMap::new() }
    }

    /// Register a handler for a method + path pair. Returns `self` for chaining.
    ///
    /// Path parameters use `{name}` syntax and are read with `req.param("name")`:
    ///
    /// ```rust
    /// # use routeguard::{Method, Request, Response, Router};
    /// # async fn get_user(_: Request) -> Response { Response::text("") }
    /// # async fn create_user(_: Request) -> Response { Response::text("") }
    /// Router::new()
    ///     .on(Method::GET,  "/users/{id}", get_user)
    ///     .on(Method::POST, "/users",      create_user);
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if the path is not a valid route or conflicts with one already
    /// registered for the same method.
    pub fn on(mut self, method: Method, path: &str, handler: impl Handler) -> Self {
        let route = handler.into_route();
        let name = route.name().to_owned();
        self.add(name, method, path.to_owned(), route);
        self
    }

    /// Mount every route of `blueprint` under its prefix.
    pub fn blueprint(mut self, blueprint: Blueprint) -> Self {
        for (method, path, route) in blueprint.routes {
            let name = format!("{}.{}", blueprint.name, route.name());
            let path = format!("{}{}", blueprint.prefix, path);
            self.add(name, method, path, route);
        }
        self
    }

    fn add(&mut self, name: String, method: Method, path: String, route: Route) {
        let index = self.endpoints.len();
        self.trees
            .entry(method.clone())
            .or_default()
            .insert(path.as_str(), index)
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
        debug!(endpoint = %name, %method, %path, "route registered");
        self.endpoints.push(Endpoint { name, method, path, route });
    }

    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    pub fn endpoints_mut(&mut self) -> &mut [Endpoint] {
        &mut self.endpoints
    }

    pub fn endpoint(&self, name: &str) -> Option<&Endpoint> {
        self.endpoints.iter().find(|e| e.name == name)
    }

    /// The URL of endpoint `name`, if it exists and its path takes no
    /// parameters.
    ///
    /// ```rust
    /// # use routeguard::{Blueprint, Method, Request, Response, Router};
    /// # async fn login(_: Request) -> Response { Response::text("") }
    /// # async fn get_user(_: Request) -> Response { Response::text("") }
    /// let router = Router::new()
    ///     .on(Method::GET, "/users/{id}", get_user)
    ///     .blueprint(Blueprint::new("auth", "/auth").on(Method::GET, "/login", login));
    ///
    /// assert_eq!(router.url_for("auth.login").as_deref(), Some("/auth/login"));
    /// assert_eq!(router.url_for("get_user"), None);
    /// assert_eq!(router.url_for("missing"), None);
    /// ```
    pub fn url_for(&self, name: &str) -> Option<String> {
        let path = &self.endpoint(name)?.path;
        // `{{` and `}}` are escaped literal braces; any other `{` opens a parameter.
        let literal = path.replace("{{", "").replace("}}", "");
        if literal.contains('{') {
            return None;
        }
        Some(path.replace("{{", "{").replace("}}", "}"))
    }

    pub(crate) fn lookup(
        &self,
        method: &Method,
        path: &str,
    ) -> Option<(&Endpoint, HashMap<String, String>)> {
        let tree = self.trees.get(method)?;
        let matched = tree.at(path).ok()?;
        let endpoint = &self.endpoints[*matched.value];
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some((endpoint, params))
    }

    /// Routes one request and produces one response.
    ///
    /// Errors that no middleware handled get the framework's default
    /// treatment: an [`Abort`] answers with its status, anything else is
    /// logged and answered with `500 Internal Server Error`.
    pub async fn handle(&self, req: Request) -> Response {
        let Some((endpoint, params)) = self.lookup(req.method(), req.path()) else {
            return Response::status(StatusCode::NOT_FOUND);
        };

        match endpoint.route.call(req.with_params(params)).await {
            Ok(response) => response,
            Err(e) => match e.downcast_ref::<Abort>() {
                Some(abort) => Response::status(abort.status()),
                None => {
                    error!(endpoint = %endpoint.name, error = %e, kind = e.type_name(), "unhandled route error");
                    Response::status(StatusCode::INTERNAL_SERVER_ERROR)
                }
            },
        }
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}

// ── Blueprint ─────────────────────────────────────────────────────────────────

/// A named group of routes sharing a path prefix.
///
/// ```rust
/// # use routeguard::{Blueprint, Method, Request, Response, Router};
/// # async fn list_users(_: Request) -> Response { Response::text("") }
/// let admin = Blueprint::new("admin", "/admin")
///     .on(Method::GET, "/users", list_users);
///
/// let router = Router::new().blueprint(admin);
///
/// assert_eq!(router.endpoints()[0].name(), "admin.list_users");
/// assert_eq!(router.endpoints()[0].path(), "/admin/users");
/// ```
pub struct Blueprint {
    name: String,
    prefix: String,
    routes: Vec<(Method, String, Route)>,
}

impl Blueprint {
    pub fn new(name: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self { name: name.into(), prefix: prefix.into(), routes: Vec::new() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn on(mut self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.routes.push((method, path.to_owned(), handler.into_route()));
        self
    }
}
