//! Middlewares that react to the status code a route answered with.

use std::sync::Arc;

use http::StatusCode;
use tracing::debug;

use super::Middleware;
use crate::error::{abort, RouteError};
use crate::handler::{Route, RouteFuture, RouteResult};
use crate::request::Request;
use crate::response::Response;
use crate::router::Router;
use crate::tools::MultiRange;

type Aborter = Arc<dyn Fn(StatusCode) -> RouteResult + Send + Sync>;

/// Turns responses with a matching status into the aborter's result.
///
/// By default every status in `400..=500` is turned into an
/// [`Abort`](crate::Abort) error, which the router answers with that status
/// and an empty body.
pub struct StatusCodeAbortingMiddleware {
    status_codes: MultiRange,
    aborter: Aborter,
}

impl Default for StatusCodeAbortingMiddleware {
    fn default() -> Self {
        Self::new(MultiRange::from(400..501))
    }
}

impl StatusCodeAbortingMiddleware {
    pub fn new(status_codes: MultiRange) -> Self {
        Self { status_codes, aborter: Arc::new(abort::<Response>) }
    }

    /// Replaces the default aborter.
    pub fn with_aborter<F>(mut self, aborter: F) -> Self
    where
        F: Fn(StatusCode) -> RouteResult + Send + Sync + 'static,
    {
        self.aborter = Arc::new(aborter);
        self
    }

    pub fn status_codes(&self) -> &MultiRange {
        &self.status_codes
    }
}

impl Middleware for StatusCodeAbortingMiddleware {
    fn call_route(&self, route: &Route, req: Request) -> RouteFuture {
        let route = route.clone();
        let status_codes = self.status_codes.clone();
        let aborter = Arc::clone(&self.aborter);

        Box::pin(async move {
            let response = route.call(req).await?;
            let status = response.status_code();

            if status_codes.contains_status(status) {
                debug!(route = route.name(), %status, "aborting on status code");
                return aborter(status);
            }
            Ok::<_, RouteError>(response)
        })
    }
}

/// Replaces responses with a matching status by a `302 Found` redirect.
///
/// The location is either a URL or, once resolved against a router, the
/// name of a parameterless endpoint.
pub struct StatusCodeRedirectorMiddleware {
    location: String,
    status_codes: Vec<StatusCode>,
}

impl StatusCodeRedirectorMiddleware {
    /// Redirects `301` and `302` responses to `location`.
    pub fn new(location: impl Into<String>) -> Self {
        Self::with_status_codes(location, [StatusCode::MOVED_PERMANENTLY, StatusCode::FOUND])
    }

    pub fn with_status_codes(
        location: impl Into<String>,
        status_codes: impl IntoIterator<Item = StatusCode>,
    ) -> Self {
        Self { location: location.into(), status_codes: status_codes.into_iter().collect() }
    }

    /// Redirects `301` and `302` responses to endpoint `target` of `router`,
    /// or to `target` itself when the router has no such endpoint.
    pub fn for_endpoint(router: &Router, target: &str) -> Self {
        Self::new(target).resolve_location(router)
    }

    /// Replaces the location by the URL of the endpoint it names, if
    /// `router` has one. Otherwise the location stays a literal URL.
    pub fn resolve_location(mut self, router: &Router) -> Self {
        if let Some(url) = router.url_for(&self.location) {
            debug!(endpoint = %self.location, %url, "redirect location resolved");
            self.location = url;
        }
        self
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn status_codes(&self) -> &[StatusCode] {
        &self.status_codes
    }
}

impl Middleware for StatusCodeRedirectorMiddleware {
    fn call_route(&self, route: &Route, req: Request) -> RouteFuture {
        let route = route.clone();
        let location = self.location.clone();
        let status_codes = self.status_codes.clone();

        Box::pin(async move {
            let response = route.call(req).await?;

            if status_codes.contains(&response.status_code()) {
                debug!(route = route.name(), status = %response.status_code(), location = %location, "redirecting");
                return Ok(Response::redirect(&location));
            }
            Ok::<_, RouteError>(response)
        })
    }
}

#[cfg(test)]
mod tests {
    use http::Method;

    use super::*;
    use crate::error::Abort;
    use crate::handler::Handler;
    use crate::middleware::Decorate;
    use crate::tools::StatusCodeGroup;

    async fn echo_status(req: Request) -> Response {
        let code = req.path().trim_start_matches('/').parse().unwrap_or(200);
        Response::status(StatusCode::from_u16(code).unwrap_or(StatusCode::OK))
    }

    async fn call(route: &Route, path: &str) -> RouteResult {
        route.call(Request::new(Method::GET, path)).await
    }

    #[tokio::test]
    async fn aborts_on_client_errors_and_500_by_default() {
        let route = Arc::new(StatusCodeAbortingMiddleware::default()).decorate(echo_status);

        let not_found = call(&route, "/404").await.unwrap_err();
        let internal = call(&route, "/500").await.unwrap_err();
        let unavailable = call(&route, "/503").await.unwrap();
        let ok = call(&route, "/200").await.unwrap();

        assert_eq!(not_found.downcast_ref::<Abort>().map(Abort::status), Some(StatusCode::NOT_FOUND));
        assert!(internal.is::<Abort>());
        assert_eq!(unavailable.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(ok.status_code(), StatusCode::OK);
    }

    #[tokio::test]
    async fn custom_aborter_and_ranges() {
        let middleware = StatusCodeAbortingMiddleware::new(StatusCodeGroup::SUCCESSFUL)
            .with_aborter(|status| Ok(Response::text(format!("was {}", status.as_u16()))));
        let route = Arc::new(middleware).decorate(echo_status);

        let response = call(&route, "/201").await.unwrap();

        assert_eq!(response.body(), b"was 201");
    }

    #[tokio::test]
    async fn redirects_matching_statuses() {
        let route = Arc::new(StatusCodeRedirectorMiddleware::new("/login")).decorate(echo_status);

        let moved = call(&route, "/301").await.unwrap();
        let ok = call(&route, "/200").await.unwrap();

        assert_eq!(moved.status_code(), StatusCode::FOUND);
        assert_eq!(moved.header("location"), Some("/login"));
        assert_eq!(ok.status_code(), StatusCode::OK);
    }

    #[tokio::test]
    async fn redirects_to_named_endpoint_url() {
        let router = Router::new()
            .on(Method::GET, "/auth/login", (|_req: Request| async { "login" }).into_route().named("login"));

        let named = StatusCodeRedirectorMiddleware::for_endpoint(&router, "login");
        let literal = StatusCodeRedirectorMiddleware::for_endpoint(&router, "https://example.com/login");
        let moved = call(&Arc::new(named).decorate(echo_status), "/302").await.unwrap();

        assert_eq!(moved.header("location"), Some("/auth/login"));
        assert_eq!(literal.location(), "https://example.com/login");
    }

    #[tokio::test]
    async fn redirector_uses_configured_codes() {
        let middleware = StatusCodeRedirectorMiddleware::with_status_codes("/", [StatusCode::UNAUTHORIZED]);
        let route = Arc::new(middleware).decorate(echo_status);

        assert_eq!(call(&route, "/401").await.unwrap().status_code(), StatusCode::FOUND);
        assert_eq!(call(&route, "/302").await.unwrap().status_code(), StatusCode::FOUND);
        assert_eq!(call(&route, "/302").await.unwrap().header("location"), None);
    }
}
