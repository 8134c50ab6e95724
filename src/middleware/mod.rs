//! Middleware layer.
//!
//! A middleware wraps a [`Route`] and intercepts every call to it. It is the
//! place for cross-cutting concerns: turning errors into responses, finishing
//! database sessions, aborting on status codes, tracing.
//!
//! Implement [`Middleware::call_route`], put the middleware in an `Arc` and
//! [`decorate`](Decorate::decorate) routes with it:
//!
//! ```rust
//! use std::sync::Arc;
//! use routeguard::{Request, Route, RouteError, RouteFuture, Response};
//! use routeguard::middleware::{Decorate, Middleware};
//!
//! struct PoweredBy;
//!
//! impl Middleware for PoweredBy {
//!     fn call_route(&self, route: &Route, req: Request) -> RouteFuture {
//!         let route = route.clone();
//!         Box::pin(async move {
//!             let response = route.call(req).await?;
//!             Ok::<_, RouteError>(Response::builder()
//!                 .status(response.status_code())
//!                 .header("x-powered-by", "routeguard")
//!                 .json(response.body().to_vec()))
//!         })
//!     }
//! }
//!
//! async fn index(_req: Request) -> Response { Response::json(b"{}".to_vec()) }
//!
//! let route = Arc::new(PoweredBy).decorate(index);
//! assert_eq!(route.name(), "index");
//! ```

use std::sync::Arc;

use http::StatusCode;

use crate::handler::{ErasedRoute, Handler, Route, RouteFuture};
use crate::request::Request;
use crate::response::Response;

pub mod error_handling;
pub mod formatter;
pub mod session;
pub mod status_code;
pub mod trace;

pub use error_handling::{
    ErrorHandler, ErrorHandlingMiddleware, FnErrorHandler, MatchingErrorHandler, ProxyErrorHandler,
};
pub use formatter::{ErrorTypeStatus, JsonResponseFormatter, StatusPolicy, TemplatedJsonFormatter};
pub use session::{Session, SessionFinisherMiddleware};
pub use status_code::{StatusCodeAbortingMiddleware, StatusCodeRedirectorMiddleware};
pub use trace::TraceMiddleware;

/// A hook around every call of a decorated route.
pub trait Middleware: Send + Sync + 'static {
    /// Called instead of `route` for every request to a decorated route.
    ///
    /// The provided implementation is a no-op: the route is not called and
    /// the result is an empty `204 No Content`. Implementors call
    /// `route.call(req)` and add behavior before, after or around it.
    fn call_route(&self, route: &Route, req: Request) -> RouteFuture {
        let _ = (route, req);
        Box::pin(async { Ok(Response::status(StatusCode::NO_CONTENT)) })
    }
}

/// Shared middlewares, as stored by [`MultipleMiddleware`] and the registrars.
pub type SharedMiddleware = Arc<dyn Middleware>;

/// Decoration of routes by a shared middleware.
///
/// Implemented for `Arc<M>`, including `Arc<dyn Middleware>`, because the
/// decorated route keeps its own reference to the middleware.
pub trait Decorate {
    /// Returns a route with the same metadata as `route` whose every call
    /// goes through [`Middleware::call_route`].
    fn decorate(&self, route: impl Handler) -> Route;
}

impl<M: Middleware + ?Sized> Decorate for Arc<M> {
    fn decorate(&self, route: impl Handler) -> Route {
        let route = route.into_route();
        let meta = route.meta().clone();
        Route::from_erased(Decorated { middleware: Arc::clone(self), route }, meta)
    }
}

struct Decorated<M: ?Sized> {
    middleware: Arc<M>,
    route: Route,
}

impl<M: Middleware + ?Sized> ErasedRoute for Decorated<M> {
    fn call(&self, req: Request) -> RouteFuture {
        self.middleware.call_route(&self.route, req)
    }
}

// ── MultipleMiddleware ────────────────────────────────────────────────────────

/// A middleware made of an ordered list of middlewares.
///
/// The first middleware is the outermost: it sees the request first and the
/// result last.
#[derive(Clone, Default)]
pub struct MultipleMiddleware {
    middlewares: Vec<SharedMiddleware>,
}

impl MultipleMiddleware {
    pub fn new(middlewares: impl IntoIterator<Item = SharedMiddleware>) -> Self {
        Self { middlewares: middlewares.into_iter().collect() }
    }

    pub fn middlewares(&self) -> &[SharedMiddleware] {
        &self.middlewares
    }

    pub fn set_middlewares(&mut self, middlewares: impl IntoIterator<Item = SharedMiddleware>) {
        self.middlewares = middlewares.into_iter().collect();
    }

    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    /// Decorates `route` with every middleware, innermost first.
    pub fn chain(&self, route: Route) -> Route {
        self.middlewares.iter().rev().fold(route, |route, middleware| middleware.decorate(route))
    }
}

impl Middleware for MultipleMiddleware {
    fn call_route(&self, route: &Route, req: Request) -> RouteFuture {
        self.chain(route.clone()).call(req)
    }
}
