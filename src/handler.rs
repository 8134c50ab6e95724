//! Routes, their metadata, and type erasure.
//!
//! # How routes are stored
//!
//! The router, the registrars and every middleware need to hold routes of
//! *different* concrete types uniformly, so each route is erased behind
//! `dyn ErasedRoute` and shared through an `Arc`:
//!
//! ```text
//! async fn get_user(req: Request) -> Result<Response, MyError> { … }
//!        ↓ get_user.into_route()                   ← Handler blanket impl
//! Route { inner: Arc<FnRoute(get_user)>, meta: "get_user" }
//!        ↓ middleware.decorate(route)
//! Route { inner: Arc<Decorated { middleware, route }>, meta: "get_user" }
//!        ↓ route.call(req)  at request time        ← one vtable dispatch
//! RouteFuture resolving to Result<Response, RouteError>
//! ```
//!
//! Decorating wraps the erased route again and copies the metadata, so a
//! route keeps its name and documentation through any number of
//! middlewares.

use std::any::type_name;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::{short_type_name, RouteError};
use crate::request::Request;
use crate::response::{IntoRouteResult, Response};

/// What every route resolves to.
pub type RouteResult = Result<Response, RouteError>;

/// A heap-allocated, type-erased route future.
///
/// `Send + 'static` let tokio move the future across threads.
pub type RouteFuture = Pin<Box<dyn Future<Output = RouteResult> + Send + 'static>>;

/// Internal dispatch interface.
///
/// `#[doc(hidden)] pub` because middleware wrappers implement it from other
/// modules of this crate; external code works with [`Route`].
#[doc(hidden)]
pub trait ErasedRoute: Send + Sync + 'static {
    fn call(&self, req: Request) -> RouteFuture;
}

// ── RouteMeta ─────────────────────────────────────────────────────────────────

/// Introspection data carried by a [`Route`] and preserved by decoration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMeta {
    name: String,
    doc: Option<String>,
}

impl RouteMeta {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), doc: None }
    }

    pub fn name(&self) -> &str { &self.name }
    pub fn doc(&self) -> Option<&str> { self.doc.as_deref() }
}

// ── Route ─────────────────────────────────────────────────────────────────────

/// A type-erased, cheaply clonable route.
///
/// ```rust
/// use routeguard::{Handler, Request, Response, Route};
///
/// async fn list_users(_req: Request) -> Response {
///     Response::text("[]")
/// }
///
/// let route = list_users.into_route().with_doc("Lists every user.");
///
/// assert_eq!(route.name(), "list_users");
/// assert_eq!(route.doc(), Some("Lists every user."));
/// ```
#[derive(Clone)]
pub struct Route {
    inner: Arc<dyn ErasedRoute>,
    meta: RouteMeta,
}

impl Route {
    /// Builds a route from an erased implementation and explicit metadata.
    pub(crate) fn from_erased(inner: impl ErasedRoute, meta: RouteMeta) -> Self {
        Self { inner: Arc::new(inner), meta }
    }

    pub fn call(&self, req: Request) -> RouteFuture {
        self.inner.call(req)
    }

    pub fn meta(&self) -> &RouteMeta { &self.meta }
    pub fn name(&self) -> &str { self.meta.name() }
    pub fn doc(&self) -> Option<&str> { self.meta.doc() }

    /// Overrides the name. Closures have no useful default name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.meta.name = name.into();
        self
    }

    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.meta.doc = Some(doc.into());
        self
    }
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route").field("meta", &self.meta).finish_non_exhaustive()
    }
}

// ── Public Handler trait ──────────────────────────────────────────────────────

/// Anything that can be registered as a route or decorated by a middleware.
///
/// Satisfied by [`Route`] itself and by any `async fn` with the signature:
///
/// ```text
/// async fn name(req: Request) -> impl IntoRouteResult
/// ```
///
/// that is, returning a response type or `Result<impl IntoResponse, E>` with
/// `E: Into<RouteError>`.
///
/// The trait is **sealed**: only the impls in this module can satisfy it.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    fn into_route(self) -> Route;
}

mod private {
    pub trait Sealed {}
}

impl private::Sealed for Route {}

impl Handler for Route {
    fn into_route(self) -> Route {
        self
    }
}

impl<F, Fut, R> private::Sealed for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoRouteResult + Send + 'static,
{
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoRouteResult + Send + 'static,
{
    fn into_route(self) -> Route {
        Route::from_erased(FnRoute(self), RouteMeta::new(short_type_name(type_name::<F>())))
    }
}

// ── Concrete wrapper ──────────────────────────────────────────────────────────

/// Holds a concrete route function `F` and implements [`ErasedRoute`].
struct FnRoute<F>(F);

impl<F, Fut, R> ErasedRoute for FnRoute<F>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoRouteResult + Send + 'static,
{
    fn call(&self, req: Request) -> RouteFuture {
        let fut = (self.0)(req);
        Box::pin(async move { fut.await.into_route_result() })
    }
}
