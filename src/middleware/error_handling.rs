//! Error handlers and the middleware that consults them.
//!
//! An [`ErrorHandler`] looks at one [`RouteError`] and either produces a
//! substitute [`Response`] or declines with `None`. Handlers compose through
//! [`ProxyErrorHandler`], an ordered chain, and reach routes through
//! [`ErrorHandlingMiddleware`]:
//!
//! ```rust
//! use std::sync::Arc;
//! use routeguard::{Request, Response, RouteError, StatusCode};
//! use routeguard::middleware::{Decorate, ErrorHandlingMiddleware, ProxyErrorHandler};
//!
//! let not_found = ProxyErrorHandler::from_fn(|error: &RouteError| {
//!     error.is::<std::num::ParseIntError>().then(|| Response::status(StatusCode::NOT_FOUND))
//! });
//!
//! async fn get_item(req: Request) -> Result<String, RouteError> {
//!     let id: u32 = req.param("id").unwrap_or_default().parse()?;
//!     Ok(format!("item {id}"))
//! }
//!
//! let route = Arc::new(ErrorHandlingMiddleware::new(not_found)).decorate(get_item);
//! ```

use std::sync::Arc;

use tracing::debug;

use super::Middleware;
use crate::error::RouteError;
use crate::handler::{Route, RouteFuture};
use crate::request::Request;
use crate::response::Response;

/// Classifies one error and optionally replaces it with a response.
///
/// `None` means "not handled"; `Some` is the substitute result, even when the
/// response itself is empty.
pub trait ErrorHandler: Send + Sync + 'static {
    fn handle(&self, error: &RouteError) -> Option<Response>;
}

/// An [`ErrorHandler`] split into a predicate and a formatter.
///
/// Matching logic (by type, by message, …) varies independently of how the
/// response is built. `handle_error` runs only when `can_handle` is true.
pub trait MatchingErrorHandler: Send + Sync + 'static {
    /// Pure predicate, no side effects.
    fn can_handle(&self, error: &RouteError) -> bool;

    fn handle_error(&self, error: &RouteError) -> Response;
}

impl<T: MatchingErrorHandler> ErrorHandler for T {
    fn handle(&self, error: &RouteError) -> Option<Response> {
        if self.can_handle(error) {
            Some(self.handle_error(error))
        } else {
            None
        }
    }
}

/// A plain function used as an [`ErrorHandler`].
pub struct FnErrorHandler<F>(F);

impl<F> FnErrorHandler<F>
where
    F: Fn(&RouteError) -> Option<Response> + Send + Sync + 'static,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> ErrorHandler for FnErrorHandler<F>
where
    F: Fn(&RouteError) -> Option<Response> + Send + Sync + 'static,
{
    fn handle(&self, error: &RouteError) -> Option<Response> {
        (self.0)(error)
    }
}

// ── ProxyErrorHandler ─────────────────────────────────────────────────────────

/// An ordered, immutable chain of error handlers.
///
/// With `is_return_delegated` (the default) the first handler returning
/// `Some` wins and the rest are skipped. Without it, every handler runs for
/// its side effects and the proxy itself always returns `None`.
pub struct ProxyErrorHandler {
    handlers: Vec<Box<dyn ErrorHandler>>,
    is_return_delegated: bool,
}

impl ProxyErrorHandler {
    pub fn new(handlers: impl IntoIterator<Item = Box<dyn ErrorHandler>>) -> Self {
        Self::with_delegation(handlers, true)
    }

    pub fn with_delegation(
        handlers: impl IntoIterator<Item = Box<dyn ErrorHandler>>,
        is_return_delegated: bool,
    ) -> Self {
        Self { handlers: handlers.into_iter().collect(), is_return_delegated }
    }

    /// A one-element chain around a plain function.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&RouteError) -> Option<Response> + Send + Sync + 'static,
    {
        Self::from_fn_with_delegation(f, true)
    }

    pub fn from_fn_with_delegation<F>(f: F, is_return_delegated: bool) -> Self
    where
        F: Fn(&RouteError) -> Option<Response> + Send + Sync + 'static,
    {
        Self::with_delegation([Box::new(FnErrorHandler::new(f)) as Box<dyn ErrorHandler>], is_return_delegated)
    }

    /// Appends a handler while the chain is being built.
    pub fn then(mut self, handler: impl ErrorHandler) -> Self {
        self.handlers.push(Box::new(handler));
        self
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn is_return_delegated(&self) -> bool {
        self.is_return_delegated
    }
}

impl ErrorHandler for ProxyErrorHandler {
    fn handle(&self, error: &RouteError) -> Option<Response> {
        for handler in &self.handlers {
            let result = handler.handle(error);

            if self.is_return_delegated && result.is_some() {
                return result;
            }
        }
        None
    }
}

// ── ErrorHandlingMiddleware ───────────────────────────────────────────────────

/// Routes every error of a decorated route through an [`ErrorHandler`].
///
/// A handled error becomes the handler's response. An unhandled one is
/// returned unchanged, so it reaches the router's default handling.
pub struct ErrorHandlingMiddleware {
    handler: Arc<dyn ErrorHandler>,
}

impl ErrorHandlingMiddleware {
    pub fn new(handler: impl ErrorHandler) -> Self {
        Self { handler: Arc::new(handler) }
    }
}

impl Middleware for ErrorHandlingMiddleware {
    fn call_route(&self, route: &Route, req: Request) -> RouteFuture {
        let route = route.clone();
        let handler = Arc::clone(&self.handler);

        Box::pin(async move {
            let error = match route.call(req).await {
                Ok(response) => return Ok(response),
                Err(error) => error,
            };

            match handler.handle(&error) {
                Some(response) => {
                    debug!(route = route.name(), kind = error.type_name(), status = %response.status_code(), "route error handled");
                    Ok(response)
                }
                None => {
                    debug!(route = route.name(), kind = error.type_name(), "route error not handled, propagating");
                    Err(error)
                }
            }
        })
    }
}
