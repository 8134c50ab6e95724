//! Per-request tracing.

use std::time::Instant;

use tracing::{info, info_span, warn, Instrument};

use super::Middleware;
use crate::handler::{Route, RouteFuture};
use crate::request::Request;

/// Wraps every call in a `route` span carrying the route name, method and
/// path, and logs the outcome with its latency.
///
/// A route error is logged at `warn` and returned unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct TraceMiddleware;

impl Middleware for TraceMiddleware {
    fn call_route(&self, route: &Route, req: Request) -> RouteFuture {
        let route = route.clone();
        let span = info_span!("route", name = route.name(), method = %req.method(), path = req.path());

        Box::pin(
            async move {
                let started = Instant::now();
                let result = route.call(req).await;
                let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

                match &result {
                    Ok(response) => info!(status = %response.status_code(), elapsed_ms, "route finished"),
                    Err(error) => warn!(kind = error.type_name(), error = %error, elapsed_ms, "route failed"),
                }
                result
            }
            .instrument(span),
        )
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use http::{Method, StatusCode};

    use super::*;
    use crate::error::{abort, RouteError};
    use crate::middleware::Decorate;
    use crate::response::Response;

    async fn teapot(req: Request) -> Result<Response, RouteError> {
        if req.path() == "/fail" {
            return abort(StatusCode::IM_A_TEAPOT);
        }
        Ok(Response::text("tea"))
    }

    #[tokio::test]
    async fn passes_results_through() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
        let route = Arc::new(TraceMiddleware).decorate(teapot);

        let ok = route.call(Request::new(Method::GET, "/")).await.unwrap();
        let err = route.call(Request::new(Method::GET, "/fail")).await.unwrap_err();

        assert_eq!(ok.body(), b"tea");
        assert_eq!(err.to_string(), "aborted with status 418 I'm a teapot");
        assert_eq!(route.name(), "teapot");
    }
}
