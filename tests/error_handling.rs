use std::fmt;
use std::sync::Arc;

use routeguard::middleware::{
    Decorate, ErrorHandler, ErrorHandlingMiddleware, ErrorTypeStatus, ProxyErrorHandler,
    StatusCodeAbortingMiddleware, TemplatedJsonFormatter,
};
use routeguard::{abort, Method, Request, Response, RouteError, Router, StatusCode};

#[derive(Debug)]
struct ValueError(String);

impl fmt::Display for ValueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ValueError {}

#[derive(Debug)]
struct KeyError(String);

impl fmt::Display for KeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}'", self.0)
    }
}

impl std::error::Error for KeyError {}

async fn validate(req: Request) -> Result<Response, RouteError> {
    match req.param("kind") {
        Some("value") => Err(ValueError("bad input".to_owned()).into()),
        Some("key") => Err(KeyError("user_id".to_owned()).into()),
        Some("abort") => abort(StatusCode::FORBIDDEN),
        _ => Ok(Response::text("valid")),
    }
}

fn json_errors(is_format_type: bool) -> Arc<ErrorHandlingMiddleware> {
    let formatter = TemplatedJsonFormatter::with_flags(
        ErrorTypeStatus::new().on::<ValueError>(StatusCode::BAD_REQUEST),
        true,
        is_format_type,
    );
    Arc::new(ErrorHandlingMiddleware::new(ProxyErrorHandler::new([
        Box::new(formatter) as Box<dyn ErrorHandler>,
    ])))
}

fn app(middleware: Arc<ErrorHandlingMiddleware>) -> Router {
    Router::new().on(Method::GET, "/check/{kind}", middleware.decorate(validate))
}

async fn get(router: &Router, path: &str) -> Response {
    router.handle(Request::new(Method::GET, path)).await
}

#[tokio::test]
async fn handled_error_becomes_json_response() {
    let router = app(json_errors(false));

    let response = get(&router, "/check/value").await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.header("content-type"), Some("application/json"));
    assert_eq!(response.body(), br#"{"message":"bad input"}"#);
}

#[tokio::test]
async fn error_type_is_included_on_request() {
    let router = app(json_errors(true));

    let response = get(&router, "/check/value").await;

    assert_eq!(response.body(), br#"{"message":"bad input","error-type":"ValueError"}"#);
}

#[tokio::test]
async fn unhandled_error_reaches_the_router() {
    let router = app(json_errors(true));

    let key = get(&router, "/check/key").await;
    let aborted = get(&router, "/check/abort").await;

    assert_eq!(key.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(key.body().is_empty());
    assert_eq!(aborted.status_code(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn successful_routes_are_untouched() {
    let router = app(json_errors(true));

    let response = get(&router, "/check/ok").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.body(), b"valid");
}

#[tokio::test]
async fn route_name_survives_decoration() {
    let router = app(json_errors(false));

    assert_eq!(router.endpoints()[0].name(), "validate");
}

#[tokio::test]
async fn aborted_statuses_can_be_formatted() {
    // Outer middleware formats the Abort raised by the inner one.
    let formatter = ErrorHandlingMiddleware::new(ProxyErrorHandler::from_fn(|error: &RouteError| {
        let abort = error.downcast_ref::<routeguard::Abort>()?;
        Some(Response::text(format!("aborted: {}", abort.status().as_u16())))
    }));
    let route = Arc::new(formatter).decorate(Arc::new(StatusCodeAbortingMiddleware::default()).decorate(
        |_req: Request| async { StatusCode::NOT_FOUND },
    ));
    let router = Router::new().on(Method::GET, "/", route);

    let response = get(&router, "/").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.body(), b"aborted: 404");
}
