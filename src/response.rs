//! Outgoing HTTP response type and the conversion traits routes return through.
//!
//! A route returns anything that implements [`IntoRouteResult`]: a plain
//! response type, or `Result<R, E>` where `R` is a response type and `E`
//! converts into a [`RouteError`]. The `Err` side is what middlewares and
//! error handlers get to see.

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue};
use http::StatusCode;
use http_body_util::Full;
use serde::Serialize;
use tracing::{error, warn};

use crate::error::RouteError;

// ── ContentType ───────────────────────────────────────────────────────────────

/// Common content-type values for use with [`ResponseBuilder::bytes`].
pub enum ContentType {
    Html,         // text/html; charset=utf-8
    Json,         // application/json
    OctetStream,  // application/octet-stream
    Text,         // text/plain; charset=utf-8
}

impl ContentType {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Html        => "text/html; charset=utf-8",
            Self::Json        => "application/json",
            Self::OctetStream => "application/octet-stream",
            Self::Text        => "text/plain; charset=utf-8",
        }
    }
}

// ── Response ─────────────────────────────────────────────────────────────────

/// An outgoing HTTP response.
///
/// ```rust
/// use routeguard::{Response, StatusCode};
///
/// Response::json(br#"{"id":1}"#.to_vec());
/// Response::text("hello");
/// Response::status(StatusCode::NO_CONTENT);
///
/// Response::builder()
///     .status(StatusCode::CREATED)
///     .header("location", "/users/42")
///     .json(br#"{"id":42}"#.to_vec());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub(crate) body: Vec<u8>,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) status: StatusCode,
}

impl Response {
    /// `200 OK` with an `application/json` body.
    pub fn json(body: Vec<u8>) -> Self {
        Self::builder().json(body)
    }

    /// `200 OK` with a `text/plain; charset=utf-8` body.
    pub fn text(body: impl Into<String>) -> Self {
        Self::builder().text(body)
    }

    /// Response with no body.
    pub fn status(code: StatusCode) -> Self {
        Self { body: Vec::new(), headers: Vec::new(), status: code }
    }

    /// `302 Found` pointing at `location`.
    pub fn redirect(location: &str) -> Self {
        Self::builder()
            .status(StatusCode::FOUND)
            .header("location", location)
            .no_body()
    }

    pub fn builder() -> ResponseBuilder {
        ResponseBuilder { headers: Vec::new(), status: StatusCode::OK }
    }

    pub fn status_code(&self) -> StatusCode { self.status }
    pub fn headers(&self) -> &[(String, String)] { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Converts into the hyper-facing representation. Headers that are not
    /// valid HTTP are dropped with a warning.
    pub(crate) fn into_http(self) -> http::Response<Full<Bytes>> {
        let mut response = http::Response::new(Full::new(Bytes::from(self.body)));
        *response.status_mut() = self.status;

        let headers = response.headers_mut();
        for (name, value) in self.headers {
            match (HeaderName::try_from(name.as_str()), HeaderValue::try_from(value.as_str())) {
                (Ok(name), Ok(value)) => {
                    headers.append(name, value);
                }
                _ => warn!(header = %name, "dropping invalid response header"),
            }
        }
        response
    }
}

// ── ResponseBuilder ───────────────────────────────────────────────────────────

/// Fluent builder for [`Response`].
///
/// Obtain via [`Response::builder()`]. Defaults to `200 OK`.
/// Terminated by a typed body method.
pub struct ResponseBuilder {
    headers: Vec<(String, String)>,
    status: StatusCode,
}

impl ResponseBuilder {
    pub fn status(mut self, code: StatusCode) -> Self {
        self.status = code;
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    /// Terminate with a JSON body (`application/json`).
    pub fn json(self, body: Vec<u8>) -> Response {
        self.finish(ContentType::Json.as_str(), body)
    }

    /// Terminate with a plain-text body (`text/plain; charset=utf-8`).
    pub fn text(self, body: impl Into<String>) -> Response {
        self.finish(ContentType::Text.as_str(), body.into().into_bytes())
    }

    pub fn bytes(self, content_type: ContentType, body: Vec<u8>) -> Response {
        self.finish(content_type.as_str(), body)
    }

    pub fn no_body(self) -> Response {
        Response { body: Vec::new(), headers: self.headers, status: self.status }
    }

    fn finish(self, content_type: &str, body: Vec<u8>) -> Response {
        let mut headers = vec![("content-type".to_owned(), content_type.to_owned())];
        headers.extend(self.headers);
        Response { body, headers, status: self.status }
    }
}

// ── Json ──────────────────────────────────────────────────────────────────────

/// A serde-serializable value sent as `application/json`.
///
/// Serialization failures become an empty `500 Internal Server Error`.
pub struct Json<T>(pub T);

impl<T: Serialize> Json<T> {
    /// Like [`IntoResponse::into_response`], with an explicit status.
    pub fn with_status(self, status: StatusCode) -> Response {
        match serde_json::to_vec(&self.0) {
            Ok(bytes) => Response::builder().status(status).json(bytes),
            Err(e) => {
                error!("json serialization failed: {e}");
                Response::status(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }
}

// ── IntoResponse ──────────────────────────────────────────────────────────────

/// Conversion into an HTTP [`Response`].
pub trait IntoResponse {
    fn into_response(self) -> Response;
}

impl IntoResponse for Response {
    fn into_response(self) -> Response { self }
}

impl IntoResponse for &'static str {
    fn into_response(self) -> Response { Response::text(self) }
}

impl IntoResponse for String {
    fn into_response(self) -> Response { Response::text(self) }
}

/// Return a status directly from a route: `return StatusCode::NOT_FOUND`
impl IntoResponse for StatusCode {
    fn into_response(self) -> Response { Response::status(self) }
}

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response { self.with_status(StatusCode::OK) }
}

// ── IntoRouteResult ───────────────────────────────────────────────────────────

/// What a route's future may resolve to.
///
/// Implemented for every [`IntoResponse`] type (an infallible route) and for
/// `Result<R, E>` with `R: IntoResponse` and `E: Into<RouteError>` (a route
/// that can fail).
pub trait IntoRouteResult {
    fn into_route_result(self) -> Result<Response, RouteError>;
}

impl<R, E> IntoRouteResult for Result<R, E>
where
    R: IntoResponse,
    E: Into<RouteError>,
{
    fn into_route_result(self) -> Result<Response, RouteError> {
        self.map(IntoResponse::into_response).map_err(Into::into)
    }
}

macro_rules! infallible_route_result {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IntoRouteResult for $ty {
                fn into_route_result(self) -> Result<Response, RouteError> {
                    Ok(self.into_response())
                }
            }
        )*
    };
}

infallible_route_result!(Response, &'static str, String, StatusCode);

impl<T: Serialize> IntoRouteResult for Json<T> {
    fn into_route_result(self) -> Result<Response, RouteError> {
        Ok(self.into_response())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_puts_content_type_first() {
        let response = Response::builder()
            .status(StatusCode::CREATED)
            .header("location", "/users/42")
            .json(b"{}".to_vec());

        assert_eq!(response.status_code(), StatusCode::CREATED);
        assert_eq!(response.headers()[0], ("content-type".to_owned(), "application/json".to_owned()));
        assert_eq!(response.header("Location"), Some("/users/42"));
    }

    #[test]
    fn json_wrapper_serializes_with_status() {
        let response = Json(serde_json::json!({"id": 7})).with_status(StatusCode::ACCEPTED);

        assert_eq!(response.status_code(), StatusCode::ACCEPTED);
        assert_eq!(response.body(), br#"{"id":7}"#);
    }

    #[test]
    fn redirect_sets_location() {
        let response = Response::redirect("/login");

        assert_eq!(response.status_code(), StatusCode::FOUND);
        assert_eq!(response.header("location"), Some("/login"));
        assert!(response.body().is_empty());
    }

    #[test]
    fn invalid_headers_are_dropped_on_conversion() {
        let response = Response::builder()
            .header("bad header", "x")
            .header("x-ok", "yes")
            .no_body()
            .into_http();

        assert_eq!(response.headers().len(), 1);
        assert_eq!(response.headers()["x-ok"], "yes");
    }

    #[test]
    fn result_route_output_keeps_error() {
        let ok: Result<&'static str, std::fmt::Error> = Ok("fine");
        let failed: Result<&'static str, std::fmt::Error> = Err(std::fmt::Error);

        assert_eq!(ok.into_route_result().unwrap().body(), b"fine");
        assert_eq!(failed.into_route_result().unwrap_err().type_name(), "Error");
    }
}
