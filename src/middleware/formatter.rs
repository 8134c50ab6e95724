//! Error handlers that answer with a JSON body.
//!
//! [`JsonResponseFormatter`] fixes the shape of the handling step (build a
//! body, pick a status, serialize once) and leaves body and status to the
//! implementor. [`TemplatedJsonFormatter`] is the ready-made body policy:
//!
//! ```text
//! {"message": "<error text>", "error-type": "<error type name>"}
//! ```
//!
//! with each key switched on or off at construction. Which errors it handles
//! and with which status is decided by a [`StatusPolicy`].

use std::error::Error as StdError;

use http::StatusCode;
use serde_json::{Map, Value};

use super::error_handling::MatchingErrorHandler;
use crate::error::RouteError;
use crate::response::{Json, Response};

/// Builds a JSON error response from a body and a status.
///
/// Both must be pure functions of the error.
pub trait JsonResponseFormatter: Send + Sync + 'static {
    fn can_handle(&self, error: &RouteError) -> bool;

    fn response_body(&self, error: &RouteError) -> Map<String, Value>;

    fn status_code(&self, error: &RouteError) -> StatusCode;
}

impl<T: JsonResponseFormatter> MatchingErrorHandler for T {
    fn can_handle(&self, error: &RouteError) -> bool {
        JsonResponseFormatter::can_handle(self, error)
    }

    fn handle_error(&self, error: &RouteError) -> Response {
        let body = self.response_body(error);
        let status = self.status_code(error);
        Json(Value::Object(body)).with_status(status)
    }
}

// ── StatusPolicy ──────────────────────────────────────────────────────────────

/// Decides which errors a formatter handles and with which status.
///
/// Any `Fn(&RouteError) -> Option<StatusCode>` is a policy: `Some` both
/// accepts the error and names the status.
pub trait StatusPolicy: Send + Sync + 'static {
    fn can_handle(&self, error: &RouteError) -> bool;

    fn status_code(&self, error: &RouteError) -> StatusCode;
}

impl<F> StatusPolicy for F
where
    F: Fn(&RouteError) -> Option<StatusCode> + Send + Sync + 'static,
{
    fn can_handle(&self, error: &RouteError) -> bool {
        self(error).is_some()
    }

    fn status_code(&self, error: &RouteError) -> StatusCode {
        self(error).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

/// Maps concrete error types to statuses. The first matching type wins.
///
/// ```rust
/// use std::num::ParseIntError;
/// use routeguard::{RouteError, StatusCode};
/// use routeguard::middleware::{ErrorTypeStatus, StatusPolicy};
///
/// let policy = ErrorTypeStatus::new()
///     .on::<ParseIntError>(StatusCode::BAD_REQUEST)
///     .on::<std::fmt::Error>(StatusCode::INTERNAL_SERVER_ERROR);
///
/// let error = RouteError::from("x".parse::<u8>().unwrap_err());
/// assert_eq!(policy.status_code(&error), StatusCode::BAD_REQUEST);
/// ```
#[derive(Clone, Default)]
pub struct ErrorTypeStatus {
    entries: Vec<(fn(&RouteError) -> bool, StatusCode)>,
}

impl ErrorTypeStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on<E: StdError + 'static>(mut self, status: StatusCode) -> Self {
        let matches: fn(&RouteError) -> bool = RouteError::is::<E>;
        self.entries.push((matches, status));
        self
    }

    fn find(&self, error: &RouteError) -> Option<StatusCode> {
        self.entries.iter()
            .find(|(matches, _)| matches(error))
            .map(|(_, status)| *status)
    }
}

impl StatusPolicy for ErrorTypeStatus {
    fn can_handle(&self, error: &RouteError) -> bool {
        self.find(error).is_some()
    }

    fn status_code(&self, error: &RouteError) -> StatusCode {
        self.find(error).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

// ── TemplatedJsonFormatter ────────────────────────────────────────────────────

/// JSON formatter with a fixed body template.
///
/// The body holds, in this order, `message` (the error's display text) when
/// `is_format_message` is set and `error-type` (its short type name) when
/// `is_format_type` is set. With neither, the body is `{}`.
pub struct TemplatedJsonFormatter<P> {
    policy: P,
    is_format_message: bool,
    is_format_type: bool,
}

impl<P: StatusPolicy> TemplatedJsonFormatter<P> {
    /// Formats the message only.
    pub fn new(policy: P) -> Self {
        Self::with_flags(policy, true, false)
    }

    pub fn with_flags(policy: P, is_format_message: bool, is_format_type: bool) -> Self {
        Self { policy, is_format_message, is_format_type }
    }

    pub fn is_format_message(&self) -> bool {
        self.is_format_message
    }

    pub fn is_format_type(&self) -> bool {
        self.is_format_type
    }
}

impl<P: StatusPolicy> JsonResponseFormatter for TemplatedJsonFormatter<P> {
    fn can_handle(&self, error: &RouteError) -> bool {
        self.policy.can_handle(error)
    }

    fn response_body(&self, error: &RouteError) -> Map<String, Value> {
        let mut body = Map::new();

        if self.is_format_message {
            body.insert("message".to_owned(), Value::String(error.to_string()));
        }
        if self.is_format_type {
            body.insert("error-type".to_owned(), Value::String(error.type_name().to_owned()));
        }

        body
    }

    fn status_code(&self, error: &RouteError) -> StatusCode {
        self.policy.status_code(error)
    }
}

#[cfg(test)]
mod tests {
    use std::fmt;

    use super::*;
    use crate::middleware::ErrorHandler;

    #[derive(Debug)]
    struct ValueError(&'static str);

    impl fmt::Display for ValueError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.0)
        }
    }

    impl std::error::Error for ValueError {}

    fn bad_request() -> ErrorTypeStatus {
        ErrorTypeStatus::new().on::<ValueError>(StatusCode::BAD_REQUEST)
    }

    fn body_of<P: StatusPolicy>(formatter: &TemplatedJsonFormatter<P>) -> String {
        let error = RouteError::from(ValueError("bad input"));
        let body = formatter.response_body(&error);
        serde_json::to_string(&body).unwrap()
    }

    #[test]
    fn message_only_body() {
        let formatter = TemplatedJsonFormatter::new(bad_request());

        assert_eq!(body_of(&formatter), r#"{"message":"bad input"}"#);
    }

    #[test]
    fn message_and_type_body_keeps_key_order() {
        let formatter = TemplatedJsonFormatter::with_flags(bad_request(), true, true);

        assert_eq!(body_of(&formatter), r#"{"message":"bad input","error-type":"ValueError"}"#);
    }

    #[test]
    fn type_only_and_empty_bodies() {
        let type_only = TemplatedJsonFormatter::with_flags(bad_request(), false, true);
        let empty = TemplatedJsonFormatter::with_flags(bad_request(), false, false);

        assert_eq!(body_of(&type_only), r#"{"error-type":"ValueError"}"#);
        assert_eq!(body_of(&empty), "{}");
    }

    #[test]
    fn handled_error_becomes_json_response() {
        let formatter = TemplatedJsonFormatter::new(bad_request());

        let response = formatter.handle(&ValueError("bad input").into()).unwrap();

        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(response.header("content-type"), Some("application/json"));
        assert_eq!(response.body(), br#"{"message":"bad input"}"#);
    }

    #[test]
    fn policy_decides_what_is_handled() {
        let formatter = TemplatedJsonFormatter::new(bad_request());

        assert!(formatter.handle(&std::fmt::Error.into()).is_none());
    }

    #[test]
    fn closures_are_policies() {
        let formatter = TemplatedJsonFormatter::new(|error: &RouteError| {
            error.to_string().starts_with("bad").then_some(StatusCode::UNPROCESSABLE_ENTITY)
        });

        let handled = formatter.handle(&ValueError("bad input").into());
        let declined = formatter.handle(&ValueError("fine").into());

        assert_eq!(handled.map(|r| r.status_code()), Some(StatusCode::UNPROCESSABLE_ENTITY));
        assert!(declined.is_none());
    }

    #[test]
    fn first_matching_type_wins() {
        let policy = ErrorTypeStatus::new()
            .on::<ValueError>(StatusCode::BAD_REQUEST)
            .on::<ValueError>(StatusCode::CONFLICT);

        assert_eq!(policy.status_code(&ValueError("x").into()), StatusCode::BAD_REQUEST);
    }
}
