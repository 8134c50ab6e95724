//! # routeguard
//!
//! Route-level middlewares and pluggable error handling for a small async
//! HTTP framework.
//!
//! Routes are plain async functions returning a response or a
//! `Result<_, E>` for any error type `E`. A [`Middleware`](middleware::Middleware)
//! wraps a route and sees every call to it; the error-handling middleware
//! turns the errors it recognizes into responses and lets the others reach
//! the router, which answers them with `500`.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use routeguard::{Method, Request, RouteError, Router, Server, StatusCode};
//! use routeguard::middleware::{
//!     ErrorHandlingMiddleware, ErrorTypeStatus, SharedMiddleware, TemplatedJsonFormatter,
//! };
//! use routeguard::registrar::{MiddlewareRegistrar, Registrar};
//!
//! async fn get_user(req: Request) -> Result<String, RouteError> {
//!     let id: u32 = req.param("id").unwrap_or_default().parse()?;
//!     Ok(format!("user {id}"))
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), routeguard::Error> {
//!     let formatter = TemplatedJsonFormatter::with_flags(
//!         ErrorTypeStatus::new().on::<std::num::ParseIntError>(StatusCode::BAD_REQUEST),
//!         true,
//!         true,
//!     );
//!
//!     let mut app = Router::new().on(Method::GET, "/users/{id}", get_user);
//!     MiddlewareRegistrar::new([Arc::new(ErrorHandlingMiddleware::new(formatter)) as SharedMiddleware])
//!         .init_app(&mut app);
//!
//!     // GET /users/abc -> 400 {"message":"invalid digit found in string","error-type":"ParseIntError"}
//!     Server::bind("0.0.0.0:3000")?.serve(app).await
//! }
//! ```

mod error;
mod handler;
mod request;
mod response;
mod router;
mod server;

pub mod middleware;
pub mod registrar;
pub mod tools;

pub use error::{abort, Abort, Error, RouteError};
pub use handler::{Handler, Route, RouteFuture, RouteMeta, RouteResult};
pub use http::{Method, StatusCode};
pub use request::Request;
pub use response::{ContentType, IntoResponse, IntoRouteResult, Json, Response, ResponseBuilder};
pub use router::{Blueprint, Endpoint, Router};
pub use server::Server;
pub use tools::{BinarySet, MultiRange, StatusCodeGroup};
