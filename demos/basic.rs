//! routeguard example: JSON error formatting, session finishing and
//! registrars configured from TOML.
//!
//! Run with:
//!   RUST_LOG=debug cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/users/42
//!   curl http://localhost:3000/users/abc        # 400, handled ParseIntError
//!   curl http://localhost:3000/users/7          # 404, handled UserNotFound
//!   curl -X POST http://localhost:3000/admin/users
//!   curl http://localhost:3000/admin/crash      # 500, unhandled error

use std::fmt;
use std::num::ParseIntError;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use routeguard::middleware::{
    ErrorHandler, ErrorHandlingMiddleware, ErrorTypeStatus, ProxyErrorHandler, Session,
    SessionFinisherMiddleware, TemplatedJsonFormatter, TraceMiddleware,
};
use routeguard::registrar::{MiddlewareCatalog, MultipleMiddlewareRegistrar, Registrar, RegistrarSettings};
use routeguard::{Blueprint, Json, Method, Request, Response, RouteError, Router, Server, StatusCode};

const SETTINGS: &str = r#"
global_middlewares = ["trace"]
middlewares = ["errors"]

[environments.admin]
middlewares = ["session"]
use_for_blueprint = true
"#;

#[derive(Debug)]
struct UserNotFound(u32);

impl fmt::Display for UserNotFound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "user {} not found", self.0)
    }
}

impl std::error::Error for UserNotFound {}

#[derive(Debug)]
struct Crash;

impl fmt::Display for Crash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("something broke")
    }
}

impl std::error::Error for Crash {}

/// Counts commits and rollbacks instead of talking to a database.
#[derive(Default)]
struct CountingSession {
    commits: AtomicUsize,
    rollbacks: AtomicUsize,
}

impl Session for CountingSession {
    fn commit(&self) -> Result<(), RouteError> {
        let commits = self.commits.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::info!(commits, "session committed");
        Ok(())
    }

    fn rollback(&self) {
        let rollbacks = self.rollbacks.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::info!(rollbacks, "session rolled back");
    }
}

#[tokio::main]
async fn main() -> Result<(), routeguard::Error> {
    tracing_subscriber::fmt::init();

    let errors = ProxyErrorHandler::new([
        Box::new(TemplatedJsonFormatter::with_flags(
            ErrorTypeStatus::new()
                .on::<ParseIntError>(StatusCode::BAD_REQUEST)
                .on::<UserNotFound>(StatusCode::NOT_FOUND),
            true,
            true,
        )) as Box<dyn ErrorHandler>,
    ]);

    let catalog = MiddlewareCatalog::new()
        .with("trace", Arc::new(TraceMiddleware))
        .with("errors", Arc::new(ErrorHandlingMiddleware::new(errors)))
        .with("session", Arc::new(SessionFinisherMiddleware::new(Arc::new(CountingSession::default()))));

    let settings = RegistrarSettings::from_toml(SETTINGS)?;
    let registrar = MultipleMiddlewareRegistrar::from_settings(&settings, &catalog, Default::default(), true)?;

    let mut app = Router::new()
        .on(Method::GET, "/users/{id}", get_user)
        .blueprint(
            Blueprint::new("admin", "/admin")
                .on(Method::POST, "/users", create_user)
                .on(Method::GET, "/crash", crash),
        );
    registrar.init_app(&mut app);

    Server::bind("0.0.0.0:3000")?.serve(app).await
}

// GET /users/{id}
async fn get_user(req: Request) -> Result<Json<serde_json::Value>, RouteError> {
    let id: u32 = req.param("id").unwrap_or_default().parse()?;
    if id == 7 {
        return Err(UserNotFound(id).into());
    }
    Ok(Json(serde_json::json!({ "id": id, "name": "alice" })))
}

// POST /admin/users
async fn create_user(_req: Request) -> Response {
    Response::builder()
        .status(StatusCode::CREATED)
        .header("location", "/users/99")
        .json(br#"{"id":99}"#.to_vec())
}

// GET /admin/crash
async fn crash(_req: Request) -> Result<Response, Crash> {
    Err(Crash)
}
