//! Finishing a unit of work after each route call.

use std::sync::Arc;

use tracing::warn;

use super::Middleware;
use crate::error::RouteError;
use crate::handler::{Route, RouteFuture};
use crate::request::Request;

/// A transactional session shared by the routes it decorates, such as a
/// database session.
pub trait Session: Send + Sync + 'static {
    fn commit(&self) -> Result<(), RouteError>;

    fn rollback(&self);
}

/// Commits the session after a successful route and rolls it back after a
/// failed one.
///
/// The route's error is returned unchanged after the rollback. A failing
/// commit becomes the route's error.
pub struct SessionFinisherMiddleware<S> {
    session: Arc<S>,
}

impl<S: Session> SessionFinisherMiddleware<S> {
    pub fn new(session: Arc<S>) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Arc<S> {
        &self.session
    }
}

impl<S: Session> Middleware for SessionFinisherMiddleware<S> {
    fn call_route(&self, route: &Route, req: Request) -> RouteFuture {
        let route = route.clone();
        let session = Arc::clone(&self.session);

        Box::pin(async move {
            match route.call(req).await {
                Ok(response) => session.commit().map(|()| response),
                Err(error) => {
                    warn!(route = route.name(), kind = error.type_name(), "rolling back session");
                    session.rollback();
                    Err(error)
                }
            }
        })
    }
}
