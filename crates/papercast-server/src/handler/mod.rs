//! All `axum::`[`Router`]s with related `axum::`[`Handler`]s.
//!
//! # Usage Example
//!
//! ```rust,ignore
//! use papercast_runtime::engine::Engine;
//! use papercast_server::{PipelineServer, ServiceState, routes};
//!
//! let server = PipelineServer::new(Engine::with_defaults());
//! let app = routes().with_state(ServiceState::new(server));
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
//! axum::serve(listener, app).await?;
//! ```
//!
//! [`Handler`]: axum::handler::Handler

mod error;
mod monitors;
mod pipelines;
pub mod request;
pub mod response;
mod runs;

use std::sync::Arc;

use axum::Router;
use axum::extract::FromRef;
use axum::response::{IntoResponse, Response};

pub use crate::handler::error::{Error, ErrorKind, Result};
pub use crate::handler::response::ErrorResponse;
use crate::server::PipelineServer;

/// Application state.
///
/// Used for the [`State`] extraction (dependency injection).
///
/// [`State`]: axum::extract::State
#[must_use = "state does nothing unless you use it"]
#[derive(Debug, Clone)]
pub struct ServiceState {
    pub server: Arc<PipelineServer>,
}

impl ServiceState {
    /// Wraps a fully registered server.
    pub fn new(server: PipelineServer) -> Self {
        Self {
            server: Arc::new(server),
        }
    }
}

impl FromRef<ServiceState> for Arc<PipelineServer> {
    fn from_ref(state: &ServiceState) -> Self {
        state.server.clone()
    }
}

#[inline]
async fn fallback() -> Response {
    ErrorKind::NotFound.into_response()
}

/// Returns a [`Router`] with all routes.
pub fn routes() -> Router<ServiceState> {
    Router::new()
        .merge(monitors::routes())
        .merge(pipelines::routes())
        .merge(runs::routes())
        .fallback(fallback)
}
