//! Liveness handler.

use axum::Router;
use axum::routing::get;

use super::response::Health;
use crate::extract::Json;
use crate::handler::ServiceState;

/// Tracing target for monitor operations.
const TRACING_TARGET: &str = "papercast_server::handler::monitors";

#[tracing::instrument(skip_all)]
async fn health() -> Json<Health> {
    tracing::trace!(target: TRACING_TARGET, "Health check requested");
    Json(Health::default())
}

/// Returns a [`Router`] with all related routes.
pub fn routes() -> Router<ServiceState> {
    Router::new().route("/health", get(health))
}

#[cfg(test)]
mod test {
    use crate::handler::test::create_test_server;

    #[tokio::test]
    async fn health_reports_ok() -> anyhow::Result<()> {
        let server = create_test_server()?;

        let response = server.get("/health").await;
        response.assert_status_ok();

        let body: serde_json::Value = response.json();
        assert_eq!(body["status"], "ok");
        Ok(())
    }
}
