//! Pipeline listing handlers.

use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::routing::get;
use papercast_runtime::graph::PipelineSummary;

use crate::extract::{Json, Path};
use crate::handler::{Result, ServiceState};
use crate::{PipelineInfo, PipelineServer};

/// Tracing target for pipeline listing.
const TRACING_TARGET: &str = "papercast_server::handler::pipelines";

/// Lists registered pipelines sorted by name.
#[tracing::instrument(skip_all)]
async fn list_pipelines(State(server): State<Arc<PipelineServer>>) -> Json<Vec<PipelineInfo>> {
    let pipelines = server.pipelines();
    tracing::debug!(
        target: TRACING_TARGET,
        count = pipelines.len(),
        "Listed pipelines"
    );
    Json(pipelines)
}

/// Describes one pipeline's nodes, ports and edges.
#[tracing::instrument(skip_all)]
async fn read_pipeline(
    State(server): State<Arc<PipelineServer>>,
    Path(name): Path<String>,
) -> Result<Json<PipelineSummary>> {
    let summary = server.describe(&name)?;
    Ok(Json(summary))
}

/// Returns a [`Router`] with all related routes.
pub fn routes() -> Router<ServiceState> {
    Router::new()
        .route("/pipelines", get(list_pipelines))
        .route("/pipelines/{name}", get(read_pipeline))
}

#[cfg(test)]
mod test {
    use axum::http::StatusCode;

    use crate::handler::test::create_test_server;

    #[tokio::test]
    async fn lists_registered_pipelines() -> anyhow::Result<()> {
        let server = create_test_server()?;

        let response = server.get("/pipelines").await;
        response.assert_status_ok();

        let body: serde_json::Value = response.json();
        assert_eq!(body[0]["name"], "default");
        assert_eq!(body[0]["nodes"], 2);
        assert_eq!(body[0]["sinks"][0], "speak");
        Ok(())
    }

    #[tokio::test]
    async fn describes_one_pipeline() -> anyhow::Result<()> {
        let server = create_test_server()?;

        let response = server.get("/pipelines/default").await;
        response.assert_status_ok();

        let body: serde_json::Value = response.json();
        assert_eq!(body["nodes"][0]["name"], "fetch");
        assert_eq!(body["edges"][0]["to"], "speak");

        let missing = server.get("/pipelines/missing").await;
        missing.assert_status(StatusCode::NOT_FOUND);
        Ok(())
    }
}
