//! Run and batch dispatch handlers.

use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::routing::post;
use papercast_runtime::engine::RunReport;

use super::request::{CreateBatch, CreateRun};
use super::response::Batch;
use crate::PipelineServer;
use crate::extract::{Json, Path};
use crate::handler::{Result, ServiceState};

/// Tracing target for run dispatch.
const TRACING_TARGET: &str = "papercast_server::handler::runs";

/// Runs one seed through a pipeline and returns its report.
#[tracing::instrument(skip_all)]
async fn create_run(
    State(server): State<Arc<PipelineServer>>,
    Path(name): Path<String>,
    Json(request): Json<CreateRun>,
) -> Result<Json<RunReport>> {
    let options = request.options();
    let report = server.dispatch_with(&name, request.seed, options).await?;

    tracing::info!(
        target: TRACING_TARGET,
        pipeline = %name,
        run_id = %report.run_id,
        status = %report.status,
        "Run finished"
    );

    Ok(Json(report))
}

/// Runs a batch of seeds through a pipeline.
#[tracing::instrument(skip_all)]
async fn create_batch(
    State(server): State<Arc<PipelineServer>>,
    Path(name): Path<String>,
    Json(request): Json<CreateBatch>,
) -> Result<Json<Batch>> {
    let options = request.options();
    let results = server.dispatch_batch(&name, request.items, options).await?;

    tracing::debug!(
        target: TRACING_TARGET,
        pipeline = %name,
        items = results.len(),
        "Batch finished"
    );

    Ok(Json(results.into_iter().collect()))
}

/// Returns a [`Router`] with all related routes.
pub fn routes() -> Router<ServiceState> {
    Router::new()
        .route("/pipelines/{name}/runs", post(create_run))
        .route("/pipelines/{name}/batches", post(create_batch))
}
