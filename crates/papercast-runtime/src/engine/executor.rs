//! Pipeline execution engine.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::StreamExt;
use futures::stream;
use jiff::Timestamp;
use petgraph::graph::NodeIndex;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use super::EngineConfig;
use super::report::{RunId, RunReport, RunStatus, millis};
use super::seed::Seed;
use super::state::RunState;
use crate::error::{PipelineError, PipelineResult};
use crate::graph::{Pipeline, ProcessorNode};
use crate::processor::{Inputs, ProcessingError, StageError, StageResult};
use crate::value::PortMap;

/// Tracing target for engine operations.
const TRACING_TARGET: &str = "papercast_runtime::engine";

/// Per-run options.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Ignore reusable artifacts and invoke every processor.
    pub force: bool,
    /// Token that abandons the run when cancelled.
    pub cancel: CancellationToken,
}

impl RunOptions {
    /// Creates default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether reusable artifacts are ignored.
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Sets the cancellation token.
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Result of one processor invocation within a wave.
struct NodeOutcome {
    index: NodeIndex,
    result: StageResult<(PortMap, bool)>,
    elapsed: Duration,
}

/// The pipeline execution engine.
///
/// Runs one seed through a pipeline in waves: every ready node of a wave
/// executes concurrently, then outputs propagate along edges before the next
/// readiness scan. The engine keeps no state between runs.
pub struct Engine {
    config: EngineConfig,
    semaphore: Arc<Semaphore>,
}

impl Engine {
    /// Creates a new engine with the given configuration.
    pub fn new(config: EngineConfig) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.max_concurrent_runs));

        tracing::info!(
            target: TRACING_TARGET,
            max_concurrent_runs = config.max_concurrent_runs,
            max_concurrent_nodes = config.max_concurrent_nodes,
            node_timeout_ms = config.node_timeout.map(millis),
            "Pipeline engine initialized"
        );

        Self { config, semaphore }
    }

    /// Creates a new engine with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(EngineConfig::default())
    }

    /// Returns the engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Returns the number of available run slots.
    pub fn available_slots(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Runs a seed through a pipeline with default options.
    pub async fn run(&self, pipeline: &Pipeline, seed: Seed) -> PipelineResult<RunReport> {
        self.execute(pipeline, seed, RunOptions::default()).await
    }

    /// Runs a seed through a pipeline.
    ///
    /// Fails only when the seed does not fit the pipeline. Processor
    /// failures, stalls and cancellation are reported in the [`RunReport`].
    pub async fn execute(
        &self,
        pipeline: &Pipeline,
        seed: Seed,
        options: RunOptions,
    ) -> PipelineResult<RunReport> {
        seed.validate(pipeline)?;

        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|e| PipelineError::Internal(format!("semaphore closed: {e}")))?;

        let run_id = RunId::new();
        let started_at = Timestamp::now();
        let started = Instant::now();

        tracing::info!(
            target: TRACING_TARGET,
            run_id = %run_id,
            pipeline = %pipeline.name(),
            seeded_ports = seed.len(),
            force = options.force,
            "Starting pipeline run"
        );

        let mut state = RunState::new(pipeline, seed);
        let mut cancelled = false;
        let mut waves = 0usize;

        loop {
            state.settle_skips();

            if options.cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            let wave = state.ready_nodes();
            if wave.is_empty() {
                break;
            }

            waves += 1;
            tracing::debug!(
                target: TRACING_TARGET,
                run_id = %run_id,
                wave = waves,
                nodes = wave.len(),
                "Running wave"
            );

            let jobs: Vec<(NodeIndex, Inputs)> = wave
                .iter()
                .map(|index| (*index, state.inputs(*index)))
                .collect();
            state.mark_running(&wave);

            let (mut outcomes, interrupted) = self.run_wave(pipeline, jobs, &options).await;
            outcomes.sort_by_key(|outcome| outcome.index);

            for outcome in outcomes {
                let name = pipeline.graph()[outcome.index].name();
                let elapsed_ms = millis(outcome.elapsed);

                match outcome.result {
                    Ok((outputs, reused)) => {
                        tracing::debug!(
                            target: TRACING_TARGET,
                            run_id = %run_id,
                            node = %name,
                            reused,
                            elapsed_ms,
                            "Node completed"
                        );
                        state.complete(outcome.index, outputs, reused, outcome.elapsed);
                    }
                    Err(cause) => {
                        let error = ProcessingError::new(name, cause);
                        tracing::warn!(
                            target: TRACING_TARGET,
                            run_id = %run_id,
                            node = %name,
                            elapsed_ms,
                            error = %error,
                            "Node failed"
                        );
                        state.fail(outcome.index, error.cause.to_string(), outcome.elapsed);
                    }
                }
            }

            if interrupted {
                state.abandon_running();
                cancelled = true;
                break;
            }

            state.propagate(&wave);
        }

        let status = if cancelled {
            RunStatus::Cancelled
        } else if state.sinks_done() {
            RunStatus::Complete
        } else {
            RunStatus::Stalled
        };

        tracing::info!(
            target: TRACING_TARGET,
            run_id = %run_id,
            pipeline = %pipeline.name(),
            status = %status,
            waves,
            elapsed_ms = millis(started.elapsed()),
            "Pipeline run finished"
        );

        Ok(state.finish(run_id, status, started_at))
    }

    /// Runs one wave, stopping early if the run is cancelled.
    ///
    /// Returns the outcomes collected so far and whether the wave was
    /// interrupted.
    async fn run_wave(
        &self,
        pipeline: &Pipeline,
        jobs: Vec<(NodeIndex, Inputs)>,
        options: &RunOptions,
    ) -> (Vec<NodeOutcome>, bool) {
        let force = options.force;
        let mut pending = std::pin::pin!(
            stream::iter(jobs)
                .map(|(index, inputs)| self.run_node(pipeline, index, inputs, force))
                .buffer_unordered(self.config.max_concurrent_nodes)
        );

        let mut outcomes = Vec::new();
        loop {
            tokio::select! {
                biased;
                () = options.cancel.cancelled() => return (outcomes, true),
                next = pending.next() => match next {
                    Some(outcome) => outcomes.push(outcome),
                    None => return (outcomes, false),
                },
            }
        }
    }

    async fn run_node(
        &self,
        pipeline: &Pipeline,
        index: NodeIndex,
        inputs: Inputs,
        force: bool,
    ) -> NodeOutcome {
        let node = &pipeline.graph()[index];
        let started = Instant::now();

        let result = match self.invoke(node, &inputs, force).await {
            Ok((outputs, reused)) => accept_outputs(node, outputs).map(|outputs| (outputs, reused)),
            Err(e) => Err(e),
        };

        NodeOutcome {
            index,
            result,
            elapsed: started.elapsed(),
        }
    }

    /// Calls `reuse` unless forced, then `run` under the node timeout.
    async fn invoke(
        &self,
        node: &ProcessorNode,
        inputs: &Inputs,
        force: bool,
    ) -> StageResult<(PortMap, bool)> {
        let processor = node.processor();

        if !force && let Some(outputs) = processor.reuse(inputs).await? {
            tracing::debug!(
                target: TRACING_TARGET,
                node = %node.name(),
                "Reusing existing artifact"
            );
            return Ok((outputs, true));
        }

        tracing::trace!(
            target: TRACING_TARGET,
            node = %node.name(),
            inputs = inputs.len(),
            "Invoking processor"
        );

        let outputs = match self.config.node_timeout {
            Some(limit) => tokio::time::timeout(limit, processor.run(inputs))
                .await
                .map_err(|_| StageError::Timeout(limit))??,
            None => processor.run(inputs).await?,
        };

        Ok((outputs, false))
    }
}

/// Drops undeclared outputs and rejects values of the wrong kind.
fn accept_outputs(node: &ProcessorNode, outputs: PortMap) -> StageResult<PortMap> {
    let mut accepted = PortMap::new();

    for (port, value) in outputs {
        let Some(spec) = node.output(&port) else {
            tracing::warn!(
                target: TRACING_TARGET,
                node = %node.name(),
                port = %port,
                "Dropping undeclared output"
            );
            continue;
        };

        let found = value.kind();
        if !spec.kind.accepts(found) {
            return Err(StageError::KindMismatch {
                port,
                expected: spec.kind,
                found,
            });
        }

        accepted.insert(port, value);
    }

    Ok(accepted)
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("available_slots", &self.available_slots())
            .finish()
    }
}
