//! Named pipeline registry and dispatch.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use futures::future::join_all;
use papercast_runtime::engine::{Engine, RunOptions, RunReport, Seed};
use papercast_runtime::graph::{
    Pipeline, PipelineDefinition, PipelineManifest, PipelineSummary, ProcessorRegistry,
};
use serde::{Deserialize, Serialize};

use crate::TRACING_TARGET;
use crate::error::{ServerError, ServerResult};

/// Outcome of one batch item.
pub type BatchResult = ServerResult<RunReport>;

/// Short description of a registered pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineInfo {
    /// Name the pipeline is registered under.
    pub name: String,
    /// Number of processor nodes.
    pub nodes: usize,
    /// Number of edges.
    pub edges: usize,
    /// Sink node names.
    pub sinks: Vec<String>,
    /// Whether the graph contains a cycle.
    pub cyclic: bool,
}

/// Holds named pipelines and dispatches seeds to them.
///
/// Pipelines are immutable once registered and every dispatch creates fresh
/// run state, so any number of runs may be in flight concurrently. The shared
/// [`Engine`] bounds how many execute at once.
pub struct PipelineServer {
    pipelines: HashMap<String, Arc<Pipeline>>,
    engine: Arc<Engine>,
}

impl PipelineServer {
    /// Creates an empty server around an engine.
    pub fn new(engine: Engine) -> Self {
        Self {
            pipelines: HashMap::new(),
            engine: Arc::new(engine),
        }
    }

    /// Assembles every definition of a manifest and registers it under its
    /// own name.
    pub fn from_manifest(
        manifest: PipelineManifest,
        registry: &ProcessorRegistry,
        engine: Engine,
    ) -> ServerResult<Self> {
        let mut server = Self::new(engine);
        for definition in manifest.pipelines {
            server.register_definition(definition, registry)?;
        }

        Ok(server)
    }

    /// Returns the shared engine.
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Registers a pipeline under a name.
    pub fn register(&mut self, name: impl Into<String>, pipeline: Pipeline) -> ServerResult<()> {
        let name = name.into();
        if self.pipelines.contains_key(&name) {
            return Err(ServerError::DuplicatePipeline(name));
        }

        if pipeline.is_cyclic() {
            tracing::warn!(
                target: TRACING_TARGET,
                pipeline = %name,
                "Pipeline graph contains a cycle, nodes on it may stall"
            );
        }

        tracing::info!(
            target: TRACING_TARGET,
            pipeline = %name,
            nodes = pipeline.node_count(),
            edges = pipeline.edge_count(),
            "Registered pipeline"
        );

        self.pipelines.insert(name, Arc::new(pipeline));
        Ok(())
    }

    /// Assembles a definition and registers it under its own name.
    pub fn register_definition(
        &mut self,
        definition: PipelineDefinition,
        registry: &ProcessorRegistry,
    ) -> ServerResult<()> {
        let name = definition.name.clone();
        if self.pipelines.contains_key(&name) {
            return Err(ServerError::DuplicatePipeline(name));
        }

        let pipeline = Pipeline::from_definition(definition, registry)?;
        self.register(name, pipeline)
    }

    /// Returns whether a pipeline is registered under this name.
    pub fn contains(&self, name: &str) -> bool {
        self.pipelines.contains_key(name)
    }

    /// Returns the pipeline registered under this name.
    pub fn pipeline(&self, name: &str) -> ServerResult<&Pipeline> {
        self.lookup(name).map(Arc::as_ref)
    }

    /// Returns the number of registered pipelines.
    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    /// Returns whether no pipeline is registered.
    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }

    /// Lists registered pipelines sorted by name.
    pub fn pipelines(&self) -> Vec<PipelineInfo> {
        let mut infos: Vec<_> = self
            .pipelines
            .iter()
            .map(|(name, pipeline)| PipelineInfo {
                name: name.clone(),
                nodes: pipeline.node_count(),
                edges: pipeline.edge_count(),
                sinks: pipeline.sinks().into_iter().map(str::to_owned).collect(),
                cyclic: pipeline.is_cyclic(),
            })
            .collect();

        infos.sort_by(|a, b| a.name.cmp(&b.name));
        infos
    }

    /// Describes the nodes, ports and edges of one pipeline.
    pub fn describe(&self, name: &str) -> ServerResult<PipelineSummary> {
        self.lookup(name).map(|pipeline| pipeline.summary())
    }

    /// Runs one seed through a named pipeline.
    pub async fn dispatch(&self, name: &str, seed: Seed) -> ServerResult<RunReport> {
        self.dispatch_with(name, seed, RunOptions::default()).await
    }

    /// Runs one seed through a named pipeline with explicit options.
    pub async fn dispatch_with(
        &self,
        name: &str,
        seed: Seed,
        options: RunOptions,
    ) -> ServerResult<RunReport> {
        let pipeline = self.lookup(name)?;

        tracing::debug!(
            target: TRACING_TARGET,
            pipeline = %name,
            seeded_ports = seed.len(),
            "Dispatching seed"
        );

        self.engine
            .execute(pipeline, seed, options)
            .await
            .map_err(|e| ServerError::dispatch(name, e))
    }

    /// Runs many seeds through one pipeline.
    ///
    /// Items run concurrently up to the engine's run limit. The returned
    /// results line up with `seeds`: a rejected seed fails its own item only.
    pub async fn dispatch_batch(
        &self,
        name: &str,
        seeds: Vec<Seed>,
        options: RunOptions,
    ) -> ServerResult<Vec<BatchResult>> {
        let pipeline = self.lookup(name)?;
        let items = seeds.len();

        tracing::info!(
            target: TRACING_TARGET,
            pipeline = %name,
            items,
            max_concurrent_runs = self.engine.config().max_concurrent_runs,
            "Dispatching batch"
        );

        let handles: Vec<_> = seeds
            .into_iter()
            .map(|seed| {
                let pipeline = Arc::clone(pipeline);
                let engine = Arc::clone(&self.engine);
                let options = options.clone();
                tokio::spawn(async move { engine.execute(&pipeline, seed, options).await })
            })
            .collect();

        let results: Vec<BatchResult> = join_all(handles)
            .await
            .into_iter()
            .map(|joined| match joined {
                Ok(result) => result.map_err(|e| ServerError::dispatch(name, e)),
                Err(e) => Err(ServerError::Aborted {
                    pipeline: name.to_owned(),
                    message: e.to_string(),
                }),
            })
            .collect();

        let complete = results
            .iter()
            .filter(|result| result.as_ref().is_ok_and(RunReport::is_complete))
            .count();

        tracing::info!(
            target: TRACING_TARGET,
            pipeline = %name,
            items,
            complete,
            "Batch finished"
        );

        Ok(results)
    }

    fn lookup(&self, name: &str) -> ServerResult<&Arc<Pipeline>> {
        self.pipelines
            .get(name)
            .ok_or_else(|| ServerError::UnknownPipeline(name.to_owned()))
    }
}

impl fmt::Debug for PipelineServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.pipelines.keys().collect();
        names.sort_unstable();

        f.debug_struct("PipelineServer")
            .field("pipelines", &names)
            .field("engine", &self.engine)
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::time::Duration;

    use papercast_runtime::engine::{EngineConfig, NodeState, RunStatus};
    use papercast_runtime::mock::MockProcessor;
    use papercast_runtime::value::{PortValue, ValueKind};

    use super::*;

    /// `fetch -> speak`, where `fetch` takes a text `id` seed.
    pub(crate) fn podcast_pipeline(delay: Option<Duration>) -> Pipeline {
        let mut fetch = MockProcessor::new()
            .input("id", ValueKind::Text)
            .output("pdf", ValueKind::Path)
            .compute(|inputs| {
                let id = inputs.text("id")?;
                Ok([("pdf".to_owned(), PortValue::path(format!("data/pdfs/{id}.pdf")))].into())
            });
        if let Some(delay) = delay {
            fetch = fetch.delay(delay);
        }

        let speak = MockProcessor::new()
            .input("pdf", ValueKind::Path)
            .output("mp3", ValueKind::Path)
            .returns("mp3", PortValue::path("data/mp3s/out.mp3"));

        let mut pipeline = Pipeline::new("default");
        pipeline.add_processor("fetch", fetch).unwrap();
        pipeline.add_processor("speak", speak).unwrap();
        pipeline.connect("fetch", "pdf", "speak", "pdf").unwrap();
        pipeline
    }

    pub(crate) fn seed(id: &str) -> Seed {
        Seed::new().with("fetch", "id", PortValue::text(id))
    }

    fn server() -> PipelineServer {
        let mut server = PipelineServer::new(Engine::with_defaults());
        server.register("default", podcast_pipeline(None)).unwrap();
        server
    }

    #[tokio::test]
    async fn dispatches_to_named_pipeline() {
        let report = server().dispatch("default", seed("1706.03762")).await.unwrap();

        assert_eq!(report.status, RunStatus::Complete);
        assert_eq!(report.state("speak"), Some(NodeState::Done));
        assert_eq!(
            report.sink_output("speak").and_then(|outputs| outputs.get("mp3")),
            Some(&PortValue::path("data/mp3s/out.mp3"))
        );
    }

    #[test]
    fn rejects_duplicate_names() {
        let mut server = server();
        let error = server
            .register("default", podcast_pipeline(None))
            .unwrap_err();
        assert!(matches!(error, ServerError::DuplicatePipeline(name) if name == "default"));
    }

    #[tokio::test]
    async fn unknown_pipelines_are_errors() {
        let error = server().dispatch("missing", Seed::new()).await.unwrap_err();
        assert!(matches!(error, ServerError::UnknownPipeline(name) if name == "missing"));
    }

    #[tokio::test]
    async fn invalid_seeds_are_classified() {
        let seed = Seed::new().with("fetch", "id", PortValue::Number(3.0));
        let error = server().dispatch("default", seed).await.unwrap_err();
        assert!(matches!(error, ServerError::InvalidSeed { pipeline, .. } if pipeline == "default"));
    }

    #[test]
    fn lists_pipelines_sorted() {
        let mut server = server();
        server.register("batch", podcast_pipeline(None)).unwrap();

        let infos = server.pipelines();
        let names: Vec<_> = infos.iter().map(|info| info.name.as_str()).collect();
        assert_eq!(names, vec!["batch", "default"]);
        assert_eq!(infos[1].nodes, 2);
        assert_eq!(infos[1].edges, 1);
        assert_eq!(infos[1].sinks, vec!["speak".to_owned()]);
        assert!(!infos[1].cyclic);
    }

    #[tokio::test(start_paused = true)]
    async fn batches_keep_order_and_respect_run_limit() {
        let config = EngineConfig::builder()
            .max_concurrent_runs(2_usize)
            .build()
            .unwrap();
        let mut server = PipelineServer::new(Engine::new(config));
        server
            .register("default", podcast_pipeline(Some(Duration::from_millis(100))))
            .unwrap();

        let ids = ["a", "b", "c", "d", "e", "f"];
        let started = tokio::time::Instant::now();
        let results = server
            .dispatch_batch(
                "default",
                ids.iter().map(|id| seed(id)).collect(),
                RunOptions::default(),
            )
            .await
            .unwrap();

        // Six runs, two at a time, each blocked on a 100ms node.
        assert!(started.elapsed() >= Duration::from_millis(300));
        assert_eq!(results.len(), ids.len());
        for (id, result) in ids.iter().zip(&results) {
            let report = result.as_ref().unwrap();
            assert!(report.is_complete());
            let fetched = report.node("fetch").unwrap();
            assert_eq!(
                fetched.outputs.get("pdf"),
                Some(&PortValue::path(format!("data/pdfs/{id}.pdf")))
            );
        }
    }

    #[tokio::test]
    async fn batch_items_fail_independently() {
        let seeds = vec![
            seed("a"),
            Seed::new().with("speak", "missing", PortValue::text("x")),
            seed("c"),
        ];
        let results = server()
            .dispatch_batch("default", seeds, RunOptions::default())
            .await
            .unwrap();

        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(ServerError::InvalidSeed { .. })));
        assert!(results[2].is_ok());
    }
}
