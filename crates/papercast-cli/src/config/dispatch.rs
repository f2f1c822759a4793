//! Engine limits and pipeline loading.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use clap::Args;
use papercast_runtime::engine::{Engine, EngineConfig};
use papercast_runtime::graph::PipelineManifest;
use papercast_server::PipelineServer;
use serde::{Deserialize, Serialize};

use crate::TRACING_TARGET_CONFIG;

/// Engine limits and timeouts.
///
/// # Environment Variables
///
/// - `MAX_CONCURRENT_RUNS` - Runs executing at once (default: 10)
/// - `MAX_CONCURRENT_NODES` - Nodes executing at once within a run (default: 4)
/// - `NODE_TIMEOUT` - Upper bound on one processor invocation in seconds
#[derive(Debug, Clone, Args, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Maximum number of pipeline runs executing at once.
    #[arg(long, global = true, env = "MAX_CONCURRENT_RUNS", default_value_t = 10)]
    pub max_concurrent_runs: usize,

    /// Maximum number of nodes executing at once within one run.
    #[arg(long, global = true, env = "MAX_CONCURRENT_NODES", default_value_t = 4)]
    pub max_concurrent_nodes: usize,

    /// Upper bound on a single processor invocation, in seconds.
    #[arg(long, global = true, env = "NODE_TIMEOUT")]
    pub node_timeout: Option<u64>,
}

impl DispatchConfig {
    /// Builds the engine configuration.
    pub fn engine_config(&self) -> anyhow::Result<EngineConfig> {
        EngineConfig::builder()
            .max_concurrent_runs(self.max_concurrent_runs)
            .max_concurrent_nodes(self.max_concurrent_nodes)
            .node_timeout(self.node_timeout.map(Duration::from_secs))
            .build()
            .context("invalid engine configuration")
    }

    /// Validates all configuration values.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.engine_config().map(|_| ())
    }

    /// Reads a pipeline manifest and registers every pipeline in it with the
    /// built-in processor kinds.
    pub async fn load(&self, manifest: &Path) -> anyhow::Result<PipelineServer> {
        let json = tokio::fs::read_to_string(manifest)
            .await
            .with_context(|| format!("failed to read pipeline manifest {}", manifest.display()))?;
        let parsed = PipelineManifest::from_json(&json)
            .with_context(|| format!("failed to parse pipeline manifest {}", manifest.display()))?;

        let registry = papercast_stages::builtin_registry();
        let engine = Engine::new(self.engine_config()?);
        let server = PipelineServer::from_manifest(parsed, &registry, engine)
            .with_context(|| format!("invalid pipeline manifest {}", manifest.display()))?;

        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            manifest = %manifest.display(),
            pipelines = server.len(),
            "Pipelines loaded"
        );

        Ok(server)
    }

    /// Logs dispatch configuration.
    pub fn log(&self, manifest: &Path) {
        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            manifest = %manifest.display(),
            max_concurrent_runs = self.max_concurrent_runs,
            max_concurrent_nodes = self.max_concurrent_nodes,
            node_timeout_secs = ?self.node_timeout,
            "Dispatch configured"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> DispatchConfig {
        DispatchConfig {
            max_concurrent_runs: 2,
            max_concurrent_nodes: 1,
            node_timeout: Some(5),
        }
    }

    #[test]
    fn builds_engine_config() {
        let engine = config().engine_config().unwrap();
        assert_eq!(engine.max_concurrent_runs, 2);
        assert_eq!(engine.node_timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn rejects_zero_limits() {
        let config = DispatchConfig {
            max_concurrent_runs: 0,
            ..config()
        };
        assert!(config.validate().is_err());
    }

    #[tokio::test]
    async fn loads_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipelines.json");
        std::fs::write(
            &path,
            serde_json::json!({
                "pipelines": [{
                    "name": "text",
                    "nodes": [
                        { "name": "file", "kind": "local_file", "params": { "port": "txt" } },
                        { "name": "read", "kind": "read_text" }
                    ],
                    "edges": [
                        { "from": "file", "from_port": "txt", "to": "read", "to_port": "path" }
                    ]
                }]
            })
            .to_string(),
        )
        .unwrap();

        let server = config().load(&path).await.unwrap();
        assert!(server.contains("text"));

        assert!(config().load(&dir.path().join("missing.json")).await.is_err());
    }
}
