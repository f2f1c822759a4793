//! Declarative pipeline definitions.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::edge::Edge;
use crate::error::PipelineResult;

/// Serializable pipeline definition.
///
/// Describes a pipeline as data: processor nodes by kind and parameters,
/// port-level edges, and optional sinks. Swapping one stage for another
/// only touches the affected node entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineDefinition {
    /// Pipeline name used for dispatch.
    pub name: String,
    /// Nodes in declaration order.
    pub nodes: Vec<NodeDefinition>,
    /// Edges in declaration order.
    #[serde(default)]
    pub edges: Vec<Edge>,
    /// Sink node names. Empty means every node without outgoing edges.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sinks: Vec<String>,
}

/// A node entry in a [`PipelineDefinition`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDefinition {
    /// Node name, unique within the pipeline.
    pub name: String,
    /// Processor kind looked up in the registry.
    pub kind: String,
    /// Processor-specific parameters.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub params: Value,
}

impl NodeDefinition {
    /// Creates a node definition without parameters.
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            params: Value::Null,
        }
    }

    /// Sets the processor parameters.
    pub fn with_params(mut self, params: Value) -> Self {
        self.params = params;
        self
    }
}

/// A set of pipeline definitions loaded together, e.g. from one file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineManifest {
    /// Pipelines to register.
    pub pipelines: Vec<PipelineDefinition>,
}

impl PipelineManifest {
    /// Parses a manifest from JSON.
    pub fn from_json(json: &str) -> PipelineResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_manifest_with_defaults() {
        let manifest = PipelineManifest::from_json(
            &json!({
                "pipelines": [{
                    "name": "default",
                    "nodes": [
                        { "name": "pdf", "kind": "local_file" },
                        { "name": "say", "kind": "command", "params": { "program": "say" } }
                    ],
                    "edges": [
                        { "from": "pdf", "from_port": "pdf", "to": "say", "to_port": "pdf" }
                    ]
                }]
            })
            .to_string(),
        )
        .unwrap();

        let definition = &manifest.pipelines[0];
        assert_eq!(definition.name, "default");
        assert!(definition.sinks.is_empty());
        assert!(definition.nodes[0].params.is_null());
        assert_eq!(definition.edges[0], Edge::new("pdf", "pdf", "say", "pdf"));
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(PipelineManifest::from_json("{ \"pipelines\": 3 }").is_err());
    }
}
