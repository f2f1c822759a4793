//! Initial values bound before a run starts.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, PipelineResult};
use crate::graph::Pipeline;
use crate::value::PortValue;

/// A value bound to one input port of one node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedValue {
    /// Target node.
    pub node: String,
    /// Target input port.
    pub port: String,
    /// Bound value.
    pub value: PortValue,
}

/// The input item handed to a pipeline run.
///
/// Seeds are usually addressed to source nodes, but any input port may be
/// seeded. A seeded port counts as the first arrival and is never replaced
/// by values propagated along edges.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Seed {
    values: Vec<SeedValue>,
}

impl Seed {
    /// Creates an empty seed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a value and returns the seed.
    pub fn with(
        mut self,
        node: impl Into<String>,
        port: impl Into<String>,
        value: impl Into<PortValue>,
    ) -> Self {
        self.insert(node, port, value);
        self
    }

    /// Adds a value.
    pub fn insert(
        &mut self,
        node: impl Into<String>,
        port: impl Into<String>,
        value: impl Into<PortValue>,
    ) {
        self.values.push(SeedValue {
            node: node.into(),
            port: port.into(),
            value: value.into(),
        });
    }

    /// Iterates over seeded values in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &SeedValue> {
        self.values.iter()
    }

    /// Returns the number of seeded values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns whether nothing is seeded.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Checks every value against the pipeline's declared input ports.
    ///
    /// Rejects unknown nodes, undeclared ports, incompatible kinds and
    /// ports seeded more than once.
    pub fn validate(&self, pipeline: &Pipeline) -> PipelineResult<()> {
        let mut seen = HashSet::new();

        for seed in &self.values {
            let Some(node) = pipeline.node(&seed.node) else {
                return Err(PipelineError::invalid_seed(
                    &seed.node,
                    &seed.port,
                    "node does not exist",
                ));
            };

            let Some(spec) = node.input(&seed.port) else {
                return Err(PipelineError::invalid_seed(
                    &seed.node,
                    &seed.port,
                    "node has no such input port",
                ));
            };

            let found = seed.value.kind();
            if !spec.kind.accepts(found) {
                return Err(PipelineError::invalid_seed(
                    &seed.node,
                    &seed.port,
                    format!("expected {}, found {found}", spec.kind),
                ));
            }

            if !seen.insert((seed.node.as_str(), seed.port.as_str())) {
                return Err(PipelineError::invalid_seed(
                    &seed.node,
                    &seed.port,
                    "port is seeded more than once",
                ));
            }
        }

        Ok(())
    }
}

impl FromIterator<SeedValue> for Seed {
    fn from_iter<I: IntoIterator<Item = SeedValue>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Seed {
    type IntoIter = std::vec::IntoIter<SeedValue>;
    type Item = SeedValue;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockProcessor;
    use crate::value::ValueKind;

    fn pipeline() -> Pipeline {
        let mut pipeline = Pipeline::new("default");
        pipeline
            .add_processor(
                "fetch",
                MockProcessor::new()
                    .input("id", ValueKind::Text)
                    .output("pdf", ValueKind::Path),
            )
            .unwrap();
        pipeline
    }

    #[test]
    fn accepts_declared_ports() {
        let seed = Seed::new().with("fetch", "id", "2401.00001");
        assert!(seed.validate(&pipeline()).is_ok());
    }

    #[test]
    fn rejects_unknown_targets_and_kinds() {
        let pipeline = pipeline();

        let unknown_node = Seed::new().with("missing", "id", "x");
        let unknown_port = Seed::new().with("fetch", "doi", "x");
        let wrong_kind = Seed::new().with("fetch", "id", PortValue::Number(1.0));

        for seed in [unknown_node, unknown_port, wrong_kind] {
            let error = seed.validate(&pipeline).unwrap_err();
            assert!(error.is_invalid_seed(), "{error}");
        }
    }

    #[test]
    fn rejects_duplicate_ports() {
        let seed = Seed::new()
            .with("fetch", "id", "a")
            .with("fetch", "id", "b");
        assert!(seed.validate(&pipeline()).unwrap_err().is_invalid_seed());
    }

    #[test]
    fn serializes_as_a_list() {
        let seed = Seed::new().with("fetch", "id", "a");
        let json = serde_json::to_value(&seed).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                { "node": "fetch", "port": "id", "value": { "kind": "text", "value": "a" } }
            ])
        );
    }
}
