//! Pipeline graph representation.

use std::collections::HashMap;

use petgraph::Direction;
use petgraph::algo::is_cyclic_directed;
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};

use super::definition::PipelineDefinition;
use super::edge::{Edge, EdgeData};
use super::node::ProcessorNode;
use super::registry::ProcessorRegistry;
use crate::TRACING_TARGET;
use crate::error::{PipelineError, PipelineResult, PortDirection};
use crate::processor::Processor;
use crate::value::PortSpec;

/// A named graph of processor nodes connected by port-level edges.
///
/// Internally uses petgraph's `DiGraph`, which keeps nodes and edges in
/// insertion order. The engine relies on that order for its tie-breaks, so
/// nodes and edges are never removed once added.
#[derive(Debug)]
pub struct Pipeline {
    name: String,
    graph: DiGraph<ProcessorNode, EdgeData>,
    node_indices: HashMap<String, NodeIndex>,
    sinks: Vec<NodeIndex>,
}

impl Pipeline {
    /// Creates an empty pipeline.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            graph: DiGraph::new(),
            node_indices: HashMap::new(),
            sinks: Vec::new(),
        }
    }

    /// Assembles a pipeline from a declarative definition.
    ///
    /// Nodes are created through the registry in definition order, then every
    /// edge is connected and validated, then sinks are set.
    pub fn from_definition(
        definition: PipelineDefinition,
        registry: &ProcessorRegistry,
    ) -> PipelineResult<Self> {
        let mut pipeline = Self::new(definition.name);

        for node in definition.nodes {
            let processor = registry.create(&node.name, &node.kind, &node.params)?;
            pipeline.add_boxed(node.name, processor)?;
        }

        for edge in definition.edges {
            pipeline.add_edge(edge)?;
        }

        if !definition.sinks.is_empty() {
            pipeline.set_sinks(definition.sinks)?;
        }

        Ok(pipeline)
    }

    /// Returns the pipeline name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the number of nodes.
    #[inline]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns the number of edges.
    #[inline]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Returns whether the pipeline has no nodes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Adds a processor under a unique node name.
    pub fn add_processor(
        &mut self,
        name: impl Into<String>,
        processor: impl Processor,
    ) -> PipelineResult<()> {
        self.add_boxed(name, Box::new(processor))
    }

    /// Adds an already boxed processor under a unique node name.
    pub fn add_boxed(
        &mut self,
        name: impl Into<String>,
        processor: Box<dyn Processor>,
    ) -> PipelineResult<()> {
        let name = name.into();
        if self.node_indices.contains_key(&name) {
            return Err(PipelineError::DuplicateNode(name));
        }

        let index = self
            .graph
            .add_node(ProcessorNode::new(name.clone(), processor));
        self.node_indices.insert(name, index);
        Ok(())
    }

    /// Connects an output port of one node to an input port of another.
    ///
    /// Both nodes must exist, both ports must be declared on the respective
    /// side, and the port kinds must be compatible.
    pub fn connect(
        &mut self,
        from: impl Into<String>,
        from_port: impl Into<String>,
        to: impl Into<String>,
        to_port: impl Into<String>,
    ) -> PipelineResult<()> {
        self.add_edge(Edge::new(from, from_port, to, to_port))
    }

    /// Adds a validated edge.
    pub fn add_edge(&mut self, edge: Edge) -> PipelineResult<()> {
        let from_index = self.index_of(&edge.from)?;
        let to_index = self.index_of(&edge.to)?;

        let source = &self.graph[from_index];
        let output = source
            .output(&edge.from_port)
            .ok_or_else(|| PipelineError::UnknownPort {
                node: edge.from.clone(),
                port: edge.from_port.clone(),
                direction: PortDirection::Output,
            })?;

        let target = &self.graph[to_index];
        let input = target
            .input(&edge.to_port)
            .ok_or_else(|| PipelineError::UnknownPort {
                node: edge.to.clone(),
                port: edge.to_port.clone(),
                direction: PortDirection::Input,
            })?;

        if !input.kind.accepts(output.kind) {
            return Err(PipelineError::KindMismatch {
                from: format!("{}.{}", edge.from, edge.from_port),
                from_kind: output.kind,
                to: format!("{}.{}", edge.to, edge.to_port),
                to_kind: input.kind,
            });
        }

        tracing::trace!(
            target: TRACING_TARGET,
            pipeline = %self.name,
            edge = %edge,
            "Connected ports"
        );

        self.graph.add_edge(
            from_index,
            to_index,
            EdgeData {
                from_port: edge.from_port,
                to_port: edge.to_port,
            },
        );
        Ok(())
    }

    /// Designates the nodes whose completion defines a complete run.
    ///
    /// Without explicit sinks, every node without outgoing edges is a sink.
    pub fn set_sinks<I, S>(&mut self, sinks: I) -> PipelineResult<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let sinks = sinks
            .into_iter()
            .map(|name| self.index_of(name.as_ref()))
            .collect::<PipelineResult<Vec<_>>>()?;

        self.sinks = sinks;
        Ok(())
    }

    /// Returns the sink node names.
    pub fn sinks(&self) -> Vec<&str> {
        self.sink_indices()
            .into_iter()
            .map(|index| self.graph[index].name())
            .collect()
    }

    /// Returns the node with the given name.
    pub fn node(&self, name: &str) -> Option<&ProcessorNode> {
        let index = self.node_indices.get(name)?;
        self.graph.node_weight(*index)
    }

    /// Returns whether a node exists.
    pub fn contains_node(&self, name: &str) -> bool {
        self.node_indices.contains_key(name)
    }

    /// Returns all nodes in declaration order.
    pub fn nodes(&self) -> impl Iterator<Item = &ProcessorNode> {
        self.graph.node_weights()
    }

    /// Returns all edges in declaration order.
    pub fn edges(&self) -> impl Iterator<Item = Edge> + '_ {
        self.graph.edge_references().map(|edge_ref| {
            self.edge_from_ref(edge_ref.source(), edge_ref.target(), edge_ref.weight())
        })
    }

    /// Returns the edges feeding a node, in declaration order.
    pub fn incoming_edges(&self, name: &str) -> Vec<Edge> {
        let Some(&index) = self.node_indices.get(name) else {
            return Vec::new();
        };

        let mut edges: Vec<_> = self
            .graph
            .edges_directed(index, Direction::Incoming)
            .collect();
        edges.sort_by_key(|edge_ref| edge_ref.id());

        edges
            .into_iter()
            .map(|edge_ref| {
                self.edge_from_ref(edge_ref.source(), edge_ref.target(), edge_ref.weight())
            })
            .collect()
    }

    /// Returns nodes without incoming edges; their inputs must be seeded.
    pub fn sources(&self) -> Vec<&str> {
        self.graph
            .node_indices()
            .filter(|index| {
                self.graph
                    .edges_directed(*index, Direction::Incoming)
                    .next()
                    .is_none()
            })
            .map(|index| self.graph[index].name())
            .collect()
    }

    /// Returns the declaration of a node's input port.
    pub fn input_spec(&self, node: &str, port: &str) -> PipelineResult<&PortSpec> {
        let index = self.index_of(node)?;
        self.graph[index]
            .input(port)
            .ok_or_else(|| PipelineError::UnknownPort {
                node: node.to_owned(),
                port: port.to_owned(),
                direction: PortDirection::Input,
            })
    }

    /// Returns whether the graph contains a cycle.
    ///
    /// Cycles are accepted at assembly time. A cycle among required inputs
    /// can never become ready and shows up as a stall at run time.
    pub fn is_cyclic(&self) -> bool {
        is_cyclic_directed(&self.graph)
    }

    /// Returns a serializable summary of the pipeline's shape.
    pub fn summary(&self) -> PipelineSummary {
        PipelineSummary {
            name: self.name.clone(),
            nodes: self
                .nodes()
                .map(|node| NodeSummary {
                    name: node.name().to_owned(),
                    inputs: node.processor().inputs().to_vec(),
                    outputs: node.processor().outputs().to_vec(),
                })
                .collect(),
            edges: self.edges().collect(),
            sinks: self.sinks().into_iter().map(str::to_owned).collect(),
        }
    }

    /// Returns the underlying graph.
    pub(crate) fn graph(&self) -> &DiGraph<ProcessorNode, EdgeData> {
        &self.graph
    }

    /// Returns the node index for a name.
    pub(crate) fn index_of(&self, name: &str) -> PipelineResult<NodeIndex> {
        self.node_indices
            .get(name)
            .copied()
            .ok_or_else(|| PipelineError::UnknownNode(name.to_owned()))
    }

    /// Returns explicit sinks, or every node without outgoing edges.
    pub(crate) fn sink_indices(&self) -> Vec<NodeIndex> {
        if !self.sinks.is_empty() {
            return self.sinks.clone();
        }

        self.graph
            .node_indices()
            .filter(|index| {
                self.graph
                    .edges_directed(*index, Direction::Outgoing)
                    .next()
                    .is_none()
            })
            .collect()
    }

    /// Returns every edge with its index, in declaration order.
    pub(crate) fn indexed_edges(
        &self,
    ) -> impl Iterator<Item = (EdgeIndex, NodeIndex, NodeIndex, &EdgeData)> {
        self.graph.edge_references().map(|edge_ref| {
            (
                edge_ref.id(),
                edge_ref.source(),
                edge_ref.target(),
                edge_ref.weight(),
            )
        })
    }

    fn edge_from_ref(&self, source: NodeIndex, target: NodeIndex, data: &EdgeData) -> Edge {
        Edge {
            from: self.graph[source].name().to_owned(),
            from_port: data.from_port.clone(),
            to: self.graph[target].name().to_owned(),
            to_port: data.to_port.clone(),
        }
    }
}

/// Serializable description of a pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineSummary {
    /// Pipeline name.
    pub name: String,
    /// Nodes in declaration order.
    pub nodes: Vec<NodeSummary>,
    /// Edges in declaration order.
    pub edges: Vec<Edge>,
    /// Sink node names.
    pub sinks: Vec<String>,
}

/// Serializable description of a node's ports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSummary {
    /// Node name.
    pub name: String,
    /// Declared input ports.
    pub inputs: Vec<PortSpec>,
    /// Declared output ports.
    pub outputs: Vec<PortSpec>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockProcessor;
    use crate::value::ValueKind;

    fn fetch() -> MockProcessor {
        MockProcessor::new()
            .input("id", ValueKind::Text)
            .output("pdf", ValueKind::Path)
    }

    fn extract() -> MockProcessor {
        MockProcessor::new()
            .input("pdf", ValueKind::Path)
            .output("text", ValueKind::Text)
            .output("title", ValueKind::Text)
    }

    #[test]
    fn rejects_duplicate_node_names() {
        let mut pipeline = Pipeline::new("default");
        pipeline.add_processor("fetch", fetch()).unwrap();
        let error = pipeline.add_processor("fetch", fetch()).unwrap_err();
        assert!(matches!(error, PipelineError::DuplicateNode(name) if name == "fetch"));
    }

    #[test]
    fn connect_validates_nodes_and_ports() {
        let mut pipeline = Pipeline::new("default");
        pipeline.add_processor("fetch", fetch()).unwrap();
        pipeline.add_processor("extract", extract()).unwrap();

        assert!(matches!(
            pipeline.connect("fetch", "pdf", "missing", "pdf"),
            Err(PipelineError::UnknownNode(name)) if name == "missing"
        ));
        assert!(matches!(
            pipeline.connect("fetch", "text", "extract", "pdf"),
            Err(PipelineError::UnknownPort { direction: PortDirection::Output, .. })
        ));
        assert!(matches!(
            pipeline.connect("fetch", "pdf", "extract", "text"),
            Err(PipelineError::UnknownPort { direction: PortDirection::Input, .. })
        ));
        assert_eq!(pipeline.edge_count(), 0);

        pipeline.connect("fetch", "pdf", "extract", "pdf").unwrap();
        assert_eq!(pipeline.edge_count(), 1);
    }

    #[test]
    fn connect_rejects_incompatible_kinds() {
        let mut pipeline = Pipeline::new("default");
        pipeline.add_processor("extract", extract()).unwrap();
        pipeline.add_processor("again", extract()).unwrap();

        let error = pipeline
            .connect("extract", "text", "again", "pdf")
            .unwrap_err();
        assert!(matches!(
            error,
            PipelineError::KindMismatch { from_kind: ValueKind::Text, to_kind: ValueKind::Path, .. }
        ));
    }

    #[test]
    fn default_sinks_are_nodes_without_outgoing_edges() {
        let mut pipeline = Pipeline::new("default");
        pipeline.add_processor("fetch", fetch()).unwrap();
        pipeline.add_processor("extract", extract()).unwrap();
        pipeline.connect("fetch", "pdf", "extract", "pdf").unwrap();

        assert_eq!(pipeline.sinks(), vec!["extract"]);
        assert_eq!(pipeline.sources(), vec!["fetch"]);

        pipeline.set_sinks(["fetch"]).unwrap();
        assert_eq!(pipeline.sinks(), vec!["fetch"]);
        assert!(pipeline.set_sinks(["publish"]).is_err());
    }

    #[test]
    fn incoming_edges_keep_declaration_order() {
        let mut pipeline = Pipeline::new("default");
        pipeline.add_processor("semantic_scholar", fetch()).unwrap();
        pipeline.add_processor("arxiv", fetch()).unwrap();
        pipeline.add_processor("grobid", extract()).unwrap();
        pipeline
            .connect("semantic_scholar", "pdf", "grobid", "pdf")
            .unwrap();
        pipeline.connect("arxiv", "pdf", "grobid", "pdf").unwrap();

        let sources: Vec<_> = pipeline
            .incoming_edges("grobid")
            .into_iter()
            .map(|edge| edge.from)
            .collect();
        assert_eq!(sources, vec!["semantic_scholar", "arxiv"]);
    }

    #[test]
    fn detects_cycles() {
        let node = || {
            MockProcessor::new()
                .input("in", ValueKind::Text)
                .output("out", ValueKind::Text)
        };

        let mut pipeline = Pipeline::new("loop");
        pipeline.add_processor("a", node()).unwrap();
        pipeline.add_processor("b", node()).unwrap();
        pipeline.connect("a", "out", "b", "in").unwrap();
        assert!(!pipeline.is_cyclic());

        pipeline.connect("b", "out", "a", "in").unwrap();
        assert!(pipeline.is_cyclic());
    }
}
