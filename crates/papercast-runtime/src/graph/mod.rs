//! Pipeline graph structures.
//!
//! This module provides the graph representation for pipelines:
//! - [`Pipeline`]: named processor nodes wired together by port-level edges
//! - [`ProcessorNode`]: a named placement of a processor inside a pipeline
//! - [`Edge`]: a binding from one node's output port to another's input port
//! - [`PipelineDefinition`]: serializable, declarative form of a pipeline
//! - [`ProcessorRegistry`]: maps processor kind names to factories

mod definition;
mod edge;
mod node;
mod pipeline;
mod registry;

pub use definition::{NodeDefinition, PipelineDefinition, PipelineManifest};
pub use edge::{Edge, EdgeData};
pub use node::ProcessorNode;
pub use pipeline::{NodeSummary, Pipeline, PipelineSummary};
pub use registry::{ProcessorFactory, ProcessorRegistry};
