//! Processor nodes.

use std::fmt;

use crate::processor::Processor;
use crate::value::PortSpec;

/// A named processor placed into a pipeline.
///
/// The node owns its processor exclusively. Nodes are immutable once the
/// pipeline is assembled; per-run state lives in the engine.
pub struct ProcessorNode {
    name: String,
    processor: Box<dyn Processor>,
}

impl ProcessorNode {
    /// Creates a node.
    pub fn new(name: impl Into<String>, processor: Box<dyn Processor>) -> Self {
        Self {
            name: name.into(),
            processor,
        }
    }

    /// Returns the node name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the processor.
    #[inline]
    pub fn processor(&self) -> &dyn Processor {
        self.processor.as_ref()
    }

    /// Returns the declaration of an input port.
    pub fn input(&self, port: &str) -> Option<&PortSpec> {
        PortSpec::find(self.processor.inputs(), port)
    }

    /// Returns the declaration of an output port.
    pub fn output(&self, port: &str) -> Option<&PortSpec> {
        PortSpec::find(self.processor.outputs(), port)
    }
}

impl fmt::Debug for ProcessorNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = |specs: &[PortSpec]| -> Vec<String> {
            specs.iter().map(|spec| spec.name.clone()).collect()
        };

        f.debug_struct("ProcessorNode")
            .field("name", &self.name)
            .field("inputs", &names(self.processor.inputs()))
            .field("outputs", &names(self.processor.outputs()))
            .finish()
    }
}
