//! Prelude module for convenient imports.
//!
//! This module re-exports commonly used types for ergonomic imports:
//!
//! ```rust
//! use papercast_runtime::prelude::*;
//! ```

pub use crate::engine::{Engine, EngineConfig, NodeState, RunOptions, RunReport, RunStatus, Seed};
pub use crate::error::{PipelineError, PipelineResult};
pub use crate::graph::{Edge, Pipeline, PipelineDefinition, ProcessorRegistry};
pub use crate::processor::{Inputs, Processor, StageError, StageResult};
pub use crate::value::{PortMap, PortSpec, PortValue, ValueKind};
