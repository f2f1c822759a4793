//! Pipeline execution engine.
//!
//! This module provides the runtime for executing pipelines:
//! - [`Engine`]: runs one seed through a pipeline in waves
//! - [`EngineConfig`]: concurrency limits and the per-node timeout
//! - [`Seed`]: the values bound before a run starts
//! - [`RunReport`]: the per-node outcome of a run

mod config;
mod executor;
mod report;
mod seed;
mod state;

pub use config::{EngineConfig, EngineConfigBuilder, EngineConfigBuilderError};
pub use executor::{Engine, RunOptions};
pub use report::{NodeReason, NodeReport, NodeState, RunId, RunReport, RunStatus};
pub use seed::{Seed, SeedValue};
