#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

pub mod engine;
mod error;
pub mod graph;
pub mod processor;
pub mod value;

#[cfg(any(test, feature = "test-utils"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-utils")))]
pub mod mock;

#[doc(hidden)]
pub mod prelude;

pub use error::{BoxedError, PipelineError, PipelineResult, PortDirection};

/// Tracing target for runtime operations.
pub const TRACING_TARGET: &str = "papercast_runtime";
