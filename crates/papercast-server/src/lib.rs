#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod error;
pub mod extract;
pub mod handler;
mod server;

pub use crate::error::{ServerError, ServerResult};
pub use crate::handler::{ServiceState, routes};
pub use crate::server::{BatchResult, PipelineInfo, PipelineServer};

/// Tracing target for pipeline dispatch.
pub const TRACING_TARGET: &str = "papercast_server";
