//! Processor error types.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::error::BoxedError;
use crate::value::ValueKind;

/// Result type for processor operations.
pub type StageResult<T> = Result<T, StageError>;

/// Why a processor could not produce its outputs.
#[derive(Debug, Error)]
pub enum StageError {
    /// A required input port was not bound.
    #[error("missing input port `{0}`")]
    MissingInput(String),

    /// A port carried a value of the wrong kind.
    #[error("port `{port}` expected {expected}, found {found}")]
    KindMismatch {
        /// Offending port.
        port: String,
        /// Declared kind.
        expected: ValueKind,
        /// Kind actually present.
        found: ValueKind,
    },

    /// An upstream artifact referenced by path does not exist.
    #[error("artifact not found: {}", .0.display())]
    ArtifactNotFound(PathBuf),

    /// An external program exited unsuccessfully.
    #[error("command `{program}` failed ({status}): {stderr}")]
    Command {
        /// Program that was invoked.
        program: String,
        /// Exit status as reported by the OS.
        status: String,
        /// Captured standard error, trimmed.
        stderr: String,
    },

    /// The stage exceeded the engine's per-node timeout.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// Filesystem or process I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Any other stage-specific failure.
    #[error("{0}")]
    Other(#[source] BoxedError),
}

impl StageError {
    /// Wraps an arbitrary error or message.
    pub fn other(error: impl Into<BoxedError>) -> Self {
        Self::Other(error.into())
    }
}

/// A processor failure attributed to the node that ran it.
#[derive(Debug, Error)]
#[error("node `{node}` failed: {cause}")]
pub struct ProcessingError {
    /// Name of the failed node.
    pub node: String,
    /// Underlying stage failure.
    #[source]
    pub cause: StageError,
}

impl ProcessingError {
    /// Attributes a stage failure to a node.
    pub fn new(node: impl Into<String>, cause: StageError) -> Self {
        Self {
            node: node.into(),
            cause,
        }
    }
}
