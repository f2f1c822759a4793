//! Pipeline error types.

use strum::{AsRefStr, Display};
use thiserror::Error;

use crate::value::ValueKind;

/// Type alias for boxed dynamic errors that can be sent across threads.
pub type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// Result type for pipeline assembly and dispatch operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Which side of a processor a port belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum PortDirection {
    /// A port the processor consumes.
    Input,
    /// A port the processor produces.
    Output,
}

/// Errors raised while assembling a pipeline or preparing a run.
///
/// Everything here is a configuration problem detected before any processor
/// is invoked. Failures of individual processors during a run are reported
/// per node in the [`RunReport`] instead.
///
/// [`RunReport`]: crate::engine::RunReport
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A node with this name already exists in the pipeline.
    #[error("node `{0}` is already defined")]
    DuplicateNode(String),

    /// An edge, sink or seed references a node that does not exist.
    #[error("node `{0}` does not exist")]
    UnknownNode(String),

    /// An edge or seed references a port the processor does not declare.
    #[error("node `{node}` has no {direction} port `{port}`")]
    UnknownPort {
        /// Node that was referenced.
        node: String,
        /// Port that was referenced.
        port: String,
        /// Side the port was looked up on.
        direction: PortDirection,
    },

    /// The two ends of an edge carry incompatible value kinds.
    #[error("cannot connect `{from}` ({from_kind}) to `{to}` ({to_kind})")]
    KindMismatch {
        /// Source endpoint as `node.port`.
        from: String,
        /// Kind produced by the source port.
        from_kind: ValueKind,
        /// Target endpoint as `node.port`.
        to: String,
        /// Kind accepted by the target port.
        to_kind: ValueKind,
    },

    /// A definition names a processor kind the registry does not know.
    #[error("unknown processor kind `{kind}` for node `{node}`")]
    UnknownProcessorKind {
        /// Node being assembled.
        node: String,
        /// Requested processor kind.
        kind: String,
    },

    /// A processor factory rejected the parameters of a node.
    #[error("invalid parameters for node `{node}`: {message}")]
    InvalidParams {
        /// Node being assembled.
        node: String,
        /// Factory error message.
        message: String,
    },

    /// A seed value cannot be bound to the requested port.
    #[error("invalid seed for `{node}.{port}`: {message}")]
    InvalidSeed {
        /// Seeded node.
        node: String,
        /// Seeded port.
        port: String,
        /// Why the seed was rejected.
        message: String,
    },

    /// A pipeline definition could not be parsed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal engine error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl PipelineError {
    /// Creates an [`PipelineError::InvalidSeed`] error.
    pub fn invalid_seed(
        node: impl Into<String>,
        port: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidSeed {
            node: node.into(),
            port: port.into(),
            message: message.into(),
        }
    }

    /// Returns whether this error was caused by a rejected seed rather than
    /// by the pipeline's own wiring.
    pub const fn is_invalid_seed(&self) -> bool {
        matches!(self, Self::InvalidSeed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_port_mentions_direction() {
        let error = PipelineError::UnknownPort {
            node: "grobid".into(),
            port: "pdf".into(),
            direction: PortDirection::Output,
        };
        assert_eq!(error.to_string(), "node `grobid` has no output port `pdf`");
    }

    #[test]
    fn invalid_seed_is_classified() {
        assert!(PipelineError::invalid_seed("fetch", "id", "wrong kind").is_invalid_seed());
        assert!(!PipelineError::UnknownNode("fetch".into()).is_invalid_seed());
    }
}
