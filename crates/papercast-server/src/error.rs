//! Dispatch error types.

use papercast_runtime::PipelineError;
use thiserror::Error;

/// Result type for pipeline registration and dispatch.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors raised by the [`PipelineServer`].
///
/// [`PipelineServer`]: crate::PipelineServer
#[derive(Debug, Error)]
pub enum ServerError {
    /// A pipeline with this name is already registered.
    #[error("pipeline `{0}` is already registered")]
    DuplicatePipeline(String),

    /// No pipeline is registered under this name.
    #[error("pipeline `{0}` is not registered")]
    UnknownPipeline(String),

    /// The seed does not fit the pipeline.
    #[error("invalid seed for pipeline `{pipeline}`: {source}")]
    InvalidSeed {
        /// Pipeline the seed was dispatched to.
        pipeline: String,
        /// Rejection reported by the engine.
        #[source]
        source: PipelineError,
    },

    /// A pipeline definition could not be assembled, or the engine failed.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// A batch item's task panicked or was aborted.
    #[error("batch item for pipeline `{pipeline}` did not finish: {message}")]
    Aborted {
        /// Pipeline the item was dispatched to.
        pipeline: String,
        /// Join error message.
        message: String,
    },
}

impl ServerError {
    /// Wraps an engine error, classifying rejected seeds.
    pub(crate) fn dispatch(pipeline: &str, error: PipelineError) -> Self {
        if error.is_invalid_seed() {
            Self::InvalidSeed {
                pipeline: pipeline.to_owned(),
                source: error,
            }
        } else {
            Self::Pipeline(error)
        }
    }
}
