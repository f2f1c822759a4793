//! The processor contract.
//!
//! A [`Processor`] is one stage of a pipeline: it declares the ports it reads
//! and writes and turns a set of bound inputs into a set of outputs. Concrete
//! stages (reference lookups, PDF acquisition, text extraction, speech
//! synthesis, feed publication) live outside this crate and plug in through
//! this trait.

mod error;
mod inputs;

use std::path::Path;

use async_trait::async_trait;

pub use self::error::{ProcessingError, StageError, StageResult};
pub use self::inputs::Inputs;
use crate::value::{PortMap, PortSpec};

/// A unit of work with declared input and output ports.
///
/// The engine invokes [`run`] at most once per run and never retries it;
/// retrying a flaky network call is the processor's own business.
///
/// # Outputs
///
/// The returned map should only contain declared output ports. Omitting a
/// declared port means "not produced for this input" and is not an error.
/// Undeclared keys are dropped by the engine.
///
/// # Artifact reuse
///
/// Stages that write artifacts to disk opt into reuse by overriding
/// [`reuse`]. When it returns `Some`, the engine records the node as done
/// with those outputs and does not call [`run`]. Runs started with
/// `force` skip this check.
///
/// [`run`]: Processor::run
/// [`reuse`]: Processor::reuse
#[async_trait]
pub trait Processor: Send + Sync + 'static {
    /// Ports this processor reads.
    fn inputs(&self) -> &[PortSpec];

    /// Ports this processor may write.
    fn outputs(&self) -> &[PortSpec];

    /// Processes one set of inputs.
    async fn run(&self, inputs: &Inputs) -> StageResult<PortMap>;

    /// Returns the outputs of a previous run whose artifacts still exist.
    async fn reuse(&self, inputs: &Inputs) -> StageResult<Option<PortMap>> {
        let _ = inputs;
        Ok(None)
    }
}

/// Returns whether an artifact already exists at `path`.
///
/// Helper for [`Processor::reuse`] implementations keyed on an output file.
/// Empty files count as missing.
pub async fn existing_artifact(path: &Path) -> StageResult<bool> {
    match tokio::fs::metadata(path).await {
        Ok(metadata) => Ok(metadata.is_file() && metadata.len() > 0),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}
