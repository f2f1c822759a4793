//! Mock processors for testing.
//!
//! # Feature Flag
//!
//! This module is only available when the `test-utils` feature is enabled:
//!
//! ```toml
//! [dev-dependencies]
//! papercast-runtime = { version = "...", features = ["test-utils"] }
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use papercast_runtime::mock::MockProcessor;
//! use papercast_runtime::value::{PortValue, ValueKind};
//!
//! let fetch = MockProcessor::new()
//!     .input("id", ValueKind::Text)
//!     .output("pdf", ValueKind::Path)
//!     .returns("pdf", PortValue::path("/tmp/42.pdf"));
//! let calls = fetch.calls();
//! ```

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::processor::{Inputs, Processor, StageError, StageResult};
use crate::value::{PortMap, PortSpec, PortValue, ValueKind};

type ComputeFn = Arc<dyn Fn(&Inputs) -> StageResult<PortMap> + Send + Sync>;

/// What a mock does when it runs.
#[derive(Clone)]
enum Behavior {
    Return(PortMap),
    Fail(String),
    Compute(ComputeFn),
}

/// Shared record of every invocation of a [`MockProcessor`].
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<Inputs>>>,
}

impl CallLog {
    /// Returns how many times `run` was invoked.
    pub fn count(&self) -> usize {
        self.calls.lock().map(|calls| calls.len()).unwrap_or_default()
    }

    /// Returns the inputs of every invocation, in call order.
    pub fn inputs(&self) -> Vec<Inputs> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    fn record(&self, inputs: &Inputs) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(inputs.clone());
        }
    }
}

/// A configurable processor with canned behavior.
#[derive(Clone)]
pub struct MockProcessor {
    inputs: Vec<PortSpec>,
    outputs: Vec<PortSpec>,
    behavior: Behavior,
    reuse: Option<PortMap>,
    delay: Option<Duration>,
    calls: CallLog,
}

impl MockProcessor {
    /// Creates a mock without ports that returns an empty map.
    pub fn new() -> Self {
        Self {
            inputs: Vec::new(),
            outputs: Vec::new(),
            behavior: Behavior::Return(PortMap::new()),
            reuse: None,
            delay: None,
            calls: CallLog::default(),
        }
    }

    /// Declares a required input port.
    pub fn input(mut self, name: impl Into<String>, kind: ValueKind) -> Self {
        self.inputs.push(PortSpec::required(name, kind));
        self
    }

    /// Declares an optional input port.
    pub fn optional_input(mut self, name: impl Into<String>, kind: ValueKind) -> Self {
        self.inputs.push(PortSpec::optional(name, kind));
        self
    }

    /// Declares an output port.
    pub fn output(mut self, name: impl Into<String>, kind: ValueKind) -> Self {
        self.outputs.push(PortSpec::optional(name, kind));
        self
    }

    /// Adds a value to the canned result.
    pub fn returns(mut self, port: impl Into<String>, value: PortValue) -> Self {
        match &mut self.behavior {
            Behavior::Return(outputs) => {
                outputs.insert(port.into(), value);
            }
            behavior => {
                *behavior = Behavior::Return(PortMap::from([(port.into(), value)]));
            }
        }
        self
    }

    /// Makes every run fail with the given message.
    pub fn fails(mut self, message: impl Into<String>) -> Self {
        self.behavior = Behavior::Fail(message.into());
        self
    }

    /// Computes outputs from inputs.
    pub fn compute<F>(mut self, f: F) -> Self
    where
        F: Fn(&Inputs) -> StageResult<PortMap> + Send + Sync + 'static,
    {
        self.behavior = Behavior::Compute(Arc::new(f));
        self
    }

    /// Reports an existing artifact with these outputs from `reuse`.
    pub fn reusing(mut self, port: impl Into<String>, value: PortValue) -> Self {
        self.reuse
            .get_or_insert_with(PortMap::new)
            .insert(port.into(), value);
        self
    }

    /// Sleeps before producing a result.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Returns a handle to the invocation log.
    pub fn calls(&self) -> CallLog {
        self.calls.clone()
    }
}

impl Default for MockProcessor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Processor for MockProcessor {
    fn inputs(&self) -> &[PortSpec] {
        &self.inputs
    }

    fn outputs(&self) -> &[PortSpec] {
        &self.outputs
    }

    async fn run(&self, inputs: &Inputs) -> StageResult<PortMap> {
        self.calls.record(inputs);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match &self.behavior {
            Behavior::Return(outputs) => Ok(outputs.clone()),
            Behavior::Fail(message) => Err(StageError::other(message.clone())),
            Behavior::Compute(compute) => compute(inputs),
        }
    }

    async fn reuse(&self, _inputs: &Inputs) -> StageResult<Option<PortMap>> {
        Ok(self.reuse.clone())
    }
}
