//! Processor registry for declarative pipelines.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{BoxedError, PipelineError, PipelineResult};
use crate::processor::Processor;

/// Factory that builds a processor from its JSON parameters.
pub type ProcessorFactory =
    Arc<dyn Fn(&Value) -> Result<Box<dyn Processor>, BoxedError> + Send + Sync>;

/// Maps processor kind names to factories.
///
/// Deployments register the stage kinds they support once at startup; the
/// same registry then assembles every [`PipelineDefinition`].
///
/// [`PipelineDefinition`]: super::PipelineDefinition
#[derive(Clone, Default)]
pub struct ProcessorRegistry {
    factories: HashMap<String, ProcessorFactory>,
}

impl ProcessorRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a factory working on raw JSON parameters.
    ///
    /// Registering a kind twice replaces the earlier factory.
    pub fn register<F>(&mut self, kind: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&Value) -> Result<Box<dyn Processor>, BoxedError> + Send + Sync + 'static,
    {
        self.factories.insert(kind.into(), Arc::new(factory));
        self
    }

    /// Registers a factory whose parameters are deserialized into `T` first.
    ///
    /// Missing parameters are read as an empty object, so parameter structs
    /// with all-default fields work without a `params` entry.
    pub fn register_with<T, P, F>(&mut self, kind: impl Into<String>, factory: F) -> &mut Self
    where
        T: DeserializeOwned,
        P: Processor,
        F: Fn(T) -> Result<P, BoxedError> + Send + Sync + 'static,
    {
        self.register(kind, move |params: &Value| {
            let params = match params {
                Value::Null => Value::Object(Map::new()),
                other => other.clone(),
            };
            let params: T = serde_json::from_value(params)?;
            let processor = factory(params)?;
            Ok(Box::new(processor) as Box<dyn Processor>)
        })
    }

    /// Returns whether a kind is registered.
    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    /// Returns the registered kinds, sorted.
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<_> = self.factories.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }

    /// Builds the processor for a node.
    pub fn create(
        &self,
        node: &str,
        kind: &str,
        params: &Value,
    ) -> PipelineResult<Box<dyn Processor>> {
        let factory = self
            .factories
            .get(kind)
            .ok_or_else(|| PipelineError::UnknownProcessorKind {
                node: node.to_owned(),
                kind: kind.to_owned(),
            })?;

        factory(params).map_err(|e| PipelineError::InvalidParams {
            node: node.to_owned(),
            message: e.to_string(),
        })
    }
}

impl fmt::Debug for ProcessorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessorRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}
