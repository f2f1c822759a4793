//! Engine configuration.

use std::time::Duration;

use derive_builder::Builder;

/// Configuration for the pipeline execution engine.
#[derive(Debug, Clone, Builder)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct EngineConfig {
    /// Maximum number of concurrent pipeline runs.
    #[builder(default = "10")]
    pub max_concurrent_runs: usize,

    /// Maximum number of nodes executing at once within one wave of a run.
    #[builder(default = "4")]
    pub max_concurrent_nodes: usize,

    /// Upper bound on a single processor invocation, if any.
    #[builder(default)]
    pub node_timeout: Option<Duration>,
}

impl EngineConfig {
    /// Returns a builder with default values.
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }
}

impl EngineConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if self.max_concurrent_runs == Some(0) {
            return Err("max_concurrent_runs must be at least 1".into());
        }
        if self.max_concurrent_nodes == Some(0) {
            return Err("max_concurrent_nodes must be at least 1".into());
        }
        if let Some(Some(timeout)) = self.node_timeout
            && timeout.is_zero()
        {
            return Err("node_timeout must be greater than zero".into());
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_runs: 10,
            max_concurrent_nodes: 4,
            node_timeout: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults_match_default() {
        let config = EngineConfig::builder().build().unwrap();
        assert_eq!(config.max_concurrent_runs, 10);
        assert_eq!(config.max_concurrent_nodes, 4);
        assert_eq!(config.node_timeout, None);
    }

    #[test]
    fn builder_rejects_zero_limits() {
        assert!(EngineConfig::builder().max_concurrent_runs(0_usize).build().is_err());
        assert!(EngineConfig::builder().max_concurrent_nodes(0_usize).build().is_err());
        assert!(EngineConfig::builder().node_timeout(Duration::ZERO).build().is_err());
    }

    #[test]
    fn builder_accepts_timeout() {
        let config = EngineConfig::builder()
            .node_timeout(Duration::from_secs(30))
            .build()
            .unwrap();
        assert_eq!(config.node_timeout, Some(Duration::from_secs(30)));
    }
}
