//! Run identifiers, node states and run reports.

use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Duration;

use derive_more::{Debug, Display, From, Into};
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};
use uuid::Uuid;

use crate::value::PortMap;

/// Unique identifier for a single pipeline run.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Debug, Display, From, Into)]
#[debug("{_0}")]
#[display("{_0}")]
#[serde(transparent)]
pub struct RunId(Uuid);

impl RunId {
    /// Creates a new time-ordered run ID.
    #[inline]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Returns the underlying UUID.
    #[inline]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl FromStr for RunId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::from_str(s)?))
    }
}

/// Per-run state of a node.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Debug, strum::Display, EnumString, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NodeState {
    /// Waiting for inputs.
    #[default]
    Pending,
    /// All inputs bound, scheduled for the current wave.
    Ready,
    /// Processor invocation in flight.
    Running,
    /// Processor produced its outputs, or reused a previous artifact.
    Done,
    /// Processor returned an error or timed out.
    Failed,
    /// Never ran because an upstream node failed or was skipped.
    Skipped,
}

impl NodeState {
    /// Returns whether a node in this state may still produce outputs.
    #[inline]
    pub const fn is_live(self) -> bool {
        matches!(self, Self::Pending | Self::Ready | Self::Running)
    }

    /// Returns whether the node reached a final state.
    #[inline]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed | Self::Skipped)
    }
}

/// Terminal status of a run.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Debug, strum::Display, EnumString, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RunStatus {
    /// Every sink node is done.
    Complete,
    /// Nothing more could run and at least one sink is not done.
    Stalled,
    /// The run was cancelled before it settled.
    Cancelled,
}

/// Why a node did not reach `done`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeReason {
    /// Required inputs were never bound.
    MissingInput {
        /// Unbound input ports.
        ports: Vec<String>,
        /// Upstream nodes that could still have delivered them.
        waiting_on: Vec<String>,
    },
    /// The processor failed.
    ProcessingFailed {
        /// Rendered stage error.
        message: String,
    },
    /// A required input can no longer arrive because upstream nodes failed.
    UpstreamFailed {
        /// Failed upstream nodes.
        nodes: Vec<String>,
    },
    /// A required input can no longer arrive because upstream nodes were skipped.
    UpstreamSkipped {
        /// Skipped upstream nodes.
        nodes: Vec<String>,
    },
    /// The run was cancelled before the node finished.
    Cancelled,
}

/// Outcome of one node within a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeReport {
    /// Node name.
    pub name: String,
    /// Final state.
    pub state: NodeState,
    /// Why the node is not done, if it is not.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<NodeReason>,
    /// Whether the outputs came from an existing artifact.
    #[serde(default)]
    pub reused: bool,
    /// Wall time spent in the processor, if it was invoked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elapsed_ms: Option<u64>,
    /// Outputs produced by the node.
    #[serde(default, skip_serializing_if = "PortMap::is_empty")]
    pub outputs: PortMap,
}

/// Result of dispatching one item through a pipeline.
///
/// A stalled or partially failed run is still a report, not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Run identifier.
    pub run_id: RunId,
    /// Pipeline that ran.
    pub pipeline: String,
    /// Terminal status.
    pub status: RunStatus,
    /// When the run started.
    pub started_at: Timestamp,
    /// When the run settled.
    pub finished_at: Timestamp,
    /// Every node in declaration order.
    pub nodes: Vec<NodeReport>,
    /// Outputs of the sinks that finished, keyed by node name.
    pub sink_outputs: BTreeMap<String, PortMap>,
}

impl RunReport {
    /// Returns whether every sink finished.
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.status == RunStatus::Complete
    }

    /// Returns the report of a node.
    pub fn node(&self, name: &str) -> Option<&NodeReport> {
        self.nodes.iter().find(|node| node.name == name)
    }

    /// Returns the final state of a node.
    pub fn state(&self, name: &str) -> Option<NodeState> {
        self.node(name).map(|node| node.state)
    }

    /// Returns the names of nodes in the given state, in declaration order.
    pub fn nodes_in(&self, state: NodeState) -> Vec<&str> {
        self.nodes
            .iter()
            .filter(|node| node.state == state)
            .map(|node| node.name.as_str())
            .collect()
    }

    /// Returns the outputs of a sink that finished.
    pub fn sink_output(&self, name: &str) -> Option<&PortMap> {
        self.sink_outputs.get(name)
    }

    /// Returns the wall time of the whole run.
    pub fn elapsed(&self) -> jiff::SignedDuration {
        self.finished_at.duration_since(self.started_at)
    }
}

/// Converts a duration to whole milliseconds, saturating at `u64::MAX`.
pub(crate) fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn millis_saturate() {
        assert_eq!(millis(Duration::from_micros(2_500)), 2);
        assert_eq!(millis(Duration::MAX), u64::MAX);
    }

    #[test]
    fn node_states_serialize_in_snake_case() {
        assert_eq!(serde_json::to_string(&NodeState::Done).unwrap(), "\"done\"");
        assert_eq!(NodeState::Skipped.to_string(), "skipped");
        assert_eq!("running".parse::<NodeState>().unwrap(), NodeState::Running);
        assert!(NodeState::Running.is_live());
        assert!(NodeState::Failed.is_terminal());
    }

    #[test]
    fn reasons_are_tagged() {
        let reason = NodeReason::MissingInput {
            ports: vec!["pdf".into()],
            waiting_on: vec![],
        };
        let json = serde_json::to_value(&reason).unwrap();
        assert_eq!(json["kind"], "missing_input");
        assert_eq!(json["ports"][0], "pdf");

        let json = serde_json::to_value(NodeReason::Cancelled).unwrap();
        assert_eq!(json, serde_json::json!({ "kind": "cancelled" }));
    }

    #[test]
    fn run_ids_round_trip_through_strings() {
        let id = RunId::new();
        assert_eq!(id.to_string().parse::<RunId>().unwrap(), id);
    }
}
