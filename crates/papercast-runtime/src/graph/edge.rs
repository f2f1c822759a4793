//! Port-level edges.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A directed binding from `(from, from_port)` to `(to, to_port)`.
///
/// Several edges may share a target port (fan-in) or a source port
/// (broadcast).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    /// Source node name.
    pub from: String,
    /// Output port on the source node.
    pub from_port: String,
    /// Target node name.
    pub to: String,
    /// Input port on the target node.
    pub to_port: String,
}

impl Edge {
    /// Creates a new edge.
    pub fn new(
        from: impl Into<String>,
        from_port: impl Into<String>,
        to: impl Into<String>,
        to_port: impl Into<String>,
    ) -> Self {
        Self {
            from: from.into(),
            from_port: from_port.into(),
            to: to.into(),
            to_port: to_port.into(),
        }
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{} -> {}.{}",
            self.from, self.from_port, self.to, self.to_port
        )
    }
}

/// Edge data stored in the pipeline graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EdgeData {
    /// Port name on the source node.
    pub from_port: String,
    /// Port name on the target node.
    pub to_port: String,
}
