//! Run request types.

use papercast_runtime::engine::{RunOptions, Seed};
use serde::{Deserialize, Serialize};

/// Request payload for a single run.
#[must_use]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateRun {
    /// Values bound to input ports before the run starts.
    pub seed: Seed,
    /// Invoke every processor even when its artifact already exists.
    pub force: bool,
}

impl CreateRun {
    /// Returns the engine options for this request.
    pub fn options(&self) -> RunOptions {
        RunOptions::new().with_force(self.force)
    }
}

/// Request payload for a batch of runs through one pipeline.
#[must_use]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateBatch {
    /// One seed per item.
    pub items: Vec<Seed>,
    /// Invoke every processor even when its artifact already exists.
    pub force: bool,
}

impl CreateBatch {
    /// Returns the engine options shared by every item.
    pub fn options(&self) -> RunOptions {
        RunOptions::new().with_force(self.force)
    }
}
