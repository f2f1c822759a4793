//! Monitor response types.

use serde::{Deserialize, Serialize};

/// Liveness status response.
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    /// Always `ok` while the server answers.
    pub status: String,
    /// Application version.
    pub version: String,
}

impl Default for Health {
    fn default() -> Self {
        Self {
            status: "ok".to_owned(),
            version: env!("CARGO_PKG_VERSION").to_owned(),
        }
    }
}
