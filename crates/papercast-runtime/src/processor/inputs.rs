//! Bound inputs handed to a processor.

use std::path::Path;

use serde_json::{Map, Value};

use super::{StageError, StageResult};
use crate::value::{PortMap, PortValue, ValueKind};

/// Input values bound to a node's ports for one run.
///
/// Typed accessors return [`StageError::MissingInput`] for absent required
/// ports and [`StageError::KindMismatch`] when the bound value has another
/// kind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Inputs {
    values: PortMap,
}

impl Inputs {
    /// Wraps a port map.
    pub fn new(values: PortMap) -> Self {
        Self { values }
    }

    /// Returns the raw value bound to a port.
    pub fn get(&self, port: &str) -> Option<&PortValue> {
        self.values.get(port)
    }

    /// Returns whether a port is bound.
    pub fn contains(&self, port: &str) -> bool {
        self.values.contains_key(port)
    }

    /// Returns the value bound to a port or fails if it is missing.
    pub fn require(&self, port: &str) -> StageResult<&PortValue> {
        self.values
            .get(port)
            .ok_or_else(|| StageError::MissingInput(port.to_owned()))
    }

    /// Returns a required path input.
    pub fn path(&self, port: &str) -> StageResult<&Path> {
        let value = self.require(port)?;
        value.as_path().ok_or_else(|| mismatch(port, ValueKind::Path, value))
    }

    /// Returns a required text input.
    pub fn text(&self, port: &str) -> StageResult<&str> {
        let value = self.require(port)?;
        value.as_text().ok_or_else(|| mismatch(port, ValueKind::Text, value))
    }

    /// Returns a required number input.
    pub fn number(&self, port: &str) -> StageResult<f64> {
        let value = self.require(port)?;
        value
            .as_number()
            .ok_or_else(|| mismatch(port, ValueKind::Number, value))
    }

    /// Returns a required boolean input.
    pub fn boolean(&self, port: &str) -> StageResult<bool> {
        let value = self.require(port)?;
        value
            .as_boolean()
            .ok_or_else(|| mismatch(port, ValueKind::Boolean, value))
    }

    /// Returns a required record input.
    pub fn record(&self, port: &str) -> StageResult<&Map<String, Value>> {
        let value = self.require(port)?;
        value
            .as_record()
            .ok_or_else(|| mismatch(port, ValueKind::Record, value))
    }

    /// Returns an optional text input.
    pub fn optional_text(&self, port: &str) -> StageResult<Option<&str>> {
        match self.values.get(port) {
            None => Ok(None),
            Some(value) => value
                .as_text()
                .map(Some)
                .ok_or_else(|| mismatch(port, ValueKind::Text, value)),
        }
    }

    /// Returns an optional path input.
    pub fn optional_path(&self, port: &str) -> StageResult<Option<&Path>> {
        match self.values.get(port) {
            None => Ok(None),
            Some(value) => value
                .as_path()
                .map(Some)
                .ok_or_else(|| mismatch(port, ValueKind::Path, value)),
        }
    }

    /// Iterates over bound ports in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PortValue)> {
        self.values.iter().map(|(port, value)| (port.as_str(), value))
    }

    /// Returns the number of bound ports.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns whether no port is bound.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Consumes the inputs and returns the underlying map.
    pub fn into_inner(self) -> PortMap {
        self.values
    }
}

impl From<PortMap> for Inputs {
    fn from(values: PortMap) -> Self {
        Self::new(values)
    }
}

impl FromIterator<(String, PortValue)> for Inputs {
    fn from_iter<I: IntoIterator<Item = (String, PortValue)>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

fn mismatch(port: &str, expected: ValueKind, found: &PortValue) -> StageError {
    StageError::KindMismatch {
        port: port.to_owned(),
        expected,
        found: found.kind(),
    }
}
