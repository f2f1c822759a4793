//! Port declarations.

use serde::{Deserialize, Serialize};

use super::ValueKind;

/// Declaration of a single processor port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortSpec {
    /// Port name, unique within one side of a processor.
    pub name: String,
    /// Kind of value the port carries.
    pub kind: ValueKind,
    /// Whether the processor cannot run without this input.
    ///
    /// Ignored for output ports.
    #[serde(default = "default_required")]
    pub required: bool,
}

impl PortSpec {
    /// Declares a required port.
    pub fn required(name: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: true,
        }
    }

    /// Declares an optional port.
    pub fn optional(name: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
        }
    }

    /// Looks up a port by name in a list of declarations.
    pub fn find<'a>(specs: &'a [PortSpec], name: &str) -> Option<&'a PortSpec> {
        specs.iter().find(|spec| spec.name == name)
    }
}

const fn default_required() -> bool {
    true
}
