//! Values carried between processor ports.
//!
//! Ports carry a small closed set of value kinds:
//! - [`PortValue::Path`]: a filesystem reference to an artifact
//! - [`PortValue::Text`]: free-form text (titles, abstracts, extracted bodies)
//! - [`PortValue::Number`] and [`PortValue::Boolean`]: scalars
//! - [`PortValue::Record`]: a small structured metadata record
//!
//! Binary artifacts never travel by value; they are always referenced by path.

mod port;

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{AsRefStr, Display, EnumString};

pub use port::PortSpec;

/// Values produced or consumed by a processor, keyed by port name.
pub type PortMap = BTreeMap<String, PortValue>;

/// The kind of value a port carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Display, EnumString, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ValueKind {
    /// Filesystem path.
    Path,
    /// UTF-8 text.
    Text,
    /// Floating point number.
    Number,
    /// Boolean flag.
    Boolean,
    /// Structured JSON object.
    Record,
    /// Accepts every kind.
    Any,
}

impl ValueKind {
    /// Returns whether a value of kind `other` may flow into a port of this kind.
    #[inline]
    pub fn accepts(self, other: ValueKind) -> bool {
        self == ValueKind::Any || other == ValueKind::Any || self == other
    }
}

/// A value bound to a port.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum PortValue {
    /// Filesystem path to an artifact.
    Path(PathBuf),
    /// UTF-8 text.
    Text(String),
    /// Floating point number.
    Number(f64),
    /// Boolean flag.
    Boolean(bool),
    /// Structured JSON object.
    Record(Map<String, Value>),
}

impl PortValue {
    /// Creates a path value.
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self::Path(path.into())
    }

    /// Creates a text value.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Returns the kind of this value.
    pub const fn kind(&self) -> ValueKind {
        match self {
            Self::Path(_) => ValueKind::Path,
            Self::Text(_) => ValueKind::Text,
            Self::Number(_) => ValueKind::Number,
            Self::Boolean(_) => ValueKind::Boolean,
            Self::Record(_) => ValueKind::Record,
        }
    }

    /// Returns the path, if this is a path value.
    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Self::Path(path) => Some(path),
            _ => None,
        }
    }

    /// Returns the text, if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Returns the number, if this is a number value.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(number) => Some(*number),
            _ => None,
        }
    }

    /// Returns the flag, if this is a boolean value.
    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Self::Boolean(flag) => Some(*flag),
            _ => None,
        }
    }

    /// Returns the record, if this is a record value.
    pub fn as_record(&self) -> Option<&Map<String, Value>> {
        match self {
            Self::Record(record) => Some(record),
            _ => None,
        }
    }

    /// Parses a raw string into a value of the requested kind.
    ///
    /// Used for seeds supplied on the command line, where the target port's
    /// declared kind decides how the string is read. `Any` tries JSON first
    /// and falls back to text.
    pub fn parse(kind: ValueKind, raw: &str) -> Result<Self, String> {
        match kind {
            ValueKind::Path => Ok(Self::Path(PathBuf::from(raw))),
            ValueKind::Text => Ok(Self::Text(raw.to_owned())),
            ValueKind::Number => raw
                .trim()
                .parse::<f64>()
                .map(Self::Number)
                .map_err(|e| format!("`{raw}` is not a number: {e}")),
            ValueKind::Boolean => raw
                .trim()
                .parse::<bool>()
                .map(Self::Boolean)
                .map_err(|e| format!("`{raw}` is not a boolean: {e}")),
            ValueKind::Record => match serde_json::from_str::<Value>(raw) {
                Ok(Value::Object(record)) => Ok(Self::Record(record)),
                Ok(_) => Err(format!("`{raw}` is not a JSON object")),
                Err(e) => Err(format!("`{raw}` is not valid JSON: {e}")),
            },
            ValueKind::Any => Ok(match serde_json::from_str::<Value>(raw) {
                Ok(Value::Object(record)) => Self::Record(record),
                Ok(Value::Number(number)) => number
                    .as_f64()
                    .map_or_else(|| Self::Text(raw.to_owned()), Self::Number),
                Ok(Value::Bool(flag)) => Self::Boolean(flag),
                _ => Self::Text(raw.to_owned()),
            }),
        }
    }
}

impl fmt::Display for PortValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => write!(f, "{}", path.display()),
            Self::Text(text) => f.write_str(text),
            Self::Number(number) => write!(f, "{number}"),
            Self::Boolean(flag) => write!(f, "{flag}"),
            Self::Record(record) => write!(f, "{}", Value::Object(record.clone())),
        }
    }
}

impl From<PathBuf> for PortValue {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<String> for PortValue {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for PortValue {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<f64> for PortValue {
    fn from(number: f64) -> Self {
        Self::Number(number)
    }
}

impl From<bool> for PortValue {
    fn from(flag: bool) -> Self {
        Self::Boolean(flag)
    }
}

impl From<Map<String, Value>> for PortValue {
    fn from(record: Map<String, Value>) -> Self {
        Self::Record(record)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn any_accepts_everything() {
        assert!(ValueKind::Any.accepts(ValueKind::Path));
        assert!(ValueKind::Text.accepts(ValueKind::Any));
        assert!(ValueKind::Text.accepts(ValueKind::Text));
        assert!(!ValueKind::Text.accepts(ValueKind::Path));
    }

    #[test]
    fn serializes_with_kind_tag() {
        let value = PortValue::path("/tmp/42.pdf");
        let encoded = serde_json::to_value(&value).unwrap();
        assert_eq!(encoded, json!({ "kind": "path", "value": "/tmp/42.pdf" }));

        let decoded: PortValue =
            serde_json::from_value(json!({ "kind": "boolean", "value": true })).unwrap();
        assert_eq!(decoded, PortValue::Boolean(true));
    }

    #[test]
    fn parse_follows_declared_kind() {
        assert_eq!(
            PortValue::parse(ValueKind::Path, "data/pdfs/42.pdf").unwrap(),
            PortValue::path("data/pdfs/42.pdf")
        );
        assert_eq!(
            PortValue::parse(ValueKind::Number, " 42 ").unwrap(),
            PortValue::Number(42.0)
        );
        assert!(PortValue::parse(ValueKind::Boolean, "yes").is_err());
        assert!(PortValue::parse(ValueKind::Record, "[1, 2]").is_err());
    }

    #[test]
    fn parse_any_falls_back_to_text() {
        assert_eq!(
            PortValue::parse(ValueKind::Any, "paper-42").unwrap(),
            PortValue::text("paper-42")
        );
        assert_eq!(
            PortValue::parse(ValueKind::Any, "true").unwrap(),
            PortValue::Boolean(true)
        );
        assert_eq!(
            PortValue::parse(ValueKind::Any, r#"{"title": "T"}"#)
                .unwrap()
                .kind(),
            ValueKind::Record
        );
    }

    #[test]
    fn kind_names_round_trip_through_strum() {
        assert_eq!(ValueKind::Record.to_string(), "record");
        assert_eq!("path".parse::<ValueKind>().unwrap(), ValueKind::Path);
    }
}
