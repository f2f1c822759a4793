//! Text loading stage.

use async_trait::async_trait;
use papercast_runtime::processor::{Inputs, Processor, StageError, StageResult};
use papercast_runtime::value::{PortMap, PortSpec, PortValue, ValueKind};
use serde::{Deserialize, Serialize};

use crate::TRACING_TARGET;

/// Parameters of the `read_text` stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadTextParams {
    /// Keep only printable ASCII characters and whitespace.
    pub remove_non_printable: bool,
    /// Read at most this many bytes.
    pub max_bytes: Option<usize>,
}

/// Loads a text artifact from disk into a `text` value.
#[derive(Debug, Clone)]
pub struct ReadText {
    params: ReadTextParams,
    inputs: Vec<PortSpec>,
    outputs: Vec<PortSpec>,
}

impl ReadText {
    /// Processor kind name.
    pub const KIND: &'static str = "read_text";

    /// Creates the stage.
    pub fn new(params: ReadTextParams) -> Self {
        Self {
            params,
            inputs: vec![PortSpec::required("path", ValueKind::Path)],
            outputs: vec![PortSpec::optional("text", ValueKind::Text)],
        }
    }
}

impl Default for ReadText {
    fn default() -> Self {
        Self::new(ReadTextParams::default())
    }
}

#[async_trait]
impl Processor for ReadText {
    fn inputs(&self) -> &[PortSpec] {
        &self.inputs
    }

    fn outputs(&self) -> &[PortSpec] {
        &self.outputs
    }

    async fn run(&self, inputs: &Inputs) -> StageResult<PortMap> {
        let path = inputs.path("path")?;

        let mut bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StageError::ArtifactNotFound(path.to_owned()));
            }
            Err(e) => return Err(e.into()),
        };

        if let Some(limit) = self.params.max_bytes
            && bytes.len() > limit
        {
            bytes.truncate(limit);
        }

        let mut text = String::from_utf8_lossy(&bytes).into_owned();
        if self.params.remove_non_printable {
            text = printable(&text);
        }

        tracing::debug!(
            target: TRACING_TARGET,
            path = %path.display(),
            chars = text.len(),
            "Read text artifact"
        );

        Ok(PortMap::from([("text".to_owned(), PortValue::Text(text))]))
    }
}

/// Keeps printable ASCII characters and ASCII whitespace.
fn printable(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_ascii_graphic() || c.is_ascii_whitespace())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(path: &std::path::Path) -> Inputs {
        [("path".to_owned(), PortValue::path(path))]
            .into_iter()
            .collect()
    }

    #[test]
    fn strips_non_printable_characters() {
        assert_eq!(printable("caf\u{e9}\u{0}\tbar\n"), "caf\tbar\n");
    }

    #[tokio::test]
    async fn reads_and_filters_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("paper.txt");
        std::fs::write(&path, "Attention\u{200b} is all you need\u{7}").unwrap();

        let raw = ReadText::default().run(&inputs(&path)).await.unwrap();
        assert_eq!(
            raw.get("text"),
            Some(&PortValue::text("Attention\u{200b} is all you need\u{7}"))
        );

        let stage = ReadText::new(ReadTextParams {
            remove_non_printable: true,
            max_bytes: None,
        });
        let filtered = stage.run(&inputs(&path)).await.unwrap();
        assert_eq!(
            filtered.get("text"),
            Some(&PortValue::text("Attention is all you need"))
        );
    }

    #[tokio::test]
    async fn truncates_to_max_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("paper.txt");
        std::fs::write(&path, "abcdef").unwrap();

        let stage = ReadText::new(ReadTextParams {
            remove_non_printable: false,
            max_bytes: Some(3),
        });
        let outputs = stage.run(&inputs(&path)).await.unwrap();
        assert_eq!(outputs.get("text"), Some(&PortValue::text("abc")));
    }

    #[tokio::test]
    async fn missing_files_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let error = ReadText::default()
            .run(&inputs(&dir.path().join("missing.txt")))
            .await
            .unwrap_err();
        assert!(matches!(error, StageError::ArtifactNotFound(_)));
    }
}
