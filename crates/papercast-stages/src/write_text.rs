//! Text artifact writing stage.

use std::path::PathBuf;

use async_trait::async_trait;
use papercast_runtime::processor::{
    Inputs, Processor, StageError, StageResult, existing_artifact,
};
use papercast_runtime::value::{PortMap, PortSpec, PortValue, ValueKind};
use serde::{Deserialize, Serialize};

use crate::TRACING_TARGET;

/// Parameters of the `write_text` stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteTextParams {
    /// Directory the file is written to.
    pub dir: PathBuf,
    /// File extension without the leading dot.
    #[serde(default = "default_extension")]
    pub extension: String,
}

fn default_extension() -> String {
    "txt".to_owned()
}

/// Writes the `text` input to `dir/<name>.<extension>`.
///
/// Reuses the file when it already exists.
#[derive(Debug, Clone)]
pub struct WriteText {
    params: WriteTextParams,
    inputs: Vec<PortSpec>,
    outputs: Vec<PortSpec>,
}

impl WriteText {
    /// Processor kind name.
    pub const KIND: &'static str = "write_text";

    /// Creates the stage.
    pub fn new(params: WriteTextParams) -> Self {
        Self {
            params,
            inputs: vec![
                PortSpec::required("text", ValueKind::Text),
                PortSpec::required("name", ValueKind::Text),
            ],
            outputs: vec![PortSpec::optional("path", ValueKind::Path)],
        }
    }

    fn target(&self, inputs: &Inputs) -> StageResult<PathBuf> {
        let name = inputs.text("name")?.trim();
        if name.is_empty() {
            return Err(StageError::other("artifact name is empty"));
        }

        let name: String = name
            .chars()
            .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
            .collect();
        let extension = self.params.extension.trim_start_matches('.');
        Ok(self.params.dir.join(format!("{name}.{extension}")))
    }
}

#[async_trait]
impl Processor for WriteText {
    fn inputs(&self) -> &[PortSpec] {
        &self.inputs
    }

    fn outputs(&self) -> &[PortSpec] {
        &self.outputs
    }

    async fn run(&self, inputs: &Inputs) -> StageResult<PortMap> {
        let text = inputs.text("text")?;
        let target = self.target(inputs)?;

        tokio::fs::create_dir_all(&self.params.dir).await?;
        tokio::fs::write(&target, text).await?;

        tracing::debug!(
            target: TRACING_TARGET,
            path = %target.display(),
            bytes = text.len(),
            "Wrote text artifact"
        );

        Ok(PortMap::from([("path".to_owned(), PortValue::Path(target))]))
    }

    async fn reuse(&self, inputs: &Inputs) -> StageResult<Option<PortMap>> {
        let target = self.target(inputs)?;
        if !existing_artifact(&target).await? {
            return Ok(None);
        }

        Ok(Some(PortMap::from([(
            "path".to_owned(),
            PortValue::Path(target),
        )])))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(text: &str, name: &str) -> Inputs {
        [
            ("text".to_owned(), PortValue::text(text)),
            ("name".to_owned(), PortValue::text(name)),
        ]
        .into_iter()
        .collect()
    }

    #[tokio::test]
    async fn writes_then_reuses() {
        let dir = tempfile::tempdir().unwrap();
        let stage = WriteText::new(WriteTextParams {
            dir: dir.path().join("txts"),
            extension: default_extension(),
        });
        let inputs = inputs("Abstract.", "1706.03762");

        assert_eq!(stage.reuse(&inputs).await.unwrap(), None);

        let outputs = stage.run(&inputs).await.unwrap();
        let path = dir.path().join("txts").join("1706.03762.txt");
        assert_eq!(outputs.get("path"), Some(&PortValue::path(&path)));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "Abstract.");

        let reused = stage.reuse(&inputs).await.unwrap().unwrap();
        assert_eq!(reused, outputs);
    }

    #[tokio::test]
    async fn names_cannot_escape_the_directory() {
        let dir = tempfile::tempdir().unwrap();
        let stage = WriteText::new(WriteTextParams {
            dir: dir.path().to_owned(),
            extension: ".md".into(),
        });

        let outputs = stage.run(&inputs("x", "../escape")).await.unwrap();
        assert_eq!(
            outputs.get("path"),
            Some(&PortValue::path(dir.path().join(".._escape.md")))
        );
        assert!(stage.run(&inputs("x", "  ")).await.is_err());
    }
}
