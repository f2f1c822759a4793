//! File-drop trigger stage.

use std::path::Path;

use async_trait::async_trait;
use papercast_runtime::processor::{Inputs, Processor, StageError, StageResult};
use papercast_runtime::value::{PortMap, PortSpec, PortValue, ValueKind};
use serde::{Deserialize, Serialize};

use crate::TRACING_TARGET;
use crate::error::{ParamsError, ParamsResult};

/// Output port carrying the file stem.
const STEM_PORT: &str = "stem";

/// Parameters of the `local_file` stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalFileParams {
    /// Output port the file path is published on.
    pub port: String,
    /// Accepted file extensions without the leading dot. Empty accepts all.
    pub extensions: Vec<String>,
}

impl Default for LocalFileParams {
    fn default() -> Self {
        Self {
            port: "pdf".to_owned(),
            extensions: Vec::new(),
        }
    }
}

/// Publishes a local file that was handed to the pipeline as a seed.
///
/// Reads the `path` input, checks that it names an existing file with an
/// accepted extension, and outputs the path plus its file stem.
#[derive(Debug, Clone)]
pub struct LocalFile {
    extensions: Vec<String>,
    port: String,
    inputs: Vec<PortSpec>,
    outputs: Vec<PortSpec>,
}

impl LocalFile {
    /// Processor kind name.
    pub const KIND: &'static str = "local_file";

    /// Validates the parameters and creates the stage.
    pub fn new(params: LocalFileParams) -> ParamsResult<Self> {
        if params.port == STEM_PORT {
            return Err(ParamsError::DuplicatePort(params.port));
        }

        let extensions = params
            .extensions
            .iter()
            .map(|ext| ext.trim_start_matches('.').to_ascii_lowercase())
            .collect();

        Ok(Self {
            extensions,
            inputs: vec![PortSpec::required("path", ValueKind::Path)],
            outputs: vec![
                PortSpec::optional(params.port.clone(), ValueKind::Path),
                PortSpec::optional(STEM_PORT, ValueKind::Text),
            ],
            port: params.port,
        })
    }

    fn accepts(&self, path: &Path) -> bool {
        if self.extensions.is_empty() {
            return true;
        }

        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.contains(&ext.to_ascii_lowercase()))
    }
}

impl Default for LocalFile {
    fn default() -> Self {
        Self {
            extensions: Vec::new(),
            port: "pdf".to_owned(),
            inputs: vec![PortSpec::required("path", ValueKind::Path)],
            outputs: vec![
                PortSpec::optional("pdf", ValueKind::Path),
                PortSpec::optional(STEM_PORT, ValueKind::Text),
            ],
        }
    }
}

#[async_trait]
impl Processor for LocalFile {
    fn inputs(&self) -> &[PortSpec] {
        &self.inputs
    }

    fn outputs(&self) -> &[PortSpec] {
        &self.outputs
    }

    async fn run(&self, inputs: &Inputs) -> StageResult<PortMap> {
        let path = inputs.path("path")?;

        match tokio::fs::metadata(path).await {
            Ok(metadata) if metadata.is_file() => {}
            Ok(_) => return Err(StageError::ArtifactNotFound(path.to_owned())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StageError::ArtifactNotFound(path.to_owned()));
            }
            Err(e) => return Err(e.into()),
        }

        if !self.accepts(path) {
            return Err(StageError::other(format!(
                "`{}` does not have an accepted extension ({})",
                path.display(),
                self.extensions.join(", ")
            )));
        }

        tracing::debug!(
            target: TRACING_TARGET,
            path = %path.display(),
            "Picked up local file"
        );

        let mut outputs = PortMap::new();
        if let Some(stem) = path.file_stem() {
            outputs.insert(
                STEM_PORT.to_owned(),
                PortValue::text(stem.to_string_lossy()),
            );
        }
        outputs.insert(self.port.clone(), PortValue::path(path));
        Ok(outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(path: &Path) -> Inputs {
        [("path".to_owned(), PortValue::path(path))]
            .into_iter()
            .collect()
    }

    #[tokio::test]
    async fn publishes_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("attention.pdf");
        std::fs::write(&path, b"%PDF-1.4").unwrap();

        let stage = LocalFile::default();
        let outputs = stage.run(&inputs(&path)).await.unwrap();

        assert_eq!(outputs.get("pdf"), Some(&PortValue::path(&path)));
        assert_eq!(outputs.get("stem"), Some(&PortValue::text("attention")));
    }

    #[tokio::test]
    async fn rejects_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.pdf");

        let error = LocalFile::default().run(&inputs(&path)).await.unwrap_err();
        assert!(matches!(error, StageError::ArtifactNotFound(p) if p == path));
    }

    #[tokio::test]
    async fn filters_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.TXT");
        std::fs::write(&path, b"notes").unwrap();

        let pdf_only = LocalFile::new(LocalFileParams {
            extensions: vec![".pdf".into()],
            ..Default::default()
        })
        .unwrap();
        assert!(pdf_only.run(&inputs(&path)).await.is_err());

        let text = LocalFile::new(LocalFileParams {
            port: "document".into(),
            extensions: vec!["txt".into()],
        })
        .unwrap();
        let outputs = text.run(&inputs(&path)).await.unwrap();
        assert!(outputs.contains_key("document"));
    }

    #[test]
    fn rejects_port_named_like_the_stem() {
        let error = LocalFile::new(LocalFileParams {
            port: "stem".into(),
            extensions: Vec::new(),
        })
        .unwrap_err();
        assert!(matches!(error, ParamsError::DuplicatePort(port) if port == "stem"));
    }

    #[test]
    fn default_matches_default_params() {
        let stage = LocalFile::default();
        let built = LocalFile::new(LocalFileParams::default()).unwrap();
        assert_eq!(stage.outputs(), built.outputs());
        assert_eq!(stage.inputs(), built.inputs());
    }
}
