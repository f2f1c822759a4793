//! External program stage.
//!
//! Wraps a command-line tool (a PDF extractor, a speech synthesizer, a feed
//! renderer) as a processor. Arguments are templates: `{port}` is replaced by
//! the value bound to that input port and `{output}` by the artifact path.
//! Each template is expanded in one pass, so braces inside substituted values
//! are passed through verbatim.
//!
//! The program writes its artifact to a hidden sibling file which is renamed
//! into place only after a successful exit, so a failed, timed-out or cancelled
//! invocation never leaves a file that a later run would reuse.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use papercast_runtime::processor::{
    Inputs, Processor, StageError, StageResult, existing_artifact,
};
use papercast_runtime::value::{PortMap, PortSpec, PortValue, ValueKind};
use serde::{Deserialize, Serialize};

use crate::TRACING_TARGET;
use crate::error::{ParamsError, ParamsResult};

/// Placeholder replaced by the artifact path.
const OUTPUT_PLACEHOLDER: &str = "output";

/// Parameters of the `command` stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandParams {
    /// Program to execute, looked up on `PATH` when not a path.
    pub program: String,
    /// Argument templates.
    #[serde(default)]
    pub args: Vec<String>,
    /// Input ports the command reads.
    #[serde(default)]
    pub inputs: Vec<PortSpec>,
    /// File the command writes, if any.
    #[serde(default)]
    pub artifact: Option<ArtifactParams>,
    /// Output port that receives the trimmed standard output, if any.
    #[serde(default)]
    pub stdout: Option<String>,
}

/// Where a command's output artifact lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactParams {
    /// Directory the artifact is written to.
    pub dir: PathBuf,
    /// File extension without the leading dot.
    pub extension: String,
    /// Input port whose value names the artifact. Path values contribute
    /// their file stem.
    pub stem_from: String,
    /// Output port the artifact path is published on.
    #[serde(default = "default_artifact_port")]
    pub port: String,
}

fn default_artifact_port() -> String {
    "path".to_owned()
}

/// Runs an external program once per invocation.
///
/// A non-zero exit status fails the node with the captured standard error.
/// When an artifact is configured and standard output is not captured, an
/// existing artifact is reused instead of running the program again.
#[derive(Debug, Clone)]
pub struct Command {
    params: CommandParams,
    outputs: Vec<PortSpec>,
}

impl Command {
    /// Processor kind name.
    pub const KIND: &'static str = "command";

    /// Validates the parameters and creates the stage.
    pub fn new(params: CommandParams) -> ParamsResult<Self> {
        if params.program.trim().is_empty() {
            return Err(ParamsError::EmptyProgram);
        }

        let mut seen = HashSet::new();
        for spec in &params.inputs {
            if !seen.insert(spec.name.as_str()) {
                return Err(ParamsError::DuplicatePort(spec.name.clone()));
            }
        }

        if let Some(artifact) = &params.artifact
            && !seen.contains(artifact.stem_from.as_str())
        {
            return Err(ParamsError::UnknownStemPort(artifact.stem_from.clone()));
        }

        for arg in &params.args {
            for name in placeholders(arg) {
                let known = seen.contains(name)
                    || (name == OUTPUT_PLACEHOLDER && params.artifact.is_some());
                if !known {
                    return Err(ParamsError::UnknownPlaceholder {
                        arg: arg.clone(),
                        name: name.to_owned(),
                    });
                }
            }
        }

        let mut outputs = Vec::new();
        if let Some(artifact) = &params.artifact {
            outputs.push(PortSpec::optional(artifact.port.clone(), ValueKind::Path));
        }
        if let Some(port) = &params.stdout {
            if outputs.iter().any(|spec| &spec.name == port) {
                return Err(ParamsError::DuplicatePort(port.clone()));
            }
            outputs.push(PortSpec::optional(port.clone(), ValueKind::Text));
        }

        Ok(Self { params, outputs })
    }

    /// Returns the artifact path for these inputs, if an artifact is configured.
    fn artifact_path(&self, inputs: &Inputs) -> StageResult<Option<PathBuf>> {
        let Some(artifact) = &self.params.artifact else {
            return Ok(None);
        };

        let stem = match inputs.require(&artifact.stem_from)? {
            PortValue::Path(path) => path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .ok_or_else(|| {
                    StageError::other(format!("`{}` has no file name", path.display()))
                })?,
            other => other
                .to_string()
                .chars()
                .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
                .collect(),
        };

        let extension = artifact.extension.trim_start_matches('.');
        Ok(Some(artifact.dir.join(format!("{stem}.{extension}"))))
    }

    /// Expands placeholders in every argument.
    ///
    /// Unbound optional inputs expand to an empty string.
    fn expand_args(&self, inputs: &Inputs, output: Option<&Path>) -> Vec<String> {
        self.params
            .args
            .iter()
            .map(|arg| {
                let mut expanded = String::with_capacity(arg.len());
                for segment in segments(arg) {
                    match segment {
                        Segment::Literal(text) => expanded.push_str(text),
                        Segment::Placeholder(name) => {
                            match self.substitution(name, inputs, output) {
                                Some(value) => expanded.push_str(&value),
                                None => {
                                    expanded.push('{');
                                    expanded.push_str(name);
                                    expanded.push('}');
                                }
                            }
                        }
                    }
                }
                expanded
            })
            .collect()
    }

    /// Returns the text a placeholder stands for, if it names an input port
    /// or the artifact.
    fn substitution(&self, name: &str, inputs: &Inputs, output: Option<&Path>) -> Option<String> {
        if self.params.inputs.iter().any(|spec| spec.name == name) {
            return Some(inputs.get(name).map(ToString::to_string).unwrap_or_default());
        }

        match output {
            Some(output) if name == OUTPUT_PLACEHOLDER => {
                Some(output.to_string_lossy().into_owned())
            }
            _ => None,
        }
    }
}

/// Hidden sibling an artifact is written to before it is complete.
///
/// The extension is kept last so programs that pick a format from the file
/// name still see it.
fn partial_path(artifact: &Path) -> PathBuf {
    let stem = artifact
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match artifact.extension() {
        Some(extension) => format!(".{stem}.partial.{}", extension.to_string_lossy()),
        None => format!(".{stem}.partial"),
    };

    artifact.with_file_name(name)
}

/// Artifact file being written by a running command.
///
/// Removed on drop unless it was committed, which covers failed exits as well
/// as runs abandoned by a timeout or cancellation.
#[derive(Debug)]
struct PartialArtifact {
    path: PathBuf,
    committed: bool,
}

impl PartialArtifact {
    /// Clears leftovers of an earlier interrupted invocation.
    async fn prepare(path: PathBuf) -> StageResult<Self> {
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!(
                    target: TRACING_TARGET,
                    path = %path.display(),
                    "Removed stale partial artifact"
                );
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        Ok(Self {
            path,
            committed: false,
        })
    }

    fn path(&self) -> &Path {
        &self.path
    }

    /// Moves the finished file to its final location.
    async fn commit(mut self, target: &Path) -> StageResult<()> {
        if !existing_artifact(&self.path).await? {
            return Err(StageError::ArtifactNotFound(target.to_owned()));
        }

        tokio::fs::rename(&self.path, target).await?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for PartialArtifact {
    fn drop(&mut self) {
        if self.committed {
            return;
        }

        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::debug!(
                    target: TRACING_TARGET,
                    path = %self.path.display(),
                    "Discarded unfinished artifact"
                );
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(
                    target: TRACING_TARGET,
                    path = %self.path.display(),
                    error = %e,
                    "Failed to remove unfinished artifact"
                );
            }
        }
    }
}

#[async_trait]
impl Processor for Command {
    fn inputs(&self) -> &[PortSpec] {
        &self.params.inputs
    }

    fn outputs(&self) -> &[PortSpec] {
        &self.outputs
    }

    async fn run(&self, inputs: &Inputs) -> StageResult<PortMap> {
        let artifact = self.artifact_path(inputs)?;
        if let Some(parent) = artifact.as_deref().and_then(Path::parent) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let partial = match &artifact {
            Some(path) => Some(PartialArtifact::prepare(partial_path(path)).await?),
            None => None,
        };

        let args = self.expand_args(inputs, partial.as_ref().map(PartialArtifact::path));
        tracing::debug!(
            target: TRACING_TARGET,
            program = %self.params.program,
            args = ?args,
            "Running command"
        );

        let output = tokio::process::Command::new(&self.params.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            return Err(StageError::Command {
                program: self.params.program.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            });
        }

        let mut outputs = PortMap::new();

        if let (Some(path), Some(partial), Some(params)) =
            (artifact, partial, &self.params.artifact)
        {
            partial.commit(&path).await?;
            outputs.insert(params.port.clone(), PortValue::Path(path));
        }

        if let Some(port) = &self.params.stdout {
            let stdout = String::from_utf8_lossy(&output.stdout).trim_end().to_owned();
            outputs.insert(port.clone(), PortValue::Text(stdout));
        }

        Ok(outputs)
    }

    async fn reuse(&self, inputs: &Inputs) -> StageResult<Option<PortMap>> {
        if self.params.stdout.is_some() {
            return Ok(None);
        }

        let (Some(path), Some(params)) = (self.artifact_path(inputs)?, &self.params.artifact)
        else {
            return Ok(None);
        };

        if !existing_artifact(&path).await? {
            return Ok(None);
        }

        Ok(Some(PortMap::from([(
            params.port.clone(),
            PortValue::Path(path),
        )])))
    }
}

/// Piece of an argument template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment<'a> {
    /// Text copied as is.
    Literal(&'a str),
    /// Name between braces.
    Placeholder(&'a str),
}

/// Splits an argument into literal text and `{placeholder}` names.
fn segments(arg: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut rest = arg;

    while let Some(start) = rest.find('{') {
        let after = &rest[start + 1..];
        let Some(end) = after.find('}') else {
            break;
        };

        let name = &after[..end];
        if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
            segments.push(Segment::Literal(&rest[..=start]));
            rest = after;
            continue;
        }

        if start > 0 {
            segments.push(Segment::Literal(&rest[..start]));
        }
        segments.push(Segment::Placeholder(name));
        rest = &after[end + 1..];
    }

    if !rest.is_empty() {
        segments.push(Segment::Literal(rest));
    }

    segments
}

/// Returns the names of `{placeholder}` occurrences in an argument.
fn placeholders(arg: &str) -> Vec<&str> {
    segments(arg)
        .into_iter()
        .filter_map(|segment| match segment {
            Segment::Placeholder(name) => Some(name),
            Segment::Literal(_) => None,
        })
        .collect()
}
