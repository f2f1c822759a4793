#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod command;
mod error;
mod local_file;
mod read_text;
mod write_text;

use papercast_runtime::graph::ProcessorRegistry;

pub use crate::command::{ArtifactParams, Command, CommandParams};
pub use crate::error::{ParamsError, ParamsResult};
pub use crate::local_file::{LocalFile, LocalFileParams};
pub use crate::read_text::{ReadText, ReadTextParams};
pub use crate::write_text::{WriteText, WriteTextParams};

/// Tracing target for built-in stages.
pub const TRACING_TARGET: &str = "papercast_stages";

/// Registers every built-in processor kind.
pub fn register_builtin(registry: &mut ProcessorRegistry) -> &mut ProcessorRegistry {
    registry
        .register_with(LocalFile::KIND, |params: LocalFileParams| {
            Ok(LocalFile::new(params)?)
        })
        .register_with(Command::KIND, |params: CommandParams| {
            Ok(Command::new(params)?)
        })
        .register_with(ReadText::KIND, |params: ReadTextParams| {
            Ok(ReadText::new(params))
        })
        .register_with(WriteText::KIND, |params: WriteTextParams| {
            Ok(WriteText::new(params))
        })
}

/// Returns a registry holding every built-in processor kind.
pub fn builtin_registry() -> ProcessorRegistry {
    let mut registry = ProcessorRegistry::new();
    register_builtin(&mut registry);
    registry
}

#[cfg(test)]
mod tests {
    use papercast_runtime::PipelineError;
    use papercast_runtime::graph::{Pipeline, PipelineDefinition};

    use super::*;

    #[test]
    fn registers_every_kind() {
        let registry = builtin_registry();
        assert_eq!(
            registry.kinds(),
            vec!["command", "local_file", "read_text", "write_text"]
        );
    }

    #[test]
    fn assembles_a_definition() {
        let definition: PipelineDefinition = serde_json::from_value(serde_json::json!({
            "name": "default",
            "nodes": [
                { "name": "pdf", "kind": "local_file", "params": { "extensions": ["pdf"] } },
                {
                    "name": "extract",
                    "kind": "command",
                    "params": {
                        "program": "pdftotext",
                        "args": ["{pdf}", "{output}"],
                        "inputs": [{ "name": "pdf", "kind": "path" }],
                        "artifact": { "dir": "data/txts", "extension": "txt", "stem_from": "pdf" }
                    }
                },
                { "name": "read", "kind": "read_text", "params": { "remove_non_printable": true } }
            ],
            "edges": [
                { "from": "pdf", "from_port": "pdf", "to": "extract", "to_port": "pdf" },
                { "from": "extract", "from_port": "path", "to": "read", "to_port": "path" }
            ]
        }))
        .unwrap();

        let pipeline = Pipeline::from_definition(definition, &builtin_registry()).unwrap();
        assert_eq!(pipeline.node_count(), 3);
        assert_eq!(pipeline.sinks(), vec!["read"]);
    }

    #[test]
    fn rejects_invalid_command_params() {
        let definition: PipelineDefinition = serde_json::from_value(serde_json::json!({
            "name": "default",
            "nodes": [
                { "name": "say", "kind": "command", "params": { "program": "say", "args": ["{text}"] } }
            ]
        }))
        .unwrap();

        let error = Pipeline::from_definition(definition, &builtin_registry()).unwrap_err();
        assert!(matches!(error, PipelineError::InvalidParams { node, .. } if node == "say"));
    }
}
