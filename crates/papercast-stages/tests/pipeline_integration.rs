//! End-to-end runs of declarative pipelines built from the built-in stages.
//!
//! Each test assembles a pipeline from JSON, seeds it with a file on disk and
//! checks the run report together with the artifacts left behind.

#![cfg(unix)]

use std::path::Path;

use papercast_runtime::engine::{Engine, NodeReason, NodeState, RunOptions, RunStatus, Seed};
use papercast_runtime::graph::{Pipeline, PipelineDefinition};
use papercast_runtime::value::PortValue;
use serde_json::json;

/// `file -> upper -> read`, plus `write` storing the text under the source stem.
fn transcript(out: &Path, script: &str) -> Pipeline {
    let definition: PipelineDefinition = serde_json::from_value(json!({
        "name": "transcript",
        "nodes": [
            { "name": "file", "kind": "local_file", "params": { "port": "src", "extensions": ["txt"] } },
            {
                "name": "upper",
                "kind": "command",
                "params": {
                    "program": "sh",
                    "args": ["-c", script, "sh", "{src}", "{output}"],
                    "inputs": [{ "name": "src", "kind": "path" }],
                    "artifact": {
                        "dir": out.join("upper"),
                        "extension": "txt",
                        "stem_from": "src",
                        "port": "upper"
                    }
                }
            },
            { "name": "read", "kind": "read_text" },
            { "name": "write", "kind": "write_text", "params": { "dir": out.join("copies") } }
        ],
        "edges": [
            { "from": "file", "from_port": "src", "to": "upper", "to_port": "src" },
            { "from": "upper", "from_port": "upper", "to": "read", "to_port": "path" },
            { "from": "read", "from_port": "text", "to": "write", "to_port": "text" },
            { "from": "file", "from_port": "stem", "to": "write", "to_port": "name" }
        ]
    }))
    .unwrap();

    Pipeline::from_definition(definition, &papercast_stages::builtin_registry()).unwrap()
}

fn seed(path: &Path) -> Seed {
    Seed::new().with("file", "path", PortValue::path(path))
}

#[tokio::test]
async fn text_flows_through_every_stage() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("attention.txt");
    std::fs::write(&source, "attention is all you need").unwrap();

    let pipeline = transcript(dir.path(), r#"tr a-z A-Z < "$1" > "$2""#);
    let report = Engine::with_defaults()
        .run(&pipeline, seed(&source))
        .await
        .unwrap();

    assert_eq!(report.status, RunStatus::Complete, "{report:#?}");
    assert_eq!(
        report.node("read").unwrap().outputs.get("text"),
        Some(&PortValue::text("ATTENTION IS ALL YOU NEED"))
    );

    let copy = dir.path().join("copies").join("attention.txt");
    assert_eq!(
        report.sink_output("write").and_then(|outputs| outputs.get("path")),
        Some(&PortValue::path(&copy))
    );
    assert_eq!(
        std::fs::read_to_string(copy).unwrap(),
        "ATTENTION IS ALL YOU NEED"
    );
}

#[tokio::test]
async fn existing_artifacts_are_reused_unless_forced() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("paper.txt");
    std::fs::write(&source, "abc").unwrap();

    let pipeline = transcript(dir.path(), r#"tr a-z A-Z < "$1" > "$2""#);
    let engine = Engine::with_defaults();

    let first = engine.run(&pipeline, seed(&source)).await.unwrap();
    assert!(first.is_complete());
    assert!(!first.node("upper").unwrap().reused);

    let second = engine.run(&pipeline, seed(&source)).await.unwrap();
    assert!(second.is_complete());
    assert!(second.node("upper").unwrap().reused);
    assert!(second.node("write").unwrap().reused);

    let forced = engine
        .execute(&pipeline, seed(&source), RunOptions::new().with_force(true))
        .await
        .unwrap();
    assert!(forced.is_complete());
    assert!(!forced.node("upper").unwrap().reused);
    assert!(!forced.node("write").unwrap().reused);
}

#[tokio::test]
async fn failing_commands_skip_their_dependents() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("paper.txt");
    std::fs::write(&source, "abc").unwrap();

    let pipeline = transcript(dir.path(), "echo 'no voice available' >&2; exit 3");
    let report = Engine::with_defaults()
        .run(&pipeline, seed(&source))
        .await
        .unwrap();

    assert_eq!(report.status, RunStatus::Stalled);
    assert_eq!(report.state("file"), Some(NodeState::Done));
    assert_eq!(report.state("upper"), Some(NodeState::Failed));
    assert_eq!(report.state("read"), Some(NodeState::Skipped));
    assert_eq!(report.state("write"), Some(NodeState::Skipped));

    let Some(NodeReason::ProcessingFailed { message }) = &report.node("upper").unwrap().reason
    else {
        panic!("expected a processing failure");
    };
    assert!(message.contains("no voice available"));
    assert_eq!(
        report.node("read").unwrap().reason,
        Some(NodeReason::UpstreamFailed {
            nodes: vec!["upper".into()]
        })
    );
}

#[tokio::test]
async fn rejected_files_fail_at_the_trigger() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("paper.pdf");
    std::fs::write(&source, "%PDF").unwrap();

    let pipeline = transcript(dir.path(), r#"cp "$1" "$2""#);
    let report = Engine::with_defaults()
        .run(&pipeline, seed(&source))
        .await
        .unwrap();

    assert_eq!(report.state("file"), Some(NodeState::Failed));
    assert!(report.nodes_in(NodeState::Done).is_empty());
}
