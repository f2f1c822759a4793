//! `papercast run`.

use std::str::FromStr;

use anyhow::{Context, anyhow, bail};
use clap::Args;
use papercast_runtime::engine::{RunOptions, Seed};
use papercast_runtime::graph::Pipeline;
use papercast_runtime::value::PortValue;
use papercast_server::PipelineServer;
use tokio_util::sync::CancellationToken;

use crate::TRACING_TARGET_RUN;

/// Arguments of `papercast run`.
#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// Pipeline to run.
    pub pipeline: String,

    /// Seed value as `node.port=value`, parsed by the port's kind.
    #[arg(short, long = "seed", value_name = "NODE.PORT=VALUE")]
    pub seeds: Vec<SeedArg>,

    /// Invoke every processor even when its artifact already exists.
    #[arg(long)]
    pub force: bool,
}

/// A seed value as given on the command line, before its kind is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedArg {
    pub node: String,
    pub port: String,
    pub raw: String,
}

impl FromStr for SeedArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (target, raw) = s
            .split_once('=')
            .ok_or_else(|| format!("`{s}` is not of the form node.port=value"))?;
        let (node, port) = target
            .split_once('.')
            .ok_or_else(|| format!("`{target}` is not of the form node.port"))?;

        if node.is_empty() || port.is_empty() {
            return Err(format!("`{target}` is missing a node or port name"));
        }

        Ok(Self {
            node: node.to_owned(),
            port: port.to_owned(),
            raw: raw.to_owned(),
        })
    }
}

/// Parses command-line seeds against the declared kinds of their ports.
pub fn resolve_seed(pipeline: &Pipeline, args: &[SeedArg]) -> anyhow::Result<Seed> {
    let mut seed = Seed::new();
    for arg in args {
        let spec = pipeline
            .input_spec(&arg.node, &arg.port)
            .with_context(|| format!("cannot seed `{}.{}`", arg.node, arg.port))?;
        let value = PortValue::parse(spec.kind, &arg.raw)
            .map_err(|e| anyhow!("cannot seed `{}.{}`: {e}", arg.node, arg.port))?;
        seed.insert(arg.node.clone(), arg.port.clone(), value);
    }

    Ok(seed)
}

/// Runs one seed through a pipeline and prints the report as JSON.
///
/// Ctrl+C cancels the run; nodes still executing are reported as cancelled.
/// Fails when the run does not complete.
pub async fn run(server: &PipelineServer, args: RunArgs) -> anyhow::Result<()> {
    let pipeline = server.pipeline(&args.pipeline)?;
    let seed = resolve_seed(pipeline, &args.seeds)?;

    let cancel = CancellationToken::new();
    let watcher = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!(target: TRACING_TARGET_RUN, "Cancelling run");
                cancel.cancel();
            }
        }
    });

    let options = RunOptions::new().with_force(args.force).with_cancel(cancel);
    let report = server.dispatch_with(&args.pipeline, seed, options).await;
    watcher.abort();
    let report = report?;

    let json = serde_json::to_string_pretty(&report).context("failed to serialize run report")?;
    println!("{json}");

    if !report.is_complete() {
        bail!(
            "run {} of pipeline `{}` finished with status {}",
            report.run_id,
            report.pipeline,
            report.status
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use papercast_runtime::engine::Engine;
    use papercast_stages::{LocalFile, LocalFileParams, ReadText};

    use super::*;

    fn pipeline() -> Pipeline {
        let mut pipeline = Pipeline::new("text");
        pipeline
            .add_processor(
                "file",
                LocalFile::new(LocalFileParams {
                    port: "txt".into(),
                    extensions: vec!["txt".into()],
                })
                .unwrap(),
            )
            .unwrap();
        pipeline.add_processor("read", ReadText::default()).unwrap();
        pipeline.connect("file", "txt", "read", "path").unwrap();
        pipeline
    }

    #[test]
    fn parses_seed_arguments() {
        let arg: SeedArg = "pdf.path=papers/a=b.pdf".parse().unwrap();
        assert_eq!(arg.node, "pdf");
        assert_eq!(arg.port, "path");
        assert_eq!(arg.raw, "papers/a=b.pdf");

        assert!("pdf.path".parse::<SeedArg>().is_err());
        assert!("pdf=x".parse::<SeedArg>().is_err());
        assert!(".path=x".parse::<SeedArg>().is_err());
    }

    #[test]
    fn resolves_seeds_by_port_kind() {
        let args = vec!["file.path=notes.txt".parse().unwrap()];
        let seed = resolve_seed(&pipeline(), &args).unwrap();

        let value = seed.iter().next().unwrap();
        assert_eq!(value.value, PortValue::path("notes.txt"));

        let unknown = vec!["file.nope=x".parse().unwrap()];
        assert!(resolve_seed(&pipeline(), &unknown).is_err());
    }

    #[tokio::test]
    async fn runs_a_seed_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "hello").unwrap();

        let mut server = PipelineServer::new(Engine::with_defaults());
        server.register("text", pipeline()).unwrap();

        let args = RunArgs {
            pipeline: "text".into(),
            seeds: vec![format!("file.path={}", path.display()).parse().unwrap()],
            force: false,
        };
        run(&server, args).await.unwrap();

        let missing = RunArgs {
            pipeline: "text".into(),
            seeds: vec![format!("file.path={}", dir.path().join("gone.txt").display())
                .parse()
                .unwrap()],
            force: false,
        };
        assert!(run(&server, missing).await.is_err());
    }
}
