//! `papercast list`.

use anyhow::Context;
use papercast_server::PipelineServer;

/// Prints registered pipelines as JSON.
pub fn list(server: &PipelineServer) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(&server.pipelines())
        .context("failed to serialize pipeline list")?;
    println!("{json}");
    Ok(())
}
