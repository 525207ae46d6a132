//! Implementation of the `asterism stop` command.

use std::path::Path;

use anyhow::Result;
use asterism_deploy::StopOptions;

pub async fn run(
    path: &Path,
    kill: bool,
    network: bool,
    volumes: bool,
    force: bool,
    extra: Option<String>,
    options: Vec<String>,
) -> Result<()> {
    let orchestrator = super::orchestrator()?;
    let opts = StopOptions {
        kill,
        remove_network: network,
        remove_volumes: volumes,
        force,
        overlay: extra,
        overrides: options,
    };
    orchestrator.stop(path, &opts).await?;
    println!("Constellation stopped");
    Ok(())
}
