//! Implementation of the `asterism admin` command.

use std::path::Path;

use anyhow::Result;

pub async fn run(path: &Path, args: Vec<String>) -> Result<()> {
    let orchestrator = super::orchestrator()?;
    let output = orchestrator.admin(path, &args).await?;
    print!("{output}");
    Ok(())
}
