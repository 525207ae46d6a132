//! Implementation of the `asterism status` command.

use std::path::Path;

use anyhow::Result;

pub async fn run(path: &Path) -> Result<()> {
    let orchestrator = super::orchestrator()?;
    let report = orchestrator.status(path).await?;
    print!("{report}");
    Ok(())
}
