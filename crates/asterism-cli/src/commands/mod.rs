pub mod admin;
pub mod start;
pub mod status;
pub mod stop;

use std::sync::Arc;

use anyhow::Result;
use asterism_deploy::Orchestrator;
use asterism_engine::DockerCli;

/// An orchestrator over the local docker binary.
pub fn orchestrator() -> Result<Orchestrator> {
    let engine = Arc::new(DockerCli::discover()?);
    Ok(Orchestrator::new(engine))
}
