//! One-shot user administration commands against a running constellation.
//!
//! The admin image runs once with the data volume mounted, its arguments
//! passed through verbatim (`add-users`, `grant`, ...), and its logs are
//! returned to the caller.

use asterism_config::{volume, ConfigError, DeploymentConfig};
use asterism_engine::{ContainerEngine, ContainerSpec, Mount};
use tracing::info;

use crate::error::Result;

/// Run the admin image once against `config`'s data volume and return its
/// output.
pub async fn run(
    engine: &dyn ContainerEngine,
    config: &DeploymentConfig,
    args: &[String],
) -> Result<String> {
    let image = config
        .images
        .admin
        .as_ref()
        .ok_or_else(|| ConfigError::MissingKey("admin.image".to_owned()))?;
    let data = config
        .volumes
        .get(volume::DATA)
        .ok_or_else(|| ConfigError::MissingKey(format!("volumes.{}", volume::DATA)))?;

    let mut spec = ContainerSpec::new(
        format!("{}-admin", config.container_prefix),
        image.to_string(),
    );
    spec.args = args.to_vec();
    spec.mounts.push(Mount::Volume {
        name: data.clone(),
        target: "/data".to_owned(),
    });

    info!(image = %image, command = ?args, "running admin command");
    Ok(engine.run_once(&spec).await?)
}
