//! Reading and writing the configuration snapshot held by the server
//! container.
//!
//! The snapshot is the source of truth for every command run against an
//! existing constellation. Three outcomes matter: the server container is
//! absent (nothing deployed), the snapshot reads back cleanly, or the
//! container exists but the snapshot cannot be read. The last case is a
//! broken deployment and gets its own error so callers can demand `force`.

use asterism_config::{BaseConfig, DeploymentConfig, SNAPSHOT_PATH};
use asterism_engine::ContainerEngine;
use tracing::debug;

use crate::error::{DeployError, Result};

/// What the server container had to say about the deployment.
#[derive(Debug)]
pub enum Persisted {
    /// The server container does not exist.
    Absent,
    /// The decoded configuration snapshot.
    Config(Box<DeploymentConfig>),
}

/// Fetch the persisted configuration for a deployment directory.
pub async fn fetch(engine: &dyn ContainerEngine, base: &BaseConfig) -> Result<Persisted> {
    let server = base.server_container();
    if engine.container_state(server).await?.is_missing() {
        debug!(container = %server, "server container absent");
        return Ok(Persisted::Absent);
    }

    let unreadable = |reason: String| DeployError::PersistedConfigUnreadable {
        container: server.to_owned(),
        reason,
    };

    let text = engine
        .read_text(server, SNAPSHOT_PATH)
        .await
        .map_err(|e| unreadable(e.to_string()))?;
    let config = DeploymentConfig::decode_snapshot(&text, &base.path)
        .map_err(|e| unreadable(e.to_string()))?;
    Ok(Persisted::Config(Box::new(config)))
}

/// Write the snapshot into the server container.
pub async fn persist(engine: &dyn ContainerEngine, config: &DeploymentConfig) -> Result<()> {
    let encoded = config.encode_snapshot()?;
    engine
        .write_text(&config.containers.server, SNAPSHOT_PATH, &encoded)
        .await?;
    debug!(container = %config.containers.server, "configuration snapshot persisted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures;
    use asterism_engine::{ContainerState, MockEngine};

    fn base_for(config: &DeploymentConfig, dir: &std::path::Path) -> BaseConfig {
        std::fs::write(
            dir.join(asterism_config::CONFIG_BASENAME),
            format!(
                "container_prefix: {}\nnetwork: {}\n",
                config.container_prefix, config.network
            ),
        )
        .unwrap();
        BaseConfig::load(dir).unwrap()
    }

    #[tokio::test]
    async fn absent_server_means_absent() {
        let engine = MockEngine::new();
        let dir = tempfile::tempdir().unwrap();
        let base = base_for(&test_fixtures::config(), dir.path());

        assert!(matches!(
            fetch(&engine, &base).await.unwrap(),
            Persisted::Absent
        ));
    }

    #[tokio::test]
    async fn persist_then_fetch_round_trips() {
        let engine = MockEngine::new();
        let config = test_fixtures::config();
        let dir = tempfile::tempdir().unwrap();
        let base = base_for(&config, dir.path());

        engine.seed("ow-server", ContainerState::Running);
        persist(&engine, &config).await.unwrap();

        match fetch(&engine, &base).await.unwrap() {
            Persisted::Config(found) => {
                assert_eq!(found.container_prefix, "ow");
                assert_eq!(found.workers, 2);
                // Re-anchored to the local deployment directory.
                assert_eq!(found.path, dir.path());
            }
            Persisted::Absent => panic!("expected a snapshot"),
        }
    }

    #[tokio::test]
    async fn present_server_without_snapshot_is_unreadable() {
        let engine = MockEngine::new();
        let dir = tempfile::tempdir().unwrap();
        let base = base_for(&test_fixtures::config(), dir.path());

        engine.seed("ow-server", ContainerState::Exited);
        let err = fetch(&engine, &base).await.unwrap_err();
        assert!(matches!(err, DeployError::PersistedConfigUnreadable { .. }));
    }

    #[tokio::test]
    async fn garbage_snapshot_is_unreadable() {
        let engine = MockEngine::new();
        let dir = tempfile::tempdir().unwrap();
        let base = base_for(&test_fixtures::config(), dir.path());

        engine.seed("ow-server", ContainerState::Running);
        engine
            .write_text("ow-server", SNAPSHOT_PATH, "not a snapshot")
            .await
            .unwrap();

        let err = fetch(&engine, &base).await.unwrap_err();
        assert!(matches!(err, DeployError::PersistedConfigUnreadable { .. }));
    }
}
