//! The [`ContainerEngine`] trait and the polling helpers built on it.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{EngineError, Result};
use crate::types::{ContainerSpec, ContainerState, ExecResult};

/// Abstraction over a container engine.
///
/// Orchestration code only talks to this trait; [`crate::DockerCli`] drives
/// a real engine and [`crate::MockEngine`] backs the test suites.
#[async_trait]
pub trait ContainerEngine: Send + Sync {
    /// Create the named network if it does not exist.
    async fn ensure_network(&self, name: &str) -> Result<()>;

    /// Remove the named network.
    async fn remove_network(&self, name: &str) -> Result<()>;

    /// Whether the named network exists.
    async fn network_exists(&self, name: &str) -> Result<bool>;

    /// Create the named volume if it does not exist.
    async fn ensure_volume(&self, name: &str) -> Result<()>;

    /// Remove the named volume.
    async fn remove_volume(&self, name: &str) -> Result<()>;

    /// Whether the named volume exists.
    async fn volume_exists(&self, name: &str) -> Result<bool>;

    /// Pull an image.
    async fn pull_image(&self, image: &str) -> Result<()>;

    /// Create and start a long-running container.
    async fn run_container(&self, spec: &ContainerSpec) -> Result<()>;

    /// Run a container to completion, remove it, and return its output.
    /// Fails if the container exits non-zero.
    async fn run_once(&self, spec: &ContainerSpec) -> Result<String>;

    /// Execute a command inside a running container.
    async fn exec(&self, container: &str, command: &[&str]) -> Result<ExecResult>;

    /// Write text to a path inside a container, creating parent
    /// directories as needed.
    async fn write_text(&self, container: &str, path: &str, contents: &str) -> Result<()>;

    /// Read a text file from inside a container.
    async fn read_text(&self, container: &str, path: &str) -> Result<String>;

    /// Copy a host file into a container.
    async fn copy_in(&self, container: &str, source: &Path, target: &str) -> Result<()>;

    /// Stop a container, giving it `timeout` to exit gracefully.
    async fn stop_container(&self, name: &str, timeout: Duration) -> Result<()>;

    /// Kill a container immediately.
    async fn kill_container(&self, name: &str) -> Result<()>;

    /// Remove a stopped container.
    async fn remove_container(&self, name: &str) -> Result<()>;

    /// Observed state of the named container.
    async fn container_state(&self, name: &str) -> Result<ContainerState>;

    /// Names of all containers (running or not) whose name starts with
    /// `prefix`.
    async fn list_containers(&self, prefix: &str) -> Result<Vec<String>>;
}

/// Poll until the container reports running.
pub async fn wait_running(
    engine: &dyn ContainerEngine,
    name: &str,
    poll: Duration,
    timeout: Duration,
) -> Result<()> {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let state = engine.container_state(name).await?;
        if state.is_running() {
            return Ok(());
        }
        if matches!(state, ContainerState::Exited) {
            return Err(EngineError::UnexpectedExit {
                name: name.to_owned(),
            });
        }
        if tokio::time::Instant::now() >= deadline {
            return Err(EngineError::StartTimeout {
                name: name.to_owned(),
                timeout,
            });
        }
        tokio::time::sleep(poll).await;
    }
}

/// Poll an exec probe until it exits zero with `expect` in its stdout.
pub async fn wait_exec_ok(
    engine: &dyn ContainerEngine,
    name: &str,
    command: &[&str],
    expect: &str,
    poll: Duration,
    timeout: Duration,
) -> Result<()> {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let result = engine.exec(name, command).await?;
        if result.success() && result.stdout.contains(expect) {
            return Ok(());
        }
        debug!(
            container = %name,
            exit_code = result.exit_code,
            "probe not ready"
        );
        if tokio::time::Instant::now() >= deadline {
            return Err(EngineError::ProbeTimeout {
                name: name.to_owned(),
                probe: command.join(" "),
                timeout,
            });
        }
        tokio::time::sleep(poll).await;
    }
}
