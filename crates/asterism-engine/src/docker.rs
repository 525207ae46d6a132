//! [`ContainerEngine`] implementation driving the `docker` CLI.
//!
//! Shells out through `tokio::process` rather than speaking the engine API
//! directly: the CLI is what operators have installed and debug with, and
//! every operation here has an obvious command-line equivalent.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::error::{EngineError, Result};
use crate::traits::ContainerEngine;
use crate::types::{ContainerSpec, ContainerState, ExecResult, Mount, PortBinding};

/// Docker CLI driver.
#[derive(Debug, Clone)]
pub struct DockerCli {
    binary: PathBuf,
}

impl DockerCli {
    /// Locate `docker` on the `PATH`.
    pub fn discover() -> Result<Self> {
        let binary = which::which("docker")
            .map_err(|e| EngineError::Unavailable(format!("docker not found: {e}")))?;
        debug!(binary = %binary.display(), "using docker CLI");
        Ok(Self { binary })
    }

    /// Use an explicit binary path.
    #[must_use]
    pub fn at(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    async fn output(&self, args: &[&str]) -> Result<std::process::Output> {
        debug!(?args, "docker");
        let output = Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;
        Ok(output)
    }

    /// Run a docker command, mapping failure to [`EngineError::Command`] or
    /// [`EngineError::NotFound`], and return trimmed stdout.
    async fn run(&self, args: &[&str]) -> Result<String> {
        let output = self.output(args).await?;
        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).trim().to_owned())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_owned();
            if is_not_found(&stderr) {
                Err(EngineError::NotFound(stderr))
            } else {
                Err(EngineError::command(args.join(" "), stderr))
            }
        }
    }

    async fn object_exists(&self, args: &[&str]) -> Result<bool> {
        match self.run(args).await {
            Ok(_) => Ok(true),
            Err(EngineError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

fn is_not_found(stderr: &str) -> bool {
    stderr.contains("No such") || stderr.contains("not found")
}

fn run_args(spec: &ContainerSpec, detach: bool) -> Vec<String> {
    let mut args: Vec<String> = vec!["run".into()];
    if detach {
        args.push("-d".into());
    } else {
        args.push("--rm".into());
    }
    args.push("--name".into());
    args.push(spec.name.clone());
    if let Some(network) = &spec.network {
        args.push("--network".into());
        args.push(network.clone());
    }
    if let Some(entrypoint) = &spec.entrypoint {
        args.push("--entrypoint".into());
        args.push(entrypoint.clone());
    }
    if let Some(working_dir) = &spec.working_dir {
        args.push("-w".into());
        args.push(working_dir.clone());
    }
    for (key, value) in &spec.environment {
        args.push("-e".into());
        args.push(format!("{key}={value}"));
    }
    for mount in &spec.mounts {
        let flag = match mount {
            Mount::Volume { name, target } => format!("{name}:{target}"),
            Mount::Bind { source, target } => format!("{source}:{target}"),
        };
        args.push("-v".into());
        args.push(flag);
    }
    for PortBinding {
        host_ip,
        host_port,
        container_port,
    } in &spec.ports
    {
        let flag = match host_ip {
            Some(ip) => format!("{ip}:{host_port}:{container_port}"),
            None => format!("{host_port}:{container_port}"),
        };
        args.push("-p".into());
        args.push(flag);
    }
    args.push(spec.image.clone());
    args.extend(spec.args.iter().cloned());
    args
}

#[async_trait]
impl ContainerEngine for DockerCli {
    async fn ensure_network(&self, name: &str) -> Result<()> {
        if !self.object_exists(&["network", "inspect", name]).await? {
            self.run(&["network", "create", name]).await?;
        }
        Ok(())
    }

    async fn remove_network(&self, name: &str) -> Result<()> {
        self.run(&["network", "rm", name]).await?;
        Ok(())
    }

    async fn network_exists(&self, name: &str) -> Result<bool> {
        self.object_exists(&["network", "inspect", name]).await
    }

    async fn ensure_volume(&self, name: &str) -> Result<()> {
        if !self.object_exists(&["volume", "inspect", name]).await? {
            self.run(&["volume", "create", name]).await?;
        }
        Ok(())
    }

    async fn remove_volume(&self, name: &str) -> Result<()> {
        self.run(&["volume", "rm", name]).await?;
        Ok(())
    }

    async fn volume_exists(&self, name: &str) -> Result<bool> {
        self.object_exists(&["volume", "inspect", name]).await
    }

    async fn pull_image(&self, image: &str) -> Result<()> {
        self.run(&["pull", image]).await?;
        Ok(())
    }

    async fn run_container(&self, spec: &ContainerSpec) -> Result<()> {
        let args = run_args(spec, true);
        let refs: Vec<&str> = args.iter().map(String::as_str).collect();
        self.run(&refs).await?;
        Ok(())
    }

    async fn run_once(&self, spec: &ContainerSpec) -> Result<String> {
        let args = run_args(spec, false);
        let refs: Vec<&str> = args.iter().map(String::as_str).collect();
        self.run(&refs).await
    }

    async fn exec(&self, container: &str, command: &[&str]) -> Result<ExecResult> {
        let mut args = vec!["exec", container];
        args.extend_from_slice(command);
        let output = self.output(&args).await?;
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        if !output.status.success() && is_not_found(&stderr) {
            return Err(EngineError::NotFound(stderr.trim().to_owned()));
        }
        Ok(ExecResult {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr,
        })
    }

    async fn write_text(&self, container: &str, path: &str, contents: &str) -> Result<()> {
        // Positional parameter keeps the path out of shell quoting.
        let mut child = Command::new(&self.binary)
            .args([
                "exec",
                "-i",
                container,
                "sh",
                "-c",
                r#"mkdir -p "$(dirname "$1")" && cat > "$1""#,
                "sh",
                path,
            ])
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()?;

        if let Some(stdin) = child.stdin.as_mut() {
            stdin.write_all(contents.as_bytes()).await?;
        }
        drop(child.stdin.take());

        let output = child.wait_with_output().await?;
        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_owned();
            if is_not_found(&stderr) {
                Err(EngineError::NotFound(stderr))
            } else {
                Err(EngineError::command(format!("write {path}"), stderr))
            }
        }
    }

    async fn read_text(&self, container: &str, path: &str) -> Result<String> {
        self.run(&["exec", container, "cat", path]).await
    }

    async fn copy_in(&self, container: &str, source: &Path, target: &str) -> Result<()> {
        let source = source.to_string_lossy();
        self.run(&["cp", source.as_ref(), &format!("{container}:{target}")])
            .await?;
        Ok(())
    }

    async fn stop_container(&self, name: &str, timeout: Duration) -> Result<()> {
        let secs = timeout.as_secs().to_string();
        self.run(&["stop", "-t", &secs, name]).await?;
        Ok(())
    }

    async fn kill_container(&self, name: &str) -> Result<()> {
        self.run(&["kill", name]).await?;
        Ok(())
    }

    async fn remove_container(&self, name: &str) -> Result<()> {
        self.run(&["rm", name]).await?;
        Ok(())
    }

    async fn container_state(&self, name: &str) -> Result<ContainerState> {
        match self
            .run(&["inspect", "--format", "{{.State.Status}}", name])
            .await
        {
            Ok(status) => Ok(ContainerState::parse(&status)),
            Err(EngineError::NotFound(_)) => Ok(ContainerState::Missing),
            Err(e) => Err(e),
        }
    }

    async fn list_containers(&self, prefix: &str) -> Result<Vec<String>> {
        let filter = format!("name={prefix}");
        let stdout = self
            .run(&["ps", "-a", "--filter", &filter, "--format", "{{.Names}}"])
            .await?;
        // The name filter matches substrings; anchor it ourselves.
        Ok(stdout
            .lines()
            .map(str::trim)
            .filter(|name| name.starts_with(prefix))
            .map(str::to_owned)
            .collect())
    }
}
