//! Declarative descriptions of containers and their observed state.

use std::collections::BTreeMap;
use std::fmt;

/// Where a container path gets its data from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mount {
    /// A named engine volume.
    Volume {
        /// Volume name.
        name: String,
        /// Mount point inside the container.
        target: String,
    },
    /// A host directory or file.
    Bind {
        /// Host path.
        source: String,
        /// Mount point inside the container.
        target: String,
    },
}

/// A published port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortBinding {
    /// Host interface to bind, `None` for all interfaces.
    pub host_ip: Option<String>,
    /// Host port.
    pub host_port: u16,
    /// Container port.
    pub container_port: u16,
}

/// Everything needed to create and start one container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerSpec {
    /// Container name.
    pub name: String,
    /// Image reference, e.g. `redis:6`.
    pub image: String,
    /// Command arguments after the image.
    pub args: Vec<String>,
    /// Entrypoint override.
    pub entrypoint: Option<String>,
    /// Environment variables.
    pub environment: BTreeMap<String, String>,
    /// Volume and bind mounts.
    pub mounts: Vec<Mount>,
    /// Published ports.
    pub ports: Vec<PortBinding>,
    /// Network to attach to.
    pub network: Option<String>,
    /// Working directory inside the container.
    pub working_dir: Option<String>,
}

impl ContainerSpec {
    /// A spec with just a name and image; fill the rest in directly.
    #[must_use]
    pub fn new(name: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
            ..Self::default()
        }
    }
}

/// Observed lifecycle state of a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerState {
    /// No container with this name exists.
    Missing,
    /// Created but never started.
    Created,
    /// Running.
    Running,
    /// Stopped after running.
    Exited,
    /// Any other state the engine reports (paused, restarting, dead, ...).
    Other(String),
}

impl ContainerState {
    /// Parse an engine status string.
    #[must_use]
    pub fn parse(status: &str) -> Self {
        match status.trim() {
            "created" => Self::Created,
            "running" => Self::Running,
            "exited" => Self::Exited,
            other => Self::Other(other.to_owned()),
        }
    }

    /// True only for [`ContainerState::Missing`]. Every existing container,
    /// whatever its state, counts as present.
    #[must_use]
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }

    /// True when the container is up.
    #[must_use]
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }
}

impl fmt::Display for ContainerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => f.write_str("missing"),
            Self::Created => f.write_str("created"),
            Self::Running => f.write_str("running"),
            Self::Exited => f.write_str("exited"),
            Self::Other(s) => f.write_str(s),
        }
    }
}

/// Outcome of a command executed inside a container.
#[derive(Debug, Clone, Default)]
pub struct ExecResult {
    /// Process exit code, `-1` when killed by a signal.
    pub exit_code: i32,
    /// Captured stdout.
    pub stdout: String,
    /// Captured stderr.
    pub stderr: String,
}

impl ExecResult {
    /// True on a zero exit code.
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}
