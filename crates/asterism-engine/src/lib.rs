//! Container engine abstraction for Asterism.
//!
//! Orchestration code depends on the [`ContainerEngine`] trait only.
//! [`DockerCli`] drives the real `docker` binary through `tokio::process`;
//! [`MockEngine`] is a scriptable in-memory implementation used by the test
//! suites and exported for downstream tests.
//!
//! The trait deliberately stays at the level the orchestrator needs:
//! networks, volumes, image pulls, long-running containers, one-shot
//! containers, execs and file transfer. Anything fancier belongs in the
//! caller.

mod docker;
mod error;
mod mock;
mod traits;
mod types;

pub use docker::DockerCli;
pub use error::{EngineError, Result};
pub use mock::{MockContainer, MockEngine};
pub use traits::{wait_exec_ok, wait_running, ContainerEngine};
pub use types::{ContainerSpec, ContainerState, ExecResult, Mount, PortBinding};
