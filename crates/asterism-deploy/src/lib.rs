//! Constellation lifecycle orchestration for Asterism.
//!
//! Ties the other crates together: builds the topology from a resolved
//! [`asterism_config::DeploymentConfig`], drives it through an
//! [`asterism_engine::ContainerEngine`], and keeps the configuration
//! snapshot inside the server container so status and stop work from any
//! checkout of the deployment directory.
//!
//! Entry point is [`Orchestrator`] with its operations: `start`, `status`,
//! `stop` and `admin`.

mod admin;
mod configure;
mod error;
mod lifecycle;
mod notify;
mod snapshot;
mod status;
mod topology;

#[cfg(test)]
mod test_fixtures;

pub use error::{DeployError, Result};
pub use lifecycle::{Orchestrator, StartOptions, StopOptions};
pub use notify::Notifier;
pub use snapshot::{fetch as fetch_snapshot, persist as persist_snapshot, Persisted};
pub use status::{ContainerStatus, DeploymentState, StatusReport, WorkerStatus};
pub use topology::{build as build_topology, cache_url, Component, Role};
