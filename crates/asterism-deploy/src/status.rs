//! Deployment status reporting.
//!
//! The report is deterministic: singleton containers sorted by role, one
//! worker block with configured and live counts, volumes sorted by logical
//! name, one network line. The `Display` rendering is the stable text form
//! the CLI prints and the tests assert on.

use std::fmt;

use asterism_config::{BaseConfig, ContainerNames};
use asterism_engine::{ContainerEngine, ContainerState};

use crate::error::Result;
use crate::snapshot::Persisted;

/// Overall state of a constellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeploymentState {
    /// Nothing exists.
    Absent,
    /// Every container is up.
    Running,
    /// Something exists but not everything is up.
    Degraded,
}

impl fmt::Display for DeploymentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absent => f.write_str("absent"),
            Self::Running => f.write_str("running"),
            Self::Degraded => f.write_str("degraded"),
        }
    }
}

/// One observed container.
#[derive(Debug, Clone)]
pub struct ContainerStatus {
    /// Role name.
    pub role: String,
    /// Container name.
    pub name: String,
    /// Observed state.
    pub state: ContainerState,
}

/// The worker block of a report.
#[derive(Debug, Clone)]
pub struct WorkerStatus {
    /// Replica count the configuration asks for.
    pub configured: u32,
    /// Every worker container found or expected, name and state,
    /// sorted by name.
    pub instances: Vec<(String, ContainerState)>,
}

impl WorkerStatus {
    /// How many worker containers are actually up.
    #[must_use]
    pub fn live(&self) -> usize {
        self.instances
            .iter()
            .filter(|(_, state)| state.is_running())
            .count()
    }
}

/// Full status of one constellation.
#[derive(Debug, Clone)]
pub struct StatusReport {
    /// Container prefix of the constellation.
    pub prefix: String,
    /// Overall state.
    pub state: DeploymentState,
    /// Singleton containers, sorted by role.
    pub containers: Vec<ContainerStatus>,
    /// Worker block.
    pub workers: WorkerStatus,
    /// Network name and whether it exists.
    pub network: (String, bool),
    /// Logical name, concrete name, and existence for each volume, sorted
    /// by logical name.
    pub volumes: Vec<(String, String, bool)>,
}

/// Gather a report. A decoded snapshot describes the constellation as it
/// was deployed; without one the local base configuration describes what
/// would be deployed.
pub async fn report(
    engine: &dyn ContainerEngine,
    base: &BaseConfig,
    persisted: &Persisted,
) -> Result<StatusReport> {
    let (prefix, network, names, volumes, configured_workers) = match persisted {
        Persisted::Config(config) => (
            config.container_prefix.clone(),
            config.network.clone(),
            config.containers.clone(),
            config.volumes.clone(),
            config.workers,
        ),
        Persisted::Absent => (
            base.container_prefix.clone(),
            base.network.clone(),
            base.containers.clone(),
            base.volumes.clone(),
            base.workers,
        ),
    };

    let containers = singleton_statuses(engine, &names).await?;
    let workers = worker_statuses(engine, &prefix, configured_workers).await?;

    let network_present = engine.network_exists(&network).await?;
    let mut volume_rows = Vec::with_capacity(volumes.len());
    for (logical, concrete) in &volumes {
        let present = engine.volume_exists(concrete).await?;
        volume_rows.push((logical.clone(), concrete.clone(), present));
    }

    let state = overall_state(&containers, &workers);

    Ok(StatusReport {
        prefix,
        state,
        containers,
        workers,
        network: (network, network_present),
        volumes: volume_rows,
    })
}

async fn singleton_statuses(
    engine: &dyn ContainerEngine,
    names: &ContainerNames,
) -> Result<Vec<ContainerStatus>> {
    let mut out = Vec::new();
    for (role, name) in names.by_role() {
        out.push(ContainerStatus {
            role: role.to_owned(),
            name: name.to_owned(),
            state: engine.container_state(name).await?,
        });
    }
    Ok(out)
}

/// Workers are discovered live by name prefix so the report covers strays
/// beyond the configured scale, then padded with configured replicas that
/// do not exist.
async fn worker_statuses(
    engine: &dyn ContainerEngine,
    prefix: &str,
    configured: u32,
) -> Result<WorkerStatus> {
    let worker_prefix = format!("{prefix}-worker-");
    let mut names = engine.list_containers(&worker_prefix).await?;
    for index in 1..=configured {
        let expected = format!("{worker_prefix}{index}");
        if !names.contains(&expected) {
            names.push(expected);
        }
    }
    // Replica order, not lexicographic: worker-10 comes after worker-2.
    names.sort_by_key(|name| {
        let index = name
            .strip_prefix(&worker_prefix)
            .and_then(|suffix| suffix.parse::<u32>().ok());
        (index.is_none(), index, name.clone())
    });

    let mut instances = Vec::with_capacity(names.len());
    for name in names {
        let state = engine.container_state(&name).await?;
        instances.push((name, state));
    }
    Ok(WorkerStatus {
        configured,
        instances,
    })
}

fn overall_state(containers: &[ContainerStatus], workers: &WorkerStatus) -> DeploymentState {
    let states = containers
        .iter()
        .map(|c| &c.state)
        .chain(workers.instances.iter().map(|(_, state)| state));

    let mut any_present = false;
    let mut all_running = true;
    for state in states {
        if !state.is_missing() {
            any_present = true;
        }
        if !state.is_running() {
            all_running = false;
        }
    }

    if !any_present {
        DeploymentState::Absent
    } else if all_running {
        DeploymentState::Running
    } else {
        DeploymentState::Degraded
    }
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Constellation {} ({})", self.prefix, self.state)?;
        for container in &self.containers {
            writeln!(
                f,
                "  {:<8} {:<24} {}",
                container.role, container.name, container.state
            )?;
        }
        writeln!(
            f,
            "  workers ({} configured, {} live)",
            self.workers.configured,
            self.workers.live()
        )?;
        for (name, state) in &self.workers.instances {
            writeln!(f, "    {name:<30} {state}")?;
        }
        let (network, present) = &self.network;
        writeln!(f, "network: {network} ({})", presence(*present))?;
        writeln!(f, "volumes:")?;
        for (logical, concrete, present) in &self.volumes {
            writeln!(f, "  {logical} -> {concrete} ({})", presence(*present))?;
        }
        Ok(())
    }
}

fn presence(present: bool) -> &'static str {
    if present {
        "present"
    } else {
        "missing"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(role: &str, state: ContainerState) -> ContainerStatus {
        ContainerStatus {
            role: role.to_owned(),
            name: format!("ow-{role}"),
            state,
        }
    }

    #[tokio::test]
    async fn workers_are_listed_in_replica_order() {
        let engine = asterism_engine::MockEngine::new();
        for index in [1, 2, 10, 11] {
            engine.seed(&format!("ow-worker-{index}"), ContainerState::Running);
        }

        let workers = worker_statuses(&engine, "ow", 11).await.unwrap();
        let names: Vec<&str> = workers
            .instances
            .iter()
            .map(|(name, _)| name.as_str())
            .collect();
        assert_eq!(names[0], "ow-worker-1");
        assert_eq!(names[1], "ow-worker-2");
        assert_eq!(names[9], "ow-worker-10");
        assert_eq!(names[10], "ow-worker-11");
    }

    #[test]
    fn all_missing_is_absent() {
        let containers = vec![
            status("cache", ContainerState::Missing),
            status("server", ContainerState::Missing),
        ];
        let workers = WorkerStatus {
            configured: 1,
            instances: vec![("ow-worker-1".to_owned(), ContainerState::Missing)],
        };
        assert_eq!(overall_state(&containers, &workers), DeploymentState::Absent);
    }

    #[test]
    fn anything_not_running_degrades() {
        let containers = vec![
            status("cache", ContainerState::Running),
            status("server", ContainerState::Exited),
        ];
        let workers = WorkerStatus {
            configured: 0,
            instances: vec![],
        };
        assert_eq!(
            overall_state(&containers, &workers),
            DeploymentState::Degraded
        );
    }

    #[test]
    fn paused_counts_as_present_but_not_running() {
        let containers = vec![status(
            "server",
            ContainerState::Other("paused".to_owned()),
        )];
        let workers = WorkerStatus {
            configured: 0,
            instances: vec![],
        };
        assert_eq!(
            overall_state(&containers, &workers),
            DeploymentState::Degraded
        );
    }

    #[test]
    fn display_is_stable() {
        let report = StatusReport {
            prefix: "ow".to_owned(),
            state: DeploymentState::Running,
            containers: vec![status("cache", ContainerState::Running)],
            workers: WorkerStatus {
                configured: 1,
                instances: vec![("ow-worker-1".to_owned(), ContainerState::Running)],
            },
            network: ("ow_net".to_owned(), true),
            volumes: vec![("data".to_owned(), "ow_data".to_owned(), true)],
        };
        let text = report.to_string();
        assert!(text.starts_with("Constellation ow (running)\n"));
        assert!(text.contains("workers (1 configured, 1 live)"));
        assert!(text.contains("network: ow_net (present)"));
        assert!(text.contains("data -> ow_data (present)"));
    }
}
