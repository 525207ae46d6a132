//! In-memory [`ContainerEngine`] for tests.
//!
//! Tracks networks, volumes, containers and in-container files, records
//! every exec, and can be scripted to answer probes or fail specific
//! container starts.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{EngineError, Result};
use crate::traits::ContainerEngine;
use crate::types::{ContainerSpec, ContainerState, ExecResult};

/// One mock container.
#[derive(Debug, Clone)]
pub struct MockContainer {
    /// The spec it was started with.
    pub spec: ContainerSpec,
    /// Current state.
    pub state: ContainerState,
    /// Files written or copied into it, path to contents.
    pub files: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
struct ExecScript {
    container: String,
    prefix: Vec<String>,
    exit_code: i32,
    stdout: String,
}

#[derive(Debug, Default)]
struct State {
    networks: BTreeSet<String>,
    volumes: BTreeSet<String>,
    pulled: Vec<String>,
    containers: BTreeMap<String, MockContainer>,
    one_shots: Vec<ContainerSpec>,
    exec_log: Vec<(String, Vec<String>)>,
    scripts: Vec<ExecScript>,
    fail_run: BTreeSet<String>,
}

/// Scriptable in-memory engine.
#[derive(Debug, Default)]
pub struct MockEngine {
    state: Mutex<State>,
}

impl MockEngine {
    /// A fresh, empty engine.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Script the response for execs in `container` whose command starts
    /// with `prefix`. Later scripts win over earlier ones.
    pub fn script_exec(&self, container: &str, prefix: &[&str], exit_code: i32, stdout: &str) {
        self.lock().scripts.push(ExecScript {
            container: container.to_owned(),
            prefix: prefix.iter().map(|s| (*s).to_owned()).collect(),
            exit_code,
            stdout: stdout.to_owned(),
        });
    }

    /// Make the next `run_container` for `name` fail.
    pub fn fail_run(&self, name: &str) {
        self.lock().fail_run.insert(name.to_owned());
    }

    /// Insert a container directly, without going through `run_container`.
    pub fn seed(&self, name: &str, state: ContainerState) {
        self.lock().containers.insert(
            name.to_owned(),
            MockContainer {
                spec: ContainerSpec::new(name, "seeded"),
                state,
                files: BTreeMap::new(),
            },
        );
    }

    /// Force a container into a state.
    pub fn set_state(&self, name: &str, state: ContainerState) {
        if let Some(container) = self.lock().containers.get_mut(name) {
            container.state = state;
        }
    }

    /// Snapshot of one container.
    #[must_use]
    pub fn container(&self, name: &str) -> Option<MockContainer> {
        self.lock().containers.get(name).cloned()
    }

    /// Contents of a file inside a container.
    #[must_use]
    pub fn file(&self, container: &str, path: &str) -> Option<String> {
        self.lock()
            .containers
            .get(container)
            .and_then(|c| c.files.get(path).cloned())
    }

    /// Existing networks.
    #[must_use]
    pub fn networks(&self) -> BTreeSet<String> {
        self.lock().networks.clone()
    }

    /// Existing volumes.
    #[must_use]
    pub fn volumes(&self) -> BTreeSet<String> {
        self.lock().volumes.clone()
    }

    /// Every image pulled, in order.
    #[must_use]
    pub fn pulled(&self) -> Vec<String> {
        self.lock().pulled.clone()
    }

    /// Every one-shot container run, in order.
    #[must_use]
    pub fn one_shots(&self) -> Vec<ContainerSpec> {
        self.lock().one_shots.clone()
    }

    /// Every exec issued, in order.
    #[must_use]
    pub fn exec_log(&self) -> Vec<(String, Vec<String>)> {
        self.lock().exec_log.clone()
    }
}

#[async_trait]
impl ContainerEngine for MockEngine {
    async fn ensure_network(&self, name: &str) -> Result<()> {
        self.lock().networks.insert(name.to_owned());
        Ok(())
    }

    async fn remove_network(&self, name: &str) -> Result<()> {
        if self.lock().networks.remove(name) {
            Ok(())
        } else {
            Err(EngineError::NotFound(format!("network {name}")))
        }
    }

    async fn network_exists(&self, name: &str) -> Result<bool> {
        Ok(self.lock().networks.contains(name))
    }

    async fn ensure_volume(&self, name: &str) -> Result<()> {
        self.lock().volumes.insert(name.to_owned());
        Ok(())
    }

    async fn remove_volume(&self, name: &str) -> Result<()> {
        if self.lock().volumes.remove(name) {
            Ok(())
        } else {
            Err(EngineError::NotFound(format!("volume {name}")))
        }
    }

    async fn volume_exists(&self, name: &str) -> Result<bool> {
        Ok(self.lock().volumes.contains(name))
    }

    async fn pull_image(&self, image: &str) -> Result<()> {
        self.lock().pulled.push(image.to_owned());
        Ok(())
    }

    async fn run_container(&self, spec: &ContainerSpec) -> Result<()> {
        let mut state = self.lock();
        if state.fail_run.remove(&spec.name) {
            return Err(EngineError::command(
                format!("run {}", spec.name),
                "scripted failure",
            ));
        }
        state.containers.insert(
            spec.name.clone(),
            MockContainer {
                spec: spec.clone(),
                state: ContainerState::Running,
                files: BTreeMap::new(),
            },
        );
        Ok(())
    }

    async fn run_once(&self, spec: &ContainerSpec) -> Result<String> {
        self.lock().one_shots.push(spec.clone());
        Ok(String::new())
    }

    async fn exec(&self, container: &str, command: &[&str]) -> Result<ExecResult> {
        let mut state = self.lock();
        if !state.containers.contains_key(container) {
            return Err(EngineError::NotFound(format!("container {container}")));
        }
        let command: Vec<String> = command.iter().map(|s| (*s).to_owned()).collect();
        state.exec_log.push((container.to_owned(), command.clone()));

        let scripted = state
            .scripts
            .iter()
            .rev()
            .find(|s| s.container == container && command.starts_with(&s.prefix));
        Ok(match scripted {
            Some(script) => ExecResult {
                exit_code: script.exit_code,
                stdout: script.stdout.clone(),
                stderr: String::new(),
            },
            None => ExecResult::default(),
        })
    }

    async fn write_text(&self, container: &str, path: &str, contents: &str) -> Result<()> {
        let mut state = self.lock();
        let container = state
            .containers
            .get_mut(container)
            .ok_or_else(|| EngineError::NotFound(format!("container {container}")))?;
        container.files.insert(path.to_owned(), contents.to_owned());
        Ok(())
    }

    async fn read_text(&self, container: &str, path: &str) -> Result<String> {
        let state = self.lock();
        let found = state
            .containers
            .get(container)
            .ok_or_else(|| EngineError::NotFound(format!("container {container}")))?;
        found
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| EngineError::NotFound(format!("{container}:{path}")))
    }

    async fn copy_in(&self, container: &str, source: &Path, target: &str) -> Result<()> {
        let mut state = self.lock();
        let container = state
            .containers
            .get_mut(container)
            .ok_or_else(|| EngineError::NotFound(format!("container {container}")))?;
        container
            .files
            .insert(target.to_owned(), format!("copy:{}", source.display()));
        Ok(())
    }

    async fn stop_container(&self, name: &str, _timeout: Duration) -> Result<()> {
        let mut state = self.lock();
        let container = state
            .containers
            .get_mut(name)
            .ok_or_else(|| EngineError::NotFound(format!("container {name}")))?;
        container.state = ContainerState::Exited;
        Ok(())
    }

    async fn kill_container(&self, name: &str) -> Result<()> {
        let mut state = self.lock();
        let container = state
            .containers
            .get_mut(name)
            .ok_or_else(|| EngineError::NotFound(format!("container {name}")))?;
        container.state = ContainerState::Exited;
        Ok(())
    }

    async fn remove_container(&self, name: &str) -> Result<()> {
        let mut state = self.lock();
        state
            .containers
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| EngineError::NotFound(format!("container {name}")))
    }

    async fn container_state(&self, name: &str) -> Result<ContainerState> {
        Ok(self
            .lock()
            .containers
            .get(name)
            .map(|c| c.state.clone())
            .unwrap_or(ContainerState::Missing))
    }

    async fn list_containers(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .lock()
            .containers
            .keys()
            .filter(|name| name.starts_with(prefix))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{wait_exec_ok, wait_running};

    #[tokio::test]
    async fn run_then_state_then_remove() {
        let engine = MockEngine::new();
        let spec = ContainerSpec::new("ow-cache", "redis:6");
        engine.run_container(&spec).await.unwrap();

        assert!(engine.container_state("ow-cache").await.unwrap().is_running());
        wait_running(&engine, "ow-cache", Duration::from_millis(1), Duration::from_millis(10))
            .await
            .unwrap();

        engine
            .stop_container("ow-cache", Duration::from_secs(10))
            .await
            .unwrap();
        assert_eq!(
            engine.container_state("ow-cache").await.unwrap(),
            ContainerState::Exited
        );

        engine.remove_container("ow-cache").await.unwrap();
        assert!(engine.container_state("ow-cache").await.unwrap().is_missing());
        assert!(matches!(
            engine.remove_container("ow-cache").await,
            Err(EngineError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn waiting_on_an_exited_container_fails_fast() {
        let engine = MockEngine::new();
        engine.seed("ow-server", ContainerState::Exited);

        let started = tokio::time::Instant::now();
        let err = wait_running(
            &engine,
            "ow-server",
            Duration::from_millis(20),
            Duration::from_millis(300),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, EngineError::UnexpectedExit { ref name } if name == "ow-server"));
        assert!(started.elapsed() < Duration::from_millis(300));
    }

    #[tokio::test]
    async fn scripted_exec_answers_probes() {
        let engine = MockEngine::new();
        engine.seed("ow-cache", ContainerState::Running);
        engine.script_exec("ow-cache", &["redis-cli", "ping"], 0, "PONG");

        wait_exec_ok(
            &engine,
            "ow-cache",
            &["redis-cli", "ping"],
            "PONG",
            Duration::from_millis(1),
            Duration::from_millis(10),
        )
        .await
        .unwrap();

        assert_eq!(engine.exec_log().len(), 1);
    }

    #[tokio::test]
    async fn probe_times_out_without_the_expected_output() {
        let engine = MockEngine::new();
        engine.seed("ow-cache", ContainerState::Running);
        engine.script_exec("ow-cache", &["redis-cli", "ping"], 1, "");

        let err = wait_exec_ok(
            &engine,
            "ow-cache",
            &["redis-cli", "ping"],
            "PONG",
            Duration::from_millis(1),
            Duration::from_millis(5),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, EngineError::ProbeTimeout { .. }));
    }

    #[tokio::test]
    async fn files_round_trip_and_missing_files_error() {
        let engine = MockEngine::new();
        engine.seed("ow-server", ContainerState::Running);

        engine
            .write_text("ow-server", "/asterism-config", "payload")
            .await
            .unwrap();
        assert_eq!(
            engine.read_text("ow-server", "/asterism-config").await.unwrap(),
            "payload"
        );
        assert!(matches!(
            engine.read_text("ow-server", "/nope").await,
            Err(EngineError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn scripted_run_failure() {
        let engine = MockEngine::new();
        engine.fail_run("ow-web");
        let err = engine
            .run_container(&ContainerSpec::new("ow-web", "asterism/web:main"))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Command { .. }));
    }

    #[tokio::test]
    async fn list_is_prefix_anchored() {
        let engine = MockEngine::new();
        engine.seed("ow-worker-1", ContainerState::Running);
        engine.seed("ow-worker-2", ContainerState::Exited);
        engine.seed("other-worker-1", ContainerState::Running);

        let names = engine.list_containers("ow-worker-").await.unwrap();
        assert_eq!(names, vec!["ow-worker-1", "ow-worker-2"]);
    }
}
