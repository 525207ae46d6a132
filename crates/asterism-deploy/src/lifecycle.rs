//! The deployment lifecycle: start, status, stop.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use asterism_config::{options, BaseConfig, DeploymentConfig};
use asterism_engine::{wait_running, ContainerEngine, EngineError};
use asterism_vault::EnvSnapshot;
use tracing::{info, warn};

use crate::admin;
use crate::configure;
use crate::error::{DeployError, Result};
use crate::notify::Notifier;
use crate::snapshot::{self, Persisted};
use crate::status::{self, StatusReport};
use crate::topology::{self, Role};

const START_POLL: Duration = Duration::from_millis(500);
const START_TIMEOUT: Duration = Duration::from_secs(60);
const STOP_TIMEOUT: Duration = Duration::from_secs(10);

/// How to start a constellation.
#[derive(Debug, Clone, Default)]
pub struct StartOptions {
    /// Overlay file name (without extension) in the deployment directory.
    pub overlay: Option<String>,
    /// `key.path=value` override fragments, applied in order.
    pub overrides: Vec<String>,
    /// Pull every referenced image first.
    pub pull: bool,
}

/// How to stop a constellation.
#[derive(Debug, Clone, Default)]
pub struct StopOptions {
    /// Kill containers instead of stopping them gracefully.
    pub kill: bool,
    /// Also remove the network.
    pub remove_network: bool,
    /// Also remove the volumes. Destroys data.
    pub remove_volumes: bool,
    /// Tear down even when the persisted snapshot cannot be read,
    /// rebuilding the configuration from disk.
    pub force: bool,
    /// Overlay used when `force` rebuilds the configuration.
    pub overlay: Option<String>,
    /// Override fragments used when `force` rebuilds the configuration.
    pub overrides: Vec<String>,
}

/// Drives a constellation through its lifecycle against a container
/// engine.
pub struct Orchestrator {
    engine: Arc<dyn ContainerEngine>,
    env: EnvSnapshot,
}

impl Orchestrator {
    /// An orchestrator over `engine`, reading secret store credentials
    /// from the process environment.
    #[must_use]
    pub fn new(engine: Arc<dyn ContainerEngine>) -> Self {
        Self {
            engine,
            env: EnvSnapshot::capture(),
        }
    }

    /// Replace the environment snapshot. Tests use this to inject
    /// credentials.
    #[must_use]
    pub fn with_env(mut self, env: EnvSnapshot) -> Self {
        self.env = env;
        self
    }

    /// Start the constellation described by `dir`.
    ///
    /// Refuses when any container with this constellation's prefix
    /// already exists, whatever its state. There is no rollback: on
    /// failure, containers started so far are left in place for
    /// inspection, and `stop --force` cleans up.
    pub async fn start(&self, dir: &Path, opts: &StartOptions) -> Result<DeploymentConfig> {
        let base = BaseConfig::load(dir)?;

        let prefix = format!("{}-", base.container_prefix);
        let existing = self.engine.list_containers(&prefix).await?;
        if !existing.is_empty() {
            return Err(DeployError::AlreadyRunning {
                prefix: base.container_prefix,
                containers: existing,
            });
        }

        let fragments = options::parse_fragments(&opts.overrides)?;
        let mut config = base.build(opts.overlay.as_deref(), &fragments)?;

        let store = config.vault.store(&self.env).await?;
        config.resolve_secrets(store.as_ref()).await?;

        let notifier = Notifier::new(config.webhook_url.as_deref());
        notifier.starting(&config.container_prefix).await;
        info!(prefix = %config.container_prefix, "starting constellation");

        match self.bring_up(&config, opts.pull).await {
            Ok(()) => {
                notifier
                    .completed(&config.container_prefix, &config.web_url)
                    .await;
                info!(
                    prefix = %config.container_prefix,
                    url = %config.web_url,
                    "constellation started"
                );
                Ok(config)
            }
            Err(e) => {
                warn!(prefix = %config.container_prefix, error = %e, "start failed");
                notifier
                    .failed(&config.container_prefix, &e.to_string())
                    .await;
                Err(e)
            }
        }
    }

    async fn bring_up(&self, config: &DeploymentConfig, pull: bool) -> Result<()> {
        let engine = self.engine.as_ref();

        if pull {
            for image in config.images.all() {
                let image = image.to_string();
                info!(image = %image, "pulling image");
                engine.pull_image(&image).await?;
            }
        }

        engine.ensure_network(&config.network).await?;
        for volume in config.volumes.values() {
            engine.ensure_volume(volume).await?;
        }

        for component in topology::build(config)? {
            let mut names = Vec::with_capacity(component.specs.len());
            for spec in &component.specs {
                info!(container = %spec.name, role = %component.role, "starting container");
                engine.run_container(spec).await?;
                wait_running(engine, &spec.name, START_POLL, START_TIMEOUT).await?;
                names.push(spec.name.clone());
            }
            configure::component(engine, component.role, &names, config).await?;
        }

        snapshot::persist(engine, config).await
    }

    /// Report the status of the constellation described by `dir`.
    ///
    /// Fails with [`DeployError::PersistedConfigUnreadable`] when the
    /// server container exists but its snapshot cannot be read.
    pub async fn status(&self, dir: &Path) -> Result<StatusReport> {
        let base = BaseConfig::load(dir)?;
        let persisted = snapshot::fetch(self.engine.as_ref(), &base).await?;
        status::report(self.engine.as_ref(), &base, &persisted).await
    }

    /// Run a user administration command against the running constellation.
    ///
    /// Driven by the persisted snapshot like `status`, so overrides applied
    /// at start time carry over. Returns the admin container's output.
    pub async fn admin(&self, dir: &Path, args: &[String]) -> Result<String> {
        let base = BaseConfig::load(dir)?;
        let config = match snapshot::fetch(self.engine.as_ref(), &base).await? {
            Persisted::Config(config) => *config,
            Persisted::Absent => {
                return Err(DeployError::NotDeployed(base.container_prefix));
            }
        };
        admin::run(self.engine.as_ref(), &config, args).await
    }

    /// Stop the constellation described by `dir`.
    ///
    /// Normally driven by the persisted snapshot. With a readable
    /// snapshot absent or broken, `force` rebuilds the configuration from
    /// disk and tears down whatever matches it.
    pub async fn stop(&self, dir: &Path, opts: &StopOptions) -> Result<()> {
        let base = BaseConfig::load(dir)?;

        let config = match snapshot::fetch(self.engine.as_ref(), &base).await {
            Ok(Persisted::Config(config)) => *config,
            Ok(Persisted::Absent) => {
                if opts.force {
                    self.rebuild(&base, opts)?
                } else {
                    info!(prefix = %base.container_prefix, "constellation is not running");
                    return Ok(());
                }
            }
            Err(DeployError::PersistedConfigUnreadable { reason, .. }) => {
                if opts.force {
                    warn!(reason = %reason, "snapshot unreadable; rebuilding from disk");
                    self.rebuild(&base, opts)?
                } else {
                    return Err(DeployError::StopRequiresForce(reason));
                }
            }
            Err(e) => return Err(e),
        };

        self.tear_down(&config, opts).await?;
        info!(prefix = %config.container_prefix, "constellation stopped");
        Ok(())
    }

    fn rebuild(&self, base: &BaseConfig, opts: &StopOptions) -> Result<DeploymentConfig> {
        let fragments = options::parse_fragments(&opts.overrides)?;
        Ok(base.build(opts.overlay.as_deref(), &fragments)?)
    }

    /// Tear down in reverse start order. A missing container is not an
    /// error here; partial constellations are exactly what force-stop is
    /// for.
    async fn tear_down(&self, config: &DeploymentConfig, opts: &StopOptions) -> Result<()> {
        let engine = self.engine.as_ref();
        let components = topology::build(config)?;

        for component in components.iter().rev() {
            let names: Vec<String> = if component.role == Role::Worker {
                // Live discovery covers strays beyond the configured scale.
                engine.list_containers(&config.worker_prefix()).await?
            } else {
                component.specs.iter().map(|s| s.name.clone()).collect()
            };

            for name in names {
                info!(container = %name, role = %component.role, "removing container");
                let halted = if opts.kill {
                    engine.kill_container(&name).await
                } else {
                    engine.stop_container(&name, STOP_TIMEOUT).await
                };
                ignore_missing(halted)?;
                ignore_missing(engine.remove_container(&name).await)?;
            }
        }

        if opts.remove_network {
            ignore_missing(engine.remove_network(&config.network).await)?;
        }
        if opts.remove_volumes {
            for volume in config.volumes.values() {
                ignore_missing(engine.remove_volume(volume).await)?;
            }
        }
        Ok(())
    }
}

fn ignore_missing(result: std::result::Result<(), EngineError>) -> Result<()> {
    match result {
        Ok(()) | Err(EngineError::NotFound(_)) => Ok(()),
        Err(e) => Err(e.into()),
    }
}
