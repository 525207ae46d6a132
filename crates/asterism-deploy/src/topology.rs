//! Builds the constellation topology from a resolved configuration.
//!
//! The topology is a fixed, ordered list of components. The order matters:
//! each component may depend on everything started before it, and the
//! proxy always comes last so it never fronts a half-started constellation.

use std::fmt;

use asterism_config::{volume, ConfigError, DeploymentConfig};
use asterism_engine::{ContainerSpec, Mount, PortBinding};

use crate::error::Result;

/// Port the application server listens on inside the network.
pub const SERVER_PORT: u16 = 8321;

/// Port the cache listens on inside the network.
pub const CACHE_PORT: u16 = 6379;

/// The roles of a constellation, in start order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Role {
    /// Cache, started first so everything else can reach it.
    Cache,
    /// The primary application server. Holds the persisted snapshot.
    Server,
    /// Scalable background worker.
    Worker,
    /// Web front end.
    Web,
    /// Optional reverse proxy, always last.
    Proxy,
}

impl Role {
    /// Stable lowercase name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cache => "cache",
            Self::Server => "server",
            Self::Worker => "worker",
            Self::Web => "web",
            Self::Proxy => "proxy",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One component of the constellation: a role and the container specs its
/// replicas run with (singleton roles have exactly one).
#[derive(Debug, Clone)]
pub struct Component {
    /// The role.
    pub role: Role,
    /// One spec per replica, in replica order.
    pub specs: Vec<ContainerSpec>,
}

fn volume_name<'a>(config: &'a DeploymentConfig, key: &str) -> Result<&'a str> {
    config
        .volumes
        .get(key)
        .map(String::as_str)
        .ok_or_else(|| ConfigError::MissingKey(format!("volumes.{key}")).into())
}

/// The `CACHE_URL` value injected into server and worker containers.
#[must_use]
pub fn cache_url(config: &DeploymentConfig) -> String {
    format!("redis://{}:{CACHE_PORT}", config.containers.cache)
}

fn app_environment(config: &DeploymentConfig) -> std::collections::BTreeMap<String, String> {
    let mut env = config.server_env.clone();
    env.insert("CACHE_URL".to_owned(), cache_url(config));
    env
}

fn cache_spec(config: &DeploymentConfig) -> Result<ContainerSpec> {
    let mut spec = ContainerSpec::new(&config.containers.cache, config.images.cache.to_string());
    spec.network = Some(config.network.clone());
    spec.mounts.push(Mount::Volume {
        name: volume_name(config, volume::CACHE)?.to_owned(),
        target: "/data".to_owned(),
    });
    Ok(spec)
}

fn server_spec(config: &DeploymentConfig) -> Result<ContainerSpec> {
    let mut spec = ContainerSpec::new(&config.containers.server, config.images.server.to_string());
    spec.network = Some(config.network.clone());
    spec.environment = app_environment(config);
    spec.mounts.push(Mount::Volume {
        name: volume_name(config, volume::DATA)?.to_owned(),
        target: "/data".to_owned(),
    });
    Ok(spec)
}

fn worker_spec(config: &DeploymentConfig, index: u32) -> Result<ContainerSpec> {
    let mut spec = ContainerSpec::new(config.worker_name(index), config.images.worker.to_string());
    spec.network = Some(config.network.clone());
    spec.environment = app_environment(config);
    spec.mounts.push(Mount::Volume {
        name: volume_name(config, volume::DATA)?.to_owned(),
        target: "/data".to_owned(),
    });
    Ok(spec)
}

fn web_spec(config: &DeploymentConfig) -> Result<ContainerSpec> {
    let mut spec = ContainerSpec::new(&config.containers.web, config.images.web.to_string());
    spec.network = Some(config.network.clone());
    spec.mounts.push(Mount::Volume {
        name: volume_name(config, volume::DATA)?.to_owned(),
        target: "/data".to_owned(),
    });
    if config
        .styling
        .as_ref()
        .is_some_and(|s| s.sass_variables.is_some())
    {
        spec.mounts.push(Mount::Volume {
            name: volume_name(config, volume::CSS)?.to_owned(),
            target: "/static/css".to_owned(),
        });
    }
    if let Some(documents) = config.volumes.get(volume::DOCUMENTS) {
        spec.mounts.push(Mount::Volume {
            name: documents.clone(),
            target: "/documents".to_owned(),
        });
    }
    if config.web_dev_mode {
        // Only published in dev mode; otherwise the proxy is the way in.
        spec.ports.push(PortBinding {
            host_ip: Some("127.0.0.1".to_owned()),
            host_port: config.web_port,
            container_port: config.web_port,
        });
    }
    Ok(spec)
}

fn proxy_spec(config: &DeploymentConfig) -> Result<Option<ContainerSpec>> {
    let (Some(proxy), Some(name), Some(image)) = (
        &config.proxy,
        &config.containers.proxy,
        &config.images.proxy,
    ) else {
        return Ok(None);
    };

    let mut spec = ContainerSpec::new(name, image.to_string());
    spec.network = Some(config.network.clone());
    spec.args = vec![
        proxy.hostname.clone(),
        config.web_port.to_string(),
    ];
    spec.mounts.push(Mount::Volume {
        name: volume_name(config, volume::PROXY_LOGS)?.to_owned(),
        target: "/var/log/proxy".to_owned(),
    });
    spec.ports.push(PortBinding {
        host_ip: None,
        host_port: proxy.port_http,
        container_port: 80,
    });
    spec.ports.push(PortBinding {
        host_ip: None,
        host_port: proxy.port_https,
        container_port: 443,
    });
    Ok(Some(spec))
}

/// Build the ordered component list for a configuration.
pub fn build(config: &DeploymentConfig) -> Result<Vec<Component>> {
    let mut components = vec![
        Component {
            role: Role::Cache,
            specs: vec![cache_spec(config)?],
        },
        Component {
            role: Role::Server,
            specs: vec![server_spec(config)?],
        },
        Component {
            role: Role::Worker,
            specs: (1..=config.workers)
                .map(|index| worker_spec(config, index))
                .collect::<Result<_>>()?,
        },
        Component {
            role: Role::Web,
            specs: vec![web_spec(config)?],
        },
    ];
    if let Some(spec) = proxy_spec(config)? {
        components.push(Component {
            role: Role::Proxy,
            specs: vec![spec],
        });
    }
    Ok(components)
}
