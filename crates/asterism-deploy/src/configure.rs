//! Per-role configuration steps run after a container starts.
//!
//! Each role's containers start dumb and get configured over exec and file
//! transfer. Server, worker and web containers block on a go-signal file;
//! writing it is always the final step, so a container never starts serving
//! with partial configuration.

use std::path::Path;
use std::time::Duration;

use asterism_config::{AuthProvider, DeploymentConfig, InitialData, ProxyTls, StylingConfig};
use asterism_engine::{wait_exec_ok, ContainerEngine, ContainerSpec, EngineError, Mount};
use tracing::{debug, info};

use crate::error::Result;
use crate::topology::{Role, SERVER_PORT};

const PROBE_POLL: Duration = Duration::from_secs(1);
const PROBE_TIMEOUT: Duration = Duration::from_secs(60);

/// Marker on the data volume showing it has been seeded. Seeding is
/// idempotent across restarts because the volume outlives containers.
const DATA_MARKER: &str = "/data/.asterism";

/// Path of the go-signal file each application container waits for.
const GO_SIGNAL: &str = "/etc/asterism/go";

/// Where application containers read their environment from.
const ENV_FILE: &str = "/etc/asterism/env";

/// Web front end configuration file.
const WEB_CONFIG: &str = "/etc/asterism/config.properties";

/// Run the configure step for every container of `role`.
pub async fn component(
    engine: &dyn ContainerEngine,
    role: Role,
    names: &[String],
    config: &DeploymentConfig,
) -> Result<()> {
    for name in names {
        debug!(container = %name, role = %role, "configuring");
        match role {
            Role::Cache => cache(engine, name).await?,
            Role::Server => server(engine, name, config).await?,
            Role::Worker => worker(engine, name, config).await?,
            Role::Web => web(engine, name, config).await?,
            Role::Proxy => proxy(engine, name, config).await?,
        }
    }
    Ok(())
}

async fn exec_checked(
    engine: &dyn ContainerEngine,
    name: &str,
    command: &[&str],
) -> Result<()> {
    let result = engine.exec(name, command).await?;
    if result.success() {
        Ok(())
    } else {
        Err(EngineError::command(command.join(" "), result.stderr.trim().to_owned()).into())
    }
}

/// The cache has nothing to configure; just wait until it answers.
async fn cache(engine: &dyn ContainerEngine, name: &str) -> Result<()> {
    wait_exec_ok(
        engine,
        name,
        &["redis-cli", "ping"],
        "PONG",
        PROBE_POLL,
        PROBE_TIMEOUT,
    )
    .await?;
    Ok(())
}

async fn server(
    engine: &dyn ContainerEngine,
    name: &str,
    config: &DeploymentConfig,
) -> Result<()> {
    write_ssh_keys(engine, name, config).await?;
    seed_initial_data(engine, name, config).await?;
    write_env_file(engine, name, config).await?;
    engine.write_text(name, GO_SIGNAL, "").await?;
    Ok(())
}

async fn worker(
    engine: &dyn ContainerEngine,
    name: &str,
    config: &DeploymentConfig,
) -> Result<()> {
    write_ssh_keys(engine, name, config).await?;
    write_env_file(engine, name, config).await?;
    engine.write_text(name, GO_SIGNAL, "").await?;
    Ok(())
}

async fn web(engine: &dyn ContainerEngine, name: &str, config: &DeploymentConfig) -> Result<()> {
    engine
        .write_text(name, WEB_CONFIG, &web_properties(config))
        .await?;
    if let Some(styling) = &config.styling {
        apply_styling(engine, name, config, styling).await?;
    }
    run_migrations(engine, config).await?;
    engine.write_text(name, GO_SIGNAL, "").await?;
    Ok(())
}

async fn proxy(engine: &dyn ContainerEngine, name: &str, config: &DeploymentConfig) -> Result<()> {
    let Some(proxy) = &config.proxy else {
        return Ok(());
    };
    match &proxy.tls {
        ProxyTls::SelfSigned => {
            info!(container = %name, "generating self-signed certificate");
            exec_checked(
                engine,
                name,
                &["self-signed-certificate", "/etc/asterism/ssl", &proxy.hostname],
            )
            .await?;
        }
        ProxyTls::Provided { certificate, key } => {
            engine
                .write_text(name, "/etc/asterism/ssl/certificate.pem", certificate)
                .await?;
            engine
                .write_text(name, "/etc/asterism/ssl/key.pem", key)
                .await?;
        }
    }
    Ok(())
}

async fn write_ssh_keys(
    engine: &dyn ContainerEngine,
    name: &str,
    config: &DeploymentConfig,
) -> Result<()> {
    let Some(ssh) = &config.server_ssh else {
        return Ok(());
    };
    engine
        .write_text(name, "/root/.ssh/id_rsa.pub", &ssh.public)
        .await?;
    engine
        .write_text(name, "/root/.ssh/id_rsa", &ssh.private)
        .await?;
    exec_checked(engine, name, &["chmod", "600", "/root/.ssh/id_rsa"]).await?;
    Ok(())
}

/// Seed the data volume, once. The marker persists on the volume, so a
/// redeploy over existing data skips this entirely.
async fn seed_initial_data(
    engine: &dyn ContainerEngine,
    name: &str,
    config: &DeploymentConfig,
) -> Result<()> {
    match engine.read_text(name, DATA_MARKER).await {
        Ok(_) => {
            debug!(container = %name, "data volume already seeded");
            return Ok(());
        }
        Err(EngineError::NotFound(_)) => {}
        Err(e) => return Err(e.into()),
    }

    match &config.initial_data {
        InitialData::Demo => {
            info!(container = %name, "seeding demo data");
            exec_checked(engine, name, &["asterism-server", "seed-demo", "/data"]).await?;
        }
        InitialData::Clone { url } => {
            info!(container = %name, source = %url, "cloning initial data");
            exec_checked(engine, name, &["asterism-server", "clone", url, "/data"]).await?;
        }
    }
    engine
        .write_text(name, DATA_MARKER, &config.container_prefix)
        .await?;
    Ok(())
}

async fn write_env_file(
    engine: &dyn ContainerEngine,
    name: &str,
    config: &DeploymentConfig,
) -> Result<()> {
    let mut contents = String::new();
    for (key, value) in &config.server_env {
        contents.push_str(key);
        contents.push('=');
        contents.push_str(value);
        contents.push('\n');
    }
    engine.write_text(name, ENV_FILE, &contents).await?;
    Ok(())
}

/// Render the web front end's `config.properties`.
fn web_properties(config: &DeploymentConfig) -> String {
    let mut lines = vec![
        format!("app.port={}", config.web_port),
        format!("app.name={}", config.web_name),
        format!("app.email={}", config.web_email),
        format!("app.url={}", config.web_url),
        format!(
            "app.server=http://{}:{SERVER_PORT}",
            config.containers.server
        ),
        format!("auth.fine_grained={}", config.auth_fine_grained),
    ];
    match &config.auth {
        AuthProvider::Github { org, team, app } => {
            lines.push("auth.provider=github".to_owned());
            lines.push(format!("auth.github_org={}", org.as_deref().unwrap_or("")));
            lines.push(format!("auth.github_team={}", team.as_deref().unwrap_or("")));
            if let Some(app) = app {
                lines.push(format!("auth.github_key={}", app.id));
                lines.push(format!("auth.github_secret={}", app.secret));
            }
        }
        AuthProvider::Montagu { url, api_url } => {
            lines.push("auth.provider=montagu".to_owned());
            lines.push(format!("auth.montagu_url={url}"));
            lines.push(format!("auth.montagu_api_url={api_url}"));
        }
    }
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// Generate custom stylesheets with a one-shot container, then copy any
/// logo and favicon into the web container.
async fn apply_styling(
    engine: &dyn ContainerEngine,
    name: &str,
    config: &DeploymentConfig,
    styling: &StylingConfig,
) -> Result<()> {
    if let (Some(sass), Some(image)) = (&styling.sass_variables, &config.images.styling) {
        info!(container = %name, "generating custom stylesheets");
        let css_volume = config
            .volumes
            .get(asterism_config::volume::CSS)
            .cloned()
            .unwrap_or_default();
        let mut spec = ContainerSpec::new(
            format!("{}-css-generator", config.container_prefix),
            image.to_string(),
        );
        spec.mounts.push(Mount::Bind {
            source: sass.clone(),
            target: "/variables.scss".to_owned(),
        });
        spec.mounts.push(Mount::Volume {
            name: css_volume,
            target: "/out".to_owned(),
        });
        spec.args = vec!["/variables.scss".to_owned(), "/out".to_owned()];
        engine.run_once(&spec).await?;
    }

    if let Some(logo) = &styling.logo {
        engine
            .copy_in(name, Path::new(logo), "/static/public/images/logo.png")
            .await?;
    }
    if let Some(favicon) = &styling.favicon {
        engine
            .copy_in(name, Path::new(favicon), "/static/public/favicon.ico")
            .await?;
    }
    Ok(())
}

/// Run the schema migration image once, on the network, against the data
/// volume.
async fn run_migrations(engine: &dyn ContainerEngine, config: &DeploymentConfig) -> Result<()> {
    info!("running migrations");
    let data_volume = config
        .volumes
        .get(asterism_config::volume::DATA)
        .cloned()
        .unwrap_or_default();
    let mut spec = ContainerSpec::new(
        format!("{}-migrate", config.container_prefix),
        config.images.migrate.to_string(),
    );
    spec.network = Some(config.network.clone());
    spec.mounts.push(Mount::Volume {
        name: data_volume,
        target: "/data".to_owned(),
    });
    engine.run_once(&spec).await?;
    Ok(())
}
