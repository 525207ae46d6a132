//! The resolved deployment configuration.
//!
//! Two shapes, three ways they turn up:
//!
//! 1. [`BaseConfig`]: only the immutable naming bits (container prefix and
//!    the names derived from it), read cheaply from disk with no secrets and
//!    no overlays. Used as the starting point for building or fetching a
//!    full configuration.
//! 2. [`DeploymentConfig`]: everything, built either by
//!    [`BaseConfig::build`] (merging an overlay and override fragments on
//!    top of the base document) or by decoding the snapshot persisted inside
//!    the running server container at [`SNAPSHOT_PATH`].
//!
//! The snapshot exists so that interacting with a running constellation
//! (status, stop) never requires remembering which overlay or `--option`
//! values were used to start it.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

use asterism_vault::{self as vault, SecretStore, VaultAuth, VaultConfig};

use crate::error::{ConfigError, Result};
use crate::image::ImageReference;
use crate::merge;
use crate::value;

/// Fixed name of the base configuration file in a deployment directory.
pub const CONFIG_BASENAME: &str = "asterism.yml";

/// Where the resolved configuration snapshot lives inside the server
/// container. Deliberately not on a volume: the snapshot can contain
/// resolved secrets and should die with the container.
pub const SNAPSHOT_PATH: &str = "/asterism-config";

/// Logical volume names used by the topology.
pub mod volume {
    /// Application data, mounted into server, worker and web.
    pub const DATA: &str = "data";
    /// Cache persistence.
    pub const CACHE: &str = "cache";
    /// Reverse proxy access logs.
    pub const PROXY_LOGS: &str = "proxy_logs";
    /// Generated stylesheets, shared between the one-shot generator and web.
    pub const CSS: &str = "css";
    /// Optional static document mount for web.
    pub const DOCUMENTS: &str = "documents";
}

/// Concrete container names for the singleton roles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerNames {
    /// The cache container.
    pub cache: String,
    /// The primary application server container.
    pub server: String,
    /// The web front end container.
    pub web: String,
    /// The reverse proxy container, when enabled.
    pub proxy: Option<String>,
}

impl ContainerNames {
    fn derive(prefix: &str, proxy_enabled: bool) -> Self {
        Self {
            cache: format!("{prefix}-cache"),
            server: format!("{prefix}-server"),
            web: format!("{prefix}-web"),
            proxy: proxy_enabled.then(|| format!("{prefix}-proxy")),
        }
    }

    /// Role/name pairs in alphabetical role order.
    #[must_use]
    pub fn by_role(&self) -> Vec<(&'static str, &str)> {
        let mut out = vec![
            ("cache", self.cache.as_str()),
            ("server", self.server.as_str()),
            ("web", self.web.as_str()),
        ];
        if let Some(proxy) = &self.proxy {
            out.push(("proxy", proxy.as_str()));
        }
        out.sort_by_key(|(role, _)| *role);
        out
    }
}

/// Image references for every role, including one-shot images that are not
/// part of the running constellation (migrate, stylesheet generator).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Images {
    /// Cache image.
    pub cache: ImageReference,
    /// Primary server image.
    pub server: ImageReference,
    /// Worker image.
    pub worker: ImageReference,
    /// Web front end image.
    pub web: ImageReference,
    /// One-shot schema migration image (shares the web image entry).
    pub migrate: ImageReference,
    /// Reverse proxy image, when the proxy is enabled.
    pub proxy: Option<ImageReference>,
    /// One-shot stylesheet generator image, when custom styling is set.
    pub styling: Option<ImageReference>,
    /// One-shot user administration image, when the `admin` section is set.
    pub admin: Option<ImageReference>,
}

impl Images {
    /// Every referenced image, for pulling.
    #[must_use]
    pub fn all(&self) -> Vec<&ImageReference> {
        let mut out = vec![
            &self.cache,
            &self.server,
            &self.worker,
            &self.web,
            &self.migrate,
        ];
        out.extend(self.proxy.as_ref());
        out.extend(self.styling.as_ref());
        out.extend(self.admin.as_ref());
        out
    }
}

/// SSH key material written into the server and worker containers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SshKeys {
    /// Public key.
    pub public: String,
    /// Private key.
    pub private: String,
}

/// How the server's data volume gets its initial contents.
///
/// A discriminated choice: exactly one source is selected, and seeding only
/// runs when the volume's marker file is absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum InitialData {
    /// Generate built-in demo data.
    Demo,
    /// Clone an external repository.
    Clone {
        /// Repository URL to clone.
        url: String,
    },
}

/// The authentication provider, a discriminated choice: selecting one makes
/// the other's fields irrelevant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "snake_case")]
pub enum AuthProvider {
    /// GitHub OAuth.
    Github {
        /// Organisation whose members may log in.
        org: Option<String>,
        /// Team restriction within the organisation.
        team: Option<String>,
        /// OAuth app credentials.
        app: Option<GithubApp>,
    },
    /// Montagu identity provider.
    Montagu {
        /// Montagu UI URL.
        url: String,
        /// Montagu API URL.
        api_url: String,
    },
}

/// GitHub OAuth app credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GithubApp {
    /// Client id.
    pub id: String,
    /// Client secret.
    pub secret: String,
}

/// TLS material for the reverse proxy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ProxyTls {
    /// Generate a self-signed certificate inside the proxy container.
    SelfSigned,
    /// Use provided certificate and key material.
    Provided {
        /// PEM certificate.
        certificate: String,
        /// PEM private key.
        key: String,
    },
}

/// Reverse proxy settings, present only when the proxy is enabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Public hostname the proxy serves.
    pub hostname: String,
    /// Published HTTP port.
    pub port_http: u16,
    /// Published HTTPS port.
    pub port_https: u16,
    /// TLS material.
    pub tls: ProxyTls,
}

/// Optional custom styling for the web front end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StylingConfig {
    /// Host path to a sass variables file; enables stylesheet generation.
    pub sass_variables: Option<String>,
    /// Host path to a logo image.
    pub logo: Option<String>,
    /// Host path to a favicon (`.ico`).
    pub favicon: Option<String>,
}

/// The fully-resolved configuration of one deployment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentConfig {
    /// Immutable identity of this deployment instance.
    pub container_prefix: String,
    /// Container network name.
    pub network: String,
    /// Logical volume name to concrete volume name.
    pub volumes: BTreeMap<String, String>,
    /// Concrete container names.
    pub containers: ContainerNames,
    /// Image references.
    pub images: Images,
    /// Worker replica count.
    pub workers: u32,
    /// Environment written into server and worker containers.
    pub server_env: BTreeMap<String, String>,
    /// SSH key material for server and workers.
    pub server_ssh: Option<SshKeys>,
    /// Initial data source for the data volume.
    pub initial_data: InitialData,
    /// Web front end port.
    pub web_port: u16,
    /// Display name of the instance.
    pub web_name: String,
    /// Contact email.
    pub web_email: String,
    /// Development mode: publish the web port on localhost.
    pub web_dev_mode: bool,
    /// Externally reachable URL.
    pub web_url: String,
    /// Authentication provider.
    pub auth: AuthProvider,
    /// Fine-grained permissions flag.
    pub auth_fine_grained: bool,
    /// Reverse proxy, when enabled.
    pub proxy: Option<ProxyConfig>,
    /// Custom styling, when configured.
    pub styling: Option<StylingConfig>,
    /// Secret store settings.
    pub vault: VaultConfig,
    /// Webhook for deploy notifications.
    pub webhook_url: Option<String>,
    /// Deployment directory this configuration was loaded for. Not part of
    /// the snapshot: the same containers may be driven from different
    /// working directories on different hosts.
    #[serde(skip)]
    pub path: PathBuf,
}

impl DeploymentConfig {
    /// Name of the `index`-th worker replica (1-based).
    #[must_use]
    pub fn worker_name(&self, index: u32) -> String {
        format!("{}-worker-{index}", self.container_prefix)
    }

    /// Name prefix shared by all worker replicas, for live discovery.
    #[must_use]
    pub fn worker_prefix(&self) -> String {
        format!("{}-worker-", self.container_prefix)
    }

    /// Resolve every secret-bearing field in place.
    ///
    /// The resolvable set is this enumerated list and nothing else; a
    /// `VAULT:` sentinel anywhere else in the configuration is left
    /// untouched by design. Must run before any container is created so
    /// unresolved sentinels never reach the engine.
    pub async fn resolve_secrets(&mut self, store: &dyn SecretStore) -> vault::Result<()> {
        vault::resolve_map(&mut self.server_env, store).await?;

        if let Some(ssh) = &mut self.server_ssh {
            vault::resolve_string(&mut ssh.public, store).await?;
            vault::resolve_string(&mut ssh.private, store).await?;
        }

        if let Some(ProxyConfig {
            tls: ProxyTls::Provided { certificate, key },
            ..
        }) = &mut self.proxy
        {
            vault::resolve_string(certificate, store).await?;
            vault::resolve_string(key, store).await?;
        }

        if let AuthProvider::Github { app: Some(app), .. } = &mut self.auth {
            vault::resolve_string(&mut app.id, store).await?;
            vault::resolve_string(&mut app.secret, store).await?;
        }

        vault::resolve_opt(&mut self.webhook_url, store).await?;

        Ok(())
    }

    /// Encode this configuration as the persisted snapshot form
    /// (base64 over JSON).
    pub fn encode_snapshot(&self) -> Result<String> {
        let json = serde_json::to_vec(self)
            .map_err(|e| ConfigError::SnapshotDecode(format!("encode failed: {e}")))?;
        Ok(base64::engine::general_purpose::STANDARD.encode(json))
    }

    /// Decode a persisted snapshot, re-anchoring it at `path`.
    pub fn decode_snapshot(text: &str, path: &Path) -> Result<Self> {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(text.trim())
            .map_err(|e| ConfigError::SnapshotDecode(format!("invalid base64: {e}")))?;
        let mut config: Self = serde_json::from_slice(&bytes)
            .map_err(|e| ConfigError::SnapshotDecode(format!("invalid snapshot: {e}")))?;
        config.path = path.to_path_buf();
        Ok(config)
    }

    fn from_doc(path: &Path, doc: &Value) -> Result<Self> {
        let container_prefix = value::string(doc, &["container_prefix"])?;
        let network = value::string(doc, &["network"])?;

        let volumes = value::opt_string_map(doc, &["volumes"])?
            .ok_or_else(|| ConfigError::MissingKey("volumes".to_owned()))?;
        require_volume(&volumes, volume::DATA)?;
        require_volume(&volumes, volume::CACHE)?;

        let proxy = read_proxy(doc)?;
        if proxy.is_some() {
            require_volume(&volumes, volume::PROXY_LOGS)?;
        }

        let containers = ContainerNames::derive(&container_prefix, proxy.is_some());

        let workers = read_workers(doc)?;

        let server_env = value::opt_string_map(doc, &["server", "env"])?.unwrap_or_default();
        let server_ssh = read_ssh(doc)?;
        let initial_data = read_initial_data(doc)?;

        let web_port = value::port(doc, &["web", "port"])?;
        let web_name = value::string(doc, &["web", "name"])?;
        let web_email = value::string(doc, &["web", "email"])?;
        let web_dev_mode = value::opt_boolean(doc, &["web", "dev_mode"])?.unwrap_or(false);

        let auth = read_auth(doc)?;
        let auth_fine_grained = value::boolean(doc, &["web", "auth", "fine_grained"])?;

        let styling = read_styling(doc)?;
        if styling.as_ref().is_some_and(|s| s.sass_variables.is_some()) {
            require_volume(&volumes, volume::CSS)?;
        }

        let images = Images {
            cache: ImageReference::from_doc(doc, &["cache", "image"], "name")?,
            server: ImageReference::from_doc(doc, &["server", "image"], "name")?,
            worker: ImageReference::from_doc(doc, &["worker", "image"], "name")?,
            web: ImageReference::from_doc(doc, &["web", "image"], "name")?,
            migrate: ImageReference::from_doc(doc, &["web", "image"], "migrate")?,
            proxy: proxy
                .as_ref()
                .map(|_| ImageReference::from_doc(doc, &["proxy", "image"], "name"))
                .transpose()?,
            styling: styling
                .as_ref()
                .filter(|s| s.sass_variables.is_some())
                .map(|_| ImageReference::from_doc(doc, &["web", "styling", "image"], "name"))
                .transpose()?,
            admin: value::contains(doc, &["admin"])
                .then(|| ImageReference::from_doc(doc, &["admin", "image"], "name"))
                .transpose()?,
        };

        let web_url = derive_web_url(doc, proxy.as_ref(), web_dev_mode, web_port)?;

        let vault = read_vault(doc)?;
        let webhook_url = value::opt_string(doc, &["webhook", "url"])?;

        Ok(Self {
            container_prefix,
            network,
            volumes,
            containers,
            images,
            workers,
            server_env,
            server_ssh,
            initial_data,
            web_port,
            web_name,
            web_email,
            web_dev_mode,
            web_url,
            auth,
            auth_fine_grained,
            proxy,
            styling,
            vault,
            webhook_url,
            path: path.to_path_buf(),
        })
    }
}

/// The cheap, secret-free naming view of a deployment directory.
#[derive(Debug, Clone)]
pub struct BaseConfig {
    /// The deployment directory.
    pub path: PathBuf,
    /// Immutable identity of this deployment instance.
    pub container_prefix: String,
    /// Container network name.
    pub network: String,
    /// Logical volume name to concrete volume name.
    pub volumes: BTreeMap<String, String>,
    /// Derived container names.
    pub containers: ContainerNames,
    /// Configured worker replica count.
    pub workers: u32,
    doc: Value,
}

impl BaseConfig {
    /// Load the base configuration from `dir/asterism.yml`.
    pub fn load(dir: &Path) -> Result<Self> {
        let doc = read_document(&dir.join(CONFIG_BASENAME))?;

        let container_prefix = value::string(&doc, &["container_prefix"])?;
        let network = value::string(&doc, &["network"])?;
        let volumes = value::opt_string_map(&doc, &["volumes"])?.unwrap_or_default();
        let proxy_enabled = value::contains(&doc, &["proxy"])
            && value::opt_boolean(&doc, &["proxy", "enabled"])?.unwrap_or(false);
        let containers = ContainerNames::derive(&container_prefix, proxy_enabled);
        let workers = read_workers(&doc)?;

        Ok(Self {
            path: dir.to_path_buf(),
            container_prefix,
            network,
            volumes,
            containers,
            workers,
            doc,
        })
    }

    /// Name of the primary server container, which holds the snapshot.
    #[must_use]
    pub fn server_container(&self) -> &str {
        &self.containers.server
    }

    /// Every container name this deployment would declare, worker replicas
    /// included (up to the configured count).
    #[must_use]
    pub fn declared_containers(&self) -> Vec<String> {
        let mut out: Vec<String> = self
            .containers
            .by_role()
            .into_iter()
            .map(|(_, name)| name.to_owned())
            .collect();
        for index in 1..=self.workers {
            out.push(format!("{}-worker-{index}", self.container_prefix));
        }
        out
    }

    /// Vault connection settings from the base document.
    ///
    /// Interactive callers check these before [`BaseConfig::build`] so they
    /// can collect a GitHub token from the operator up front.
    pub fn vault(&self) -> Result<VaultConfig> {
        read_vault(&self.doc)
    }

    /// Build the full configuration, merging an optional overlay file
    /// (`dir/<overlay>.yml`) and override fragments on top of the base
    /// document.
    pub fn build(
        &self,
        overlay: Option<&str>,
        fragments: &[Mapping],
    ) -> Result<DeploymentConfig> {
        let overlay_doc = overlay
            .map(|name| read_document(&self.path.join(format!("{name}.yml"))))
            .transpose()?;

        let mut merged = match &self.doc {
            Value::Mapping(m) => m.clone(),
            _ => Mapping::new(),
        };
        let overlay_mapping = overlay_doc.as_ref().and_then(Value::as_mapping);
        merge::apply(&mut merged, overlay_mapping, fragments)?;

        DeploymentConfig::from_doc(&self.path, &Value::Mapping(merged))
    }
}

/// Read and parse one YAML document, requiring a mapping at the top level.
pub fn read_document(path: &Path) -> Result<Value> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let doc: Value = serde_yaml::from_str(&text).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    if !doc.is_mapping() {
        return Err(ConfigError::Parse {
            path: path.to_path_buf(),
            reason: "top level must be a mapping".to_owned(),
        });
    }
    Ok(doc)
}

fn require_volume(volumes: &BTreeMap<String, String>, name: &str) -> Result<()> {
    if volumes.contains_key(name) {
        Ok(())
    } else {
        Err(ConfigError::MissingKey(format!("volumes.{name}")))
    }
}

fn read_workers(doc: &Value) -> Result<u32> {
    match value::opt_integer(doc, &["worker", "replicas"])? {
        None => Ok(1),
        Some(n) => u32::try_from(n).map_err(|_| ConfigError::TypeMismatch {
            path: "worker.replicas".to_owned(),
            expected: "non-negative integer",
        }),
    }
}

fn read_ssh(doc: &Value) -> Result<Option<SshKeys>> {
    if !value::contains(doc, &["server", "ssh"]) {
        return Ok(None);
    }
    let map = value::strict_string_map(doc, &["server", "ssh"], &["public", "private"])?;
    Ok(Some(SshKeys {
        // Both present: strict map enforced the exact key set.
        public: map.get("public").cloned().unwrap_or_default(),
        private: map.get("private").cloned().unwrap_or_default(),
    }))
}

fn read_initial_data(doc: &Value) -> Result<InitialData> {
    let source = value::one_of(doc, &["server", "initial_data", "source"], &["demo", "clone"])?;
    if source == "clone" {
        Ok(InitialData::Clone {
            url: value::string(doc, &["server", "initial_data", "url"])?,
        })
    } else {
        Ok(InitialData::Demo)
    }
}

fn read_auth(doc: &Value) -> Result<AuthProvider> {
    let provider = value::one_of(doc, &["web", "auth", "provider"], &["github", "montagu"])?;
    if provider == "montagu" {
        Ok(AuthProvider::Montagu {
            url: value::string(doc, &["web", "auth", "montagu", "url"])?,
            api_url: value::string(doc, &["web", "auth", "montagu", "api_url"])?,
        })
    } else {
        let app = if value::contains(doc, &["web", "auth", "github", "app"]) {
            let map =
                value::strict_string_map(doc, &["web", "auth", "github", "app"], &["id", "secret"])?;
            Some(GithubApp {
                id: map.get("id").cloned().unwrap_or_default(),
                secret: map.get("secret").cloned().unwrap_or_default(),
            })
        } else {
            None
        };
        Ok(AuthProvider::Github {
            org: value::opt_string(doc, &["web", "auth", "github", "org"])?,
            team: value::opt_string(doc, &["web", "auth", "github", "team"])?,
            app,
        })
    }
}

fn read_proxy(doc: &Value) -> Result<Option<ProxyConfig>> {
    if !value::contains(doc, &["proxy"]) {
        return Ok(None);
    }
    if !value::boolean(doc, &["proxy", "enabled"])? {
        return Ok(None);
    }

    let tls = if value::contains(doc, &["proxy", "ssl"]) {
        ProxyTls::Provided {
            certificate: value::string(doc, &["proxy", "ssl", "certificate"])?,
            key: value::string(doc, &["proxy", "ssl", "key"])?,
        }
    } else {
        ProxyTls::SelfSigned
    };

    Ok(Some(ProxyConfig {
        hostname: value::string(doc, &["proxy", "hostname"])?,
        port_http: value::port(doc, &["proxy", "port_http"])?,
        port_https: value::port(doc, &["proxy", "port_https"])?,
        tls,
    }))
}

fn read_styling(doc: &Value) -> Result<Option<StylingConfig>> {
    if !value::contains(doc, &["web", "styling"]) {
        return Ok(None);
    }
    Ok(Some(StylingConfig {
        sass_variables: value::opt_string(doc, &["web", "styling", "sass_variables"])?,
        logo: value::opt_string(doc, &["web", "styling", "logo"])?,
        favicon: value::opt_string(doc, &["web", "styling", "favicon"])?,
    }))
}

fn read_vault(doc: &Value) -> Result<VaultConfig> {
    let url = value::opt_string(doc, &["vault", "addr"])?;
    if url.is_none() {
        return Ok(VaultConfig::disabled());
    }

    let method = value::one_of(doc, &["vault", "auth", "method"], &["token", "github"])?;
    let auth = if method == "token" {
        VaultAuth::Token {
            token: value::string(doc, &["vault", "auth", "args", "token"])?,
        }
    } else {
        VaultAuth::Github {
            token: value::opt_string(doc, &["vault", "auth", "args", "token"])?,
        }
    };

    Ok(VaultConfig {
        url,
        auth: Some(auth),
    })
}

/// Three-tier public URL derivation: explicit config value, else the proxy
/// hostname, else localhost in dev mode. Anything else is a configuration
/// error: a deployment with no discoverable URL must not ship.
fn derive_web_url(
    doc: &Value,
    proxy: Option<&ProxyConfig>,
    dev_mode: bool,
    web_port: u16,
) -> Result<String> {
    if let Some(explicit) = value::opt_string(doc, &["web", "url"])? {
        return Ok(explicit);
    }
    if let Some(proxy) = proxy {
        return Ok(format!("https://{}", proxy.hostname));
    }
    if dev_mode {
        return Ok(format!("http://localhost:{web_port}"));
    }
    Err(ConfigError::NoPublicUrl)
}
