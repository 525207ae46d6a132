//! Configuration resolution for Asterism deployments.
//!
//! A deployment directory holds a base `asterism.yml` plus any number of
//! overlay files. Building a configuration is a pipeline:
//!
//! 1. Read the base document.
//! 2. Deep-merge an optional overlay file over it.
//! 3. Deep-merge `--option key.path=value` override fragments over that,
//!    in the order given.
//! 4. Extract typed fields through the accessors in [`value`], failing on
//!    the first missing or mistyped key.
//!
//! Secret values use the `VAULT:path:key` sentinel and stay unresolved
//! until [`DeploymentConfig::resolve_secrets`] runs against a
//! [`asterism_vault::SecretStore`].
//!
//! The resolved configuration also has a persisted form: a base64-coded
//! JSON snapshot written into the running server container so that later
//! status and stop commands see exactly the configuration the deployment
//! was started with.
//!
//! # Example
//!
//! ```rust,ignore
//! use asterism_config::BaseConfig;
//!
//! let base = BaseConfig::load(Path::new("deploy/production"))?;
//! let fragments = asterism_config::options::parse_fragments(&overrides)?;
//! let config = base.build(Some("staging"), &fragments)?;
//! ```

mod error;
mod image;
pub mod merge;
mod model;
pub mod options;
pub mod value;

pub use error::{ConfigError, Result};
pub use image::ImageReference;
pub use model::{
    AuthProvider, BaseConfig, ContainerNames, DeploymentConfig, GithubApp, Images, InitialData,
    ProxyConfig, ProxyTls, SshKeys, StylingConfig, CONFIG_BASENAME, SNAPSHOT_PATH,
};
pub use model::{read_document, volume};
