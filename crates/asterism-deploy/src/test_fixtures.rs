//! Shared configuration fixtures for the unit tests.

use std::collections::BTreeMap;
use std::path::PathBuf;

use asterism_config::{
    volume, AuthProvider, ContainerNames, DeploymentConfig, ImageReference, Images, InitialData,
    ProxyConfig, ProxyTls,
};
use asterism_vault::VaultConfig;

fn image(repo: Option<&str>, name: &str, tag: &str) -> ImageReference {
    ImageReference {
        repository: repo.map(str::to_owned),
        name: name.to_owned(),
        tag: tag.to_owned(),
    }
}

/// A dev-mode configuration with two workers and no proxy.
pub fn config() -> DeploymentConfig {
    let mut volumes = BTreeMap::new();
    volumes.insert(volume::DATA.to_owned(), "ow_data".to_owned());
    volumes.insert(volume::CACHE.to_owned(), "ow_cache".to_owned());

    let mut server_env = BTreeMap::new();
    server_env.insert("APP_MODE".to_owned(), "standard".to_owned());

    DeploymentConfig {
        container_prefix: "ow".to_owned(),
        network: "ow_net".to_owned(),
        volumes,
        containers: ContainerNames {
            cache: "ow-cache".to_owned(),
            server: "ow-server".to_owned(),
            web: "ow-web".to_owned(),
            proxy: None,
        },
        images: Images {
            cache: image(None, "redis", "6"),
            server: image(Some("asterism"), "server", "main"),
            worker: image(Some("asterism"), "worker", "main"),
            web: image(Some("asterism"), "web", "main"),
            migrate: image(Some("asterism"), "web-migrate", "main"),
            proxy: None,
            styling: None,
            admin: None,
        },
        workers: 2,
        server_env,
        server_ssh: None,
        initial_data: InitialData::Demo,
        web_port: 8888,
        web_name: "Asterism".to_owned(),
        web_email: "admin@example.com".to_owned(),
        web_dev_mode: true,
        web_url: "http://localhost:8888".to_owned(),
        auth: AuthProvider::Github {
            org: Some("example-org".to_owned()),
            team: None,
            app: None,
        },
        auth_fine_grained: true,
        proxy: None,
        styling: None,
        vault: VaultConfig::disabled(),
        webhook_url: None,
        path: PathBuf::from("."),
    }
}

/// The same constellation fronted by a proxy with self-signed TLS.
pub fn config_with_proxy() -> DeploymentConfig {
    let mut config = config();
    config.web_dev_mode = false;
    config.proxy = Some(ProxyConfig {
        hostname: "asterism.example.com".to_owned(),
        port_http: 80,
        port_https: 443,
        tls: ProxyTls::SelfSigned,
    });
    config.containers.proxy = Some("ow-proxy".to_owned());
    config.images.proxy = Some(image(Some("asterism"), "proxy", "main"));
    config
        .volumes
        .insert(volume::PROXY_LOGS.to_owned(), "ow_proxy_logs".to_owned());
    config.web_url = "https://asterism.example.com".to_owned();
    config
}
