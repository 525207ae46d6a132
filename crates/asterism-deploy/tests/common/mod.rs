//! Shared harness: a deployment directory on disk and a mock engine.

use std::sync::Arc;

use asterism_deploy::Orchestrator;
use asterism_engine::MockEngine;
use asterism_vault::EnvSnapshot;

pub const CONFIG: &str = r#"
container_prefix: ow
network: ow_net
volumes:
  data: ow_data
  cache: ow_cache
cache:
  image: {name: redis, tag: "6"}
server:
  image: {repo: asterism, name: server, tag: main}
  env:
    APP_MODE: standard
  initial_data:
    source: demo
worker:
  image: {repo: asterism, name: worker, tag: main}
  replicas: 2
web:
  image: {repo: asterism, name: web, tag: main, migrate: web-migrate}
  port: 8888
  name: Asterism
  email: admin@example.com
  dev_mode: true
  auth:
    provider: github
    fine_grained: true
    github:
      org: example-org
"#;

pub struct Harness {
    pub dir: tempfile::TempDir,
    pub engine: Arc<MockEngine>,
    pub orchestrator: Orchestrator,
}

pub fn harness() -> Harness {
    harness_with(CONFIG)
}

pub fn harness_with(config: &str) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("asterism.yml"), config).unwrap();

    let engine = Arc::new(MockEngine::new());
    // The cache liveness probe succeeds immediately.
    engine.script_exec("ow-cache", &["redis-cli", "ping"], 0, "PONG");

    let orchestrator = Orchestrator::new(engine.clone()).with_env(EnvSnapshot::empty());
    Harness {
        dir,
        engine,
        orchestrator,
    }
}
