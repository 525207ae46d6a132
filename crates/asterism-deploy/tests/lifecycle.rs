//! End-to-end lifecycle against the mock engine.

mod common;

use std::path::Path;

use asterism_config::{DeploymentConfig, SNAPSHOT_PATH};
use asterism_deploy::{DeployError, StartOptions, StopOptions};
use asterism_engine::ContainerState;

#[tokio::test]
async fn start_brings_up_the_full_constellation() {
    let h = common::harness();
    let config = h
        .orchestrator
        .start(h.dir.path(), &StartOptions::default())
        .await
        .unwrap();

    assert_eq!(config.container_prefix, "ow");
    assert!(h.engine.networks().contains("ow_net"));
    assert!(h.engine.volumes().contains("ow_data"));
    assert!(h.engine.volumes().contains("ow_cache"));

    for name in ["ow-cache", "ow-server", "ow-worker-1", "ow-worker-2", "ow-web"] {
        let container = h.engine.container(name).unwrap_or_else(|| panic!("{name} missing"));
        assert_eq!(container.state, ContainerState::Running, "{name}");
    }

    // Snapshot persisted into the server container and decodable.
    let snapshot = h.engine.file("ow-server", SNAPSHOT_PATH).unwrap();
    let decoded = DeploymentConfig::decode_snapshot(&snapshot, Path::new(".")).unwrap();
    assert_eq!(decoded.workers, 2);

    // Migration one-shot ran.
    assert!(h.engine.one_shots().iter().any(|s| s.name == "ow-migrate"));
}

#[tokio::test]
async fn start_refuses_while_any_container_exists() {
    let h = common::harness();
    h.orchestrator
        .start(h.dir.path(), &StartOptions::default())
        .await
        .unwrap();

    let err = h
        .orchestrator
        .start(h.dir.path(), &StartOptions::default())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("stop the constellation first"));
    match err {
        DeployError::AlreadyRunning { prefix, containers } => {
            assert_eq!(prefix, "ow");
            assert!(containers.contains(&"ow-server".to_owned()));
        }
        other => panic!("unexpected: {other}"),
    }

    // A single leftover, even stopped, is enough to refuse.
    h.orchestrator
        .stop(h.dir.path(), &StopOptions::default())
        .await
        .unwrap();
    h.engine.seed("ow-web", ContainerState::Exited);
    let err = h
        .orchestrator
        .start(h.dir.path(), &StartOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, DeployError::AlreadyRunning { .. }));
}

#[tokio::test]
async fn admin_commands_run_one_shot_against_the_running_constellation() {
    let config = common::CONFIG.to_owned()
        + "admin:\n  image: {repo: asterism, name: user-cli, tag: main}\n";
    let h = common::harness_with(&config);
    let args = vec!["add-users".to_owned(), "user@example.com".to_owned()];

    // Nothing deployed yet, so there is no snapshot to drive the command.
    let err = h.orchestrator.admin(h.dir.path(), &args).await.unwrap_err();
    assert!(matches!(err, DeployError::NotDeployed(ref prefix) if prefix == "ow"));

    h.orchestrator
        .start(h.dir.path(), &StartOptions::default())
        .await
        .unwrap();
    h.orchestrator.admin(h.dir.path(), &args).await.unwrap();

    let one_shots = h.engine.one_shots();
    let spec = one_shots.iter().find(|s| s.name == "ow-admin").unwrap();
    assert_eq!(spec.image, "asterism/user-cli:main");
    assert_eq!(spec.args, args);
}

#[tokio::test]
async fn overlay_and_overrides_reach_the_persisted_snapshot() {
    let h = common::harness();
    std::fs::write(h.dir.path().join("staging.yml"), "web:\n  name: Staging\n").unwrap();

    let opts = StartOptions {
        overlay: Some("staging".to_owned()),
        overrides: vec!["web.port=9999".to_owned()],
        pull: false,
    };
    let config = h.orchestrator.start(h.dir.path(), &opts).await.unwrap();
    assert_eq!(config.web_name, "Staging");
    assert_eq!(config.web_port, 9999);

    let snapshot = h.engine.file("ow-server", SNAPSHOT_PATH).unwrap();
    let decoded = DeploymentConfig::decode_snapshot(&snapshot, Path::new(".")).unwrap();
    assert_eq!(decoded.web_port, 9999);
}

#[tokio::test]
async fn pull_fetches_every_referenced_image() {
    let h = common::harness();
    let opts = StartOptions {
        pull: true,
        ..StartOptions::default()
    };
    h.orchestrator.start(h.dir.path(), &opts).await.unwrap();

    let pulled = h.engine.pulled();
    for image in [
        "redis:6",
        "asterism/server:main",
        "asterism/worker:main",
        "asterism/web:main",
        "asterism/web-migrate:main",
    ] {
        assert!(pulled.contains(&image.to_owned()), "{image} not pulled");
    }
}

#[tokio::test]
async fn stop_removes_containers_but_keeps_network_and_volumes_by_default() {
    let h = common::harness();
    h.orchestrator
        .start(h.dir.path(), &StartOptions::default())
        .await
        .unwrap();

    h.orchestrator
        .stop(h.dir.path(), &StopOptions::default())
        .await
        .unwrap();

    for name in ["ow-cache", "ow-server", "ow-worker-1", "ow-worker-2", "ow-web"] {
        assert!(h.engine.container(name).is_none(), "{name} still present");
    }
    assert!(h.engine.networks().contains("ow_net"));
    assert!(h.engine.volumes().contains("ow_data"));
}

#[tokio::test]
async fn stop_flags_remove_network_and_volumes() {
    let h = common::harness();
    h.orchestrator
        .start(h.dir.path(), &StartOptions::default())
        .await
        .unwrap();

    let opts = StopOptions {
        kill: true,
        remove_network: true,
        remove_volumes: true,
        ..StopOptions::default()
    };
    h.orchestrator.stop(h.dir.path(), &opts).await.unwrap();

    assert!(h.engine.networks().is_empty());
    assert!(h.engine.volumes().is_empty());
}

#[tokio::test]
async fn stop_removes_stray_workers_beyond_the_configured_scale() {
    let h = common::harness();
    h.orchestrator
        .start(h.dir.path(), &StartOptions::default())
        .await
        .unwrap();
    h.engine.seed("ow-worker-7", ContainerState::Running);

    h.orchestrator
        .stop(h.dir.path(), &StopOptions::default())
        .await
        .unwrap();
    assert!(h.engine.container("ow-worker-7").is_none());
}

#[tokio::test]
async fn stop_without_anything_running_is_a_no_op() {
    let h = common::harness();
    h.orchestrator
        .stop(h.dir.path(), &StopOptions::default())
        .await
        .unwrap();
}

#[tokio::test]
async fn failed_start_leaves_partials_and_forced_stop_cleans_up() {
    let h = common::harness();
    h.engine.fail_run("ow-web");

    let err = h
        .orchestrator
        .start(h.dir.path(), &StartOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, DeployError::Engine(_)));

    // No rollback: earlier containers are still there, but the snapshot
    // never got written.
    assert!(h.engine.container("ow-server").is_some());
    assert!(h.engine.file("ow-server", SNAPSHOT_PATH).is_none());

    // An unforced stop refuses to guess.
    let err = h
        .orchestrator
        .stop(h.dir.path(), &StopOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, DeployError::StopRequiresForce(_)));

    // A forced stop rebuilds from disk and clears everything.
    let opts = StopOptions {
        force: true,
        ..StopOptions::default()
    };
    h.orchestrator.stop(h.dir.path(), &opts).await.unwrap();
    assert!(h.engine.container("ow-server").is_none());
    assert!(h.engine.container("ow-cache").is_none());
}
