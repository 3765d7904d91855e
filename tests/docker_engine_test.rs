//! Integration tests against a real Docker daemon.
//!
//! All tests are ignored by default. Run them with
//! `cargo test --test docker_engine_test -- --ignored`.

use itenv::docker::{ContainerEngine, ContainerSpec, ContainerState, DockerClient};
use itenv::{Orchestrator, Settings};
use std::process::Command;
use std::sync::Arc;
use std::time::Duration;

/// Check if Docker is available
fn is_docker_available() -> bool {
    Command::new("docker")
        .arg("version")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

/// Macro to skip Docker tests if Docker is not available
macro_rules! require_docker {
    () => {
        if !is_docker_available() {
            eprintln!("Skipping Docker test - Docker not available");
            return;
        }
    };
}

/// Helper to clean up Docker containers after tests
fn cleanup_docker_container(container_name: &str) {
    let _ = Command::new("docker")
        .args(["rm", "-f", container_name])
        .output();
}

#[tokio::test]
#[ignore] // Requires Docker
async fn test_client_container_round_trip() {
    require_docker!();

    let name = "itenv-engine-test";
    cleanup_docker_container(name);
    let client = DockerClient::new();

    assert!(client.get_container(name).await.unwrap_err().is_not_found());

    let image = "alpine:3.19";
    if client.image_exists(image).await.is_err() {
        client.pull_image(image).await.expect("pull alpine");
    }

    let spec = ContainerSpec {
        name: name.to_string(),
        image: image.to_string(),
        command: vec!["sleep".to_string(), "300".to_string()],
        ..Default::default()
    };
    let created = client.create_container(&spec).await.expect("create");
    assert_eq!(created.name, name);

    client.start(&created.id).await.expect("start");
    let info = client.inspect(&created.id).await.expect("inspect");
    assert_eq!(info.state, ContainerState::Running);

    let ok = client
        .exec(&created.id, &["true".to_string()])
        .await
        .expect("exec");
    assert_eq!(ok, 0);
    let failed = client
        .exec(&created.id, &["false".to_string()])
        .await
        .expect("exec");
    assert_ne!(failed, 0);

    client
        .stop(&created.id, Duration::from_secs(1))
        .await
        .expect("stop");
    let info = client.inspect(&created.id).await.expect("inspect");
    assert!(info.state.is_stopped(), "state: {}", info.state);

    client.remove(&created.id, true).await.expect("remove");
    assert!(client.inspect(&created.id).await.unwrap_err().is_not_found());
}

#[tokio::test]
#[ignore] // Requires Docker
async fn test_missing_image_is_not_found() {
    require_docker!();

    let client = DockerClient::new();
    let err = client
        .image_exists("itenv-does-not-exist:never")
        .await
        .unwrap_err();
    assert!(err.is_not_found(), "got {}", err);
}

#[tokio::test]
#[ignore] // Requires Docker
async fn test_redis_environment_end_to_end() {
    require_docker!();

    let settings = Settings {
        prefix: "itenv_e2e".to_string(),
        ..Default::default()
    };
    cleanup_docker_container("itenv_e2e_redis");

    let orchestrator = Orchestrator::builder()
        .engine(Arc::new(DockerClient::new()))
        .settings(settings)
        .port_override("redis", 16379)
        .build()
        .expect("build orchestrator");

    let results = orchestrator.start_services(&["redis"]).await;
    let redis = results["redis"].as_ref().expect("redis starts");
    assert_eq!(redis.connection.as_deref(), Some("redis://localhost:16379"));
    assert_eq!(orchestrator.list_running(), vec!["redis"]);

    let summary = orchestrator.stop_all().await;
    assert!(summary.is_clean(), "failed: {:?}", summary.failed);
    assert!(orchestrator.list_running().is_empty());
}
