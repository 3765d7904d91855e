//! Docker CLI implementation of [`ContainerEngine`].
//!
//! All Docker CLI interactions go through `DockerClient`, which provides
//! consistent timeout handling, error mapping to [`DockerError`], and a single
//! point where `Command::new("docker")` is constructed.

use super::engine::{ContainerEngine, ContainerInfo, ContainerSpec, ContainerState};
use super::DockerError;
use async_trait::async_trait;
use serde::Deserialize;
use std::process::Output;
use std::time::Duration;

/// Timeout for ordinary, fast docker commands (inspect, create, start, rm).
const DOCKER_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);
/// Pulling an image can legitimately take minutes.
const DOCKER_PULL_TIMEOUT: Duration = Duration::from_secs(300);
/// Slack added on top of the container's stop grace period.
const DOCKER_STOP_SLACK: Duration = Duration::from_secs(5);

/// Client that drives the `docker` binary.
#[derive(Debug, Clone)]
pub struct DockerClient {
    binary: String,
    command_timeout: Duration,
    pull_timeout: Duration,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InspectRecord {
    id: String,
    name: String,
    state: InspectState,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InspectState {
    status: String,
}

impl DockerClient {
    pub fn new() -> Self {
        Self {
            binary: "docker".to_string(),
            command_timeout: DOCKER_COMMAND_TIMEOUT,
            pull_timeout: DOCKER_PULL_TIMEOUT,
        }
    }

    /// Use a different CLI binary with a docker-compatible interface (e.g. `podman`).
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Check whether the daemon answers at all.
    ///
    /// The CLI calls this before starting anything so a missing daemon fails
    /// once with a clear message instead of as one engine error per service.
    pub async fn is_daemon_healthy(&self, timeout: Duration) -> bool {
        let args = ["info", "--format", "{{.ServerVersion}}"];
        matches!(self.run(&args, timeout).await, Ok(output) if output.status.success())
    }

    // ========================================================================
    // Internal helpers
    // ========================================================================

    fn command_string(&self, args: &[&str]) -> String {
        format!("{} {}", self.binary, args.join(" "))
    }

    /// Run a docker command with a timeout, returning raw Output.
    async fn run(&self, args: &[&str], timeout: Duration) -> Result<Output, DockerError> {
        tracing::debug!("Running: {}", self.command_string(args));
        let result = tokio::time::timeout(
            timeout,
            tokio::process::Command::new(&self.binary)
                .args(args)
                .kill_on_drop(true)
                .output(),
        )
        .await;

        match result {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => Err(DockerError::exec_failed(self.command_string(args), e)),
            Err(_) => Err(DockerError::timeout(self.command_string(args), timeout)),
        }
    }

    /// Run a docker command, returning Output only if it exited 0.
    ///
    /// `object` names the container or image the command targets, used when
    /// docker reports it as missing.
    async fn run_success(
        &self,
        args: &[&str],
        object: &str,
        timeout: Duration,
    ) -> Result<Output, DockerError> {
        let output = self.run(args, timeout).await?;
        if output.status.success() {
            Ok(output)
        } else {
            Err(DockerError::failed(self.command_string(args), object, &output))
        }
    }

    fn parse_inspect(&self, command: &str, stdout: &[u8]) -> Result<ContainerInfo, DockerError> {
        let records: Vec<InspectRecord> = serde_json::from_slice(stdout)
            .map_err(|e| DockerError::malformed(command, e.to_string()))?;
        let record = records
            .into_iter()
            .next()
            .ok_or_else(|| DockerError::malformed(command, "empty inspect result"))?;
        Ok(ContainerInfo {
            id: record.id,
            name: record.name.trim_start_matches('/').to_string(),
            state: ContainerState::parse(&record.state.status),
        })
    }
}

/// Whole seconds for `docker stop -t`, rounded up so a sub-second grace
/// period still gives the container a chance to exit cleanly.
pub(crate) fn stop_grace_secs(timeout: Duration) -> u64 {
    let secs = timeout.as_secs();
    if timeout.subsec_nanos() > 0 {
        secs.saturating_add(1)
    } else {
        secs
    }
}

/// Build the `docker create` argument list for a container spec.
pub(crate) fn create_args(spec: &ContainerSpec) -> Vec<String> {
    let mut args = vec!["create".to_string()];

    if !spec.name.is_empty() {
        args.push("--name".to_string());
        args.push(spec.name.clone());
    }

    for (key, value) in &spec.labels {
        args.push("--label".to_string());
        args.push(format!("{}={}", key, value));
    }

    for (key, value) in &spec.env {
        args.push("-e".to_string());
        args.push(format!("{}={}", key, value));
    }

    for binding in &spec.ports {
        args.push("-p".to_string());
        args.push(format!("{}:{}", binding.host_port, binding.container_port));
    }

    args.push(spec.image.clone());
    args.extend(spec.command.iter().cloned());
    args
}

#[async_trait]
impl ContainerEngine for DockerClient {
    async fn get_container(&self, name_or_id: &str) -> Result<ContainerInfo, DockerError> {
        self.inspect(name_or_id).await
    }

    async fn create_container(&self, spec: &ContainerSpec) -> Result<ContainerInfo, DockerError> {
        let args = create_args(spec);
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let output = self
            .run_success(&arg_refs, &spec.image, self.command_timeout)
            .await?;

        let id = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if id.is_empty() {
            return Err(DockerError::malformed(
                self.command_string(&arg_refs),
                "no container id printed",
            ));
        }

        Ok(ContainerInfo {
            id,
            name: spec.name.clone(),
            state: ContainerState::Created,
        })
    }

    async fn start(&self, id: &str) -> Result<(), DockerError> {
        self.run_success(&["start", id], id, self.command_timeout)
            .await
            .map(|_| ())
    }

    async fn stop(&self, id: &str, timeout: Duration) -> Result<(), DockerError> {
        let grace = stop_grace_secs(timeout).to_string();
        self.run_success(
            &["stop", "-t", &grace, id],
            id,
            timeout.saturating_add(DOCKER_STOP_SLACK),
        )
        .await
        .map(|_| ())
    }

    async fn remove(&self, id: &str, force: bool) -> Result<(), DockerError> {
        let mut args = vec!["rm"];
        if force {
            args.push("-f");
        }
        args.push(id);
        self.run_success(&args, id, self.command_timeout)
            .await
            .map(|_| ())
    }

    async fn inspect(&self, id: &str) -> Result<ContainerInfo, DockerError> {
        let args = ["container", "inspect", id];
        let output = self.run_success(&args, id, self.command_timeout).await?;
        self.parse_inspect(&self.command_string(&args), &output.stdout)
    }

    async fn image_exists(&self, image: &str) -> Result<(), DockerError> {
        self.run_success(
            &["image", "inspect", "--format", "{{.Id}}", image],
            image,
            self.command_timeout,
        )
        .await
        .map(|_| ())
    }

    async fn pull_image(&self, image: &str) -> Result<(), DockerError> {
        let output = self.run(&["pull", image], self.pull_timeout).await?;
        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        // "up to date" or "already exists" aren't real failures
        if stderr.contains("up to date") || stderr.contains("already exists") {
            return Ok(());
        }
        Err(DockerError::failed(
            self.command_string(&["pull", image]),
            image,
            &output,
        ))
    }

    async fn exec(&self, id: &str, cmd: &[String]) -> Result<i32, DockerError> {
        let mut args = vec!["exec", id];
        args.extend(cmd.iter().map(String::as_str));
        let output = self.run(&args, self.command_timeout).await?;

        if output.status.success() {
            return Ok(0);
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        if super::error::is_not_found_message(&stderr) {
            return Err(DockerError::NotFound {
                object: id.to_string(),
            });
        }
        Ok(output.status.code().unwrap_or(-1))
    }
}

impl Default for DockerClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docker::PortBinding;
    use std::collections::BTreeMap;

    #[test]
    fn create_args_translate_env_ports_and_command() {
        let spec = ContainerSpec {
            name: "itest_minio".to_string(),
            image: "minio/minio:latest".to_string(),
            env: BTreeMap::from([
                ("MINIO_ROOT_USER".to_string(), "test".to_string()),
                ("MINIO_ROOT_PASSWORD".to_string(), "testtest".to_string()),
            ]),
            ports: vec![
                PortBinding {
                    container_port: "9000/tcp".to_string(),
                    host_port: 9000,
                },
                PortBinding {
                    container_port: "9001/tcp".to_string(),
                    host_port: 19001,
                },
            ],
            command: vec!["server".to_string(), "/data".to_string()],
            labels: BTreeMap::from([("itenv.managed".to_string(), "true".to_string())]),
        };

        let args = create_args(&spec);
        assert_eq!(
            args,
            vec![
                "create",
                "--name",
                "itest_minio",
                "--label",
                "itenv.managed=true",
                "-e",
                "MINIO_ROOT_PASSWORD=testtest",
                "-e",
                "MINIO_ROOT_USER=test",
                "-p",
                "9000:9000/tcp",
                "-p",
                "19001:9001/tcp",
                "minio/minio:latest",
                "server",
                "/data",
            ]
        );
    }

    #[test]
    fn create_args_image_is_last_without_command() {
        let spec = ContainerSpec {
            image: "redis:7-alpine".to_string(),
            ..Default::default()
        };
        assert_eq!(create_args(&spec), vec!["create", "redis:7-alpine"]);
    }

    #[test]
    fn parses_inspect_output() {
        let client = DockerClient::new();
        let json = br#"[{"Id":"4f1c0ffee","Name":"/itest_redis","State":{"Status":"running","Running":true}}]"#;
        let info = client.parse_inspect("docker container inspect x", json).unwrap();
        assert_eq!(info.id, "4f1c0ffee");
        assert_eq!(info.name, "itest_redis");
        assert_eq!(info.state, ContainerState::Running);
    }

    #[test]
    fn rejects_empty_inspect_output() {
        let client = DockerClient::new();
        let err = client
            .parse_inspect("docker container inspect x", b"[]")
            .unwrap_err();
        assert!(matches!(err, DockerError::Malformed { .. }));

        let err = client
            .parse_inspect("docker container inspect x", b"not json")
            .unwrap_err();
        assert!(matches!(err, DockerError::Malformed { .. }));
    }

    #[tokio::test]
    async fn missing_binary_is_exec_failure() {
        let client = DockerClient::new().with_binary("itenv-no-such-binary-12345");
        let err = client.inspect("whatever").await.unwrap_err();
        assert!(matches!(err, DockerError::ExecFailed { .. }));
    }

    #[test]
    fn stop_grace_rounds_partial_seconds_up() {
        assert_eq!(stop_grace_secs(Duration::ZERO), 0);
        assert_eq!(stop_grace_secs(Duration::from_millis(500)), 1);
        assert_eq!(stop_grace_secs(Duration::from_secs(10)), 10);
        assert_eq!(stop_grace_secs(Duration::from_millis(10_001)), 11);
        assert_eq!(stop_grace_secs(Duration::MAX), u64::MAX);
    }

    #[tokio::test]
    async fn daemon_check_uses_the_configured_binary() {
        let client = DockerClient::new().with_binary("itenv-no-such-docker-binary");
        assert!(!client.is_daemon_healthy(Duration::from_millis(500)).await);
    }
}
