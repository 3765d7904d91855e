//! Abstract capability interface over a container runtime.
//!
//! The lifecycle controller only ever talks to the engine through
//! [`ContainerEngine`]; [`super::DockerClient`] is the production
//! implementation and tests substitute an in-memory fake.

use super::DockerError;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Engine-level container state, as reported by `inspect`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerState {
    Created,
    Running,
    Restarting,
    Paused,
    Removing,
    Exited,
    Dead,
    Stopped,
    Unknown(String),
}

impl ContainerState {
    pub fn parse(status: &str) -> Self {
        match status.trim().to_ascii_lowercase().as_str() {
            "created" => ContainerState::Created,
            "running" => ContainerState::Running,
            "restarting" => ContainerState::Restarting,
            "paused" => ContainerState::Paused,
            "removing" => ContainerState::Removing,
            "exited" => ContainerState::Exited,
            "dead" => ContainerState::Dead,
            "stopped" => ContainerState::Stopped,
            other => ContainerState::Unknown(other.to_string()),
        }
    }

    /// The container process has terminated and will not come back on its own.
    pub fn is_terminated(&self) -> bool {
        matches!(self, ContainerState::Exited | ContainerState::Dead)
    }

    /// The container is not running (it has terminated or was never started).
    pub fn is_stopped(&self) -> bool {
        matches!(
            self,
            ContainerState::Exited
                | ContainerState::Dead
                | ContainerState::Stopped
                | ContainerState::Created
        )
    }
}

impl fmt::Display for ContainerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerState::Created => write!(f, "created"),
            ContainerState::Running => write!(f, "running"),
            ContainerState::Restarting => write!(f, "restarting"),
            ContainerState::Paused => write!(f, "paused"),
            ContainerState::Removing => write!(f, "removing"),
            ContainerState::Exited => write!(f, "exited"),
            ContainerState::Dead => write!(f, "dead"),
            ContainerState::Stopped => write!(f, "stopped"),
            ContainerState::Unknown(s) => write!(f, "{}", s),
        }
    }
}

/// Result of inspecting a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerInfo {
    pub id: String,
    pub name: String,
    pub state: ContainerState,
}

/// One host → container port binding, in the engine's binding format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortBinding {
    /// Container-side spec, e.g. `5432/tcp`.
    pub container_port: String,
    pub host_port: u16,
}

/// Everything the engine needs to create one container.
#[derive(Debug, Clone, Default)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    pub env: BTreeMap<String, String>,
    pub ports: Vec<PortBinding>,
    pub command: Vec<String>,
    pub labels: BTreeMap<String, String>,
}

/// Container runtime operations consumed by the lifecycle controller.
///
/// Every method that targets a missing container or image must fail with
/// [`DockerError::NotFound`]; callers rely on that to recognize expected
/// absence.
#[async_trait]
pub trait ContainerEngine: Send + Sync {
    /// Look up a container by name or id.
    async fn get_container(&self, name_or_id: &str) -> Result<ContainerInfo, DockerError>;

    /// Create (but do not start) a container.
    async fn create_container(&self, spec: &ContainerSpec) -> Result<ContainerInfo, DockerError>;

    async fn start(&self, id: &str) -> Result<(), DockerError>;

    /// Ask the container to stop, allowing `timeout` before it is killed.
    async fn stop(&self, id: &str, timeout: Duration) -> Result<(), DockerError>;

    async fn remove(&self, id: &str, force: bool) -> Result<(), DockerError>;

    async fn inspect(&self, id: &str) -> Result<ContainerInfo, DockerError>;

    /// `Ok(())` when the image is present locally, `NotFound` otherwise.
    async fn image_exists(&self, image: &str) -> Result<(), DockerError>;

    async fn pull_image(&self, image: &str) -> Result<(), DockerError>;

    /// Run a command inside a running container and return its exit code.
    async fn exec(&self, id: &str, cmd: &[String]) -> Result<i32, DockerError>;
}
