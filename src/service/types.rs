use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Lifecycle status of a tracked service instance.
///
/// ```text
/// Starting ──► Ready ──► Stopping ──► (untracked)
///                 ▲          │
///                 └──────────┘  stop failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceStatus {
    /// Container created; not yet confirmed running and healthy.
    Starting,
    /// Container running and healthy; connection info is set.
    Ready,
    /// A stop is in progress.
    Stopping,
}

impl fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstanceStatus::Starting => write!(f, "starting"),
            InstanceStatus::Ready => write!(f, "ready"),
            InstanceStatus::Stopping => write!(f, "stopping"),
        }
    }
}

/// A running (or starting) container tracked by an environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceInstance {
    pub service: String,
    pub container_name: String,
    pub container_id: String,
    /// Resolved host port of the primary mapping.
    pub port: u16,
    /// Set once the instance is ready.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection: Option<String>,
    /// Snapshot of the descriptor's environment, set once the instance is ready.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub credentials: BTreeMap<String, String>,
    pub status: InstanceStatus,
}

impl ServiceInstance {
    /// Provisional entry registered right after the container is created.
    pub fn provisional(
        service: impl Into<String>,
        container_name: impl Into<String>,
        container_id: impl Into<String>,
        port: u16,
    ) -> Self {
        Self {
            service: service.into(),
            container_name: container_name.into(),
            container_id: container_id.into(),
            port,
            connection: None,
            credentials: BTreeMap::new(),
            status: InstanceStatus::Starting,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.status == InstanceStatus::Ready
    }
}
