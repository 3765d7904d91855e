//! Environment-wide settings and the on-disk config file layout.
//!
//! ```yaml
//! prefix: myapp_test
//! stop_timeout: 10s
//! poll_interval: 500ms
//! require_probe: true
//! ports:
//!   postgres: 15432
//! services:
//!   cache:
//!     image: cache:7
//!     port: { container: "6379", host: 6379 }
//!     connection_template: "cache://localhost:{port}"
//! ```

use super::descriptor::ServiceDescriptor;
use super::duration::serde_duration;
use super::registry::StaticRegistry;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Extra time allowed, on top of the stop timeout, for a container to be
/// observed stopped.
pub const STOP_TIMEOUT_BUFFER: Duration = Duration::from_secs(5);

/// Tunables for one environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Container name prefix: containers are named `<prefix>_<service>`.
    pub prefix: String,

    /// Services `itenv up` starts when none are named.
    pub default_services: Vec<String>,

    /// Grace period handed to `docker stop` before the container is killed.
    #[serde(with = "serde_duration")]
    pub stop_timeout: Duration,

    /// Upper bound on one whole service start, including image pulls.
    #[serde(with = "serde_duration")]
    pub start_timeout: Duration,

    /// How long to wait for the engine to report a container running.
    #[serde(with = "serde_duration")]
    pub running_timeout: Duration,

    /// Interval between engine state checks.
    #[serde(with = "serde_duration")]
    pub poll_interval: Duration,

    /// Iteration cap for every readiness poll.
    pub max_status_checks: u32,

    /// Fixed wait used when a service has no healthcheck.
    #[serde(with = "serde_duration")]
    pub grace_delay: Duration,

    /// Refuse to start services that have no healthcheck.
    pub require_probe: bool,

    /// Maximum number of services starting at once.
    pub max_parallel_starts: usize,

    /// Host port overrides for the primary port, by service name.
    pub ports: BTreeMap<String, u16>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            prefix: "itest".to_string(),
            default_services: vec!["postgres".to_string(), "redis".to_string()],
            stop_timeout: Duration::from_secs(10),
            start_timeout: Duration::from_secs(300),
            running_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_millis(500),
            max_status_checks: 200,
            grace_delay: Duration::from_secs(2),
            require_probe: false,
            max_parallel_starts: 8,
            ports: BTreeMap::new(),
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        if self.prefix.trim().is_empty() {
            return Err(Error::Config("prefix must not be empty".to_string()));
        }
        if self.poll_interval.is_zero() {
            return Err(Error::Config("poll_interval must be positive".to_string()));
        }
        if self.running_timeout.is_zero() || self.start_timeout.is_zero() {
            return Err(Error::Config(
                "running_timeout and start_timeout must be positive".to_string(),
            ));
        }
        if self.max_status_checks == 0 {
            return Err(Error::Config("max_status_checks must be at least 1".to_string()));
        }
        if self.max_parallel_starts == 0 {
            return Err(Error::Config(
                "max_parallel_starts must be at least 1".to_string(),
            ));
        }
        if let Some((name, _)) = self.ports.iter().find(|(_, port)| **port == 0) {
            return Err(Error::Config(format!(
                "port override for '{}' must not be 0",
                name
            )));
        }
        Ok(())
    }

    /// Upper bound on one whole stop: grace period, observation, removal.
    pub fn stop_bound(&self) -> Duration {
        stop_bound_for(self.stop_timeout)
    }
}

/// Upper bound on one whole stop with the given grace period.
pub fn stop_bound_for(grace: Duration) -> Duration {
    grace
        .saturating_add(STOP_TIMEOUT_BUFFER)
        .saturating_add(STOP_TIMEOUT_BUFFER)
}

/// Contents of an `itenv.yaml` file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(flatten)]
    pub settings: Settings,

    /// Additional or replacement service descriptors.
    #[serde(default)]
    pub services: BTreeMap<String, ServiceDescriptor>,
}

impl Config {
    /// Built-in registry extended with this file's descriptors.
    pub fn registry(&self) -> Result<StaticRegistry> {
        let mut registry = StaticRegistry::builtin();
        registry.extend_validated(
            self.services
                .iter()
                .map(|(name, descriptor)| (name.clone(), descriptor.clone())),
        )?;
        Ok(registry)
    }
}
