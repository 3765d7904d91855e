//! Service descriptors: the immutable recipe for running one kind of service.

use super::duration::serde_duration;
use crate::docker::PortBinding;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::time::Duration;

/// Placeholder substituted with the resolved host port in connection templates.
pub const PORT_PLACEHOLDER: &str = "{port}";

const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_secs(2);
const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(30);

/// One exposed port: container-side spec and host-side port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortMapping {
    /// Container port, optionally with protocol (`6379`, `6379/tcp`, `53/udp`).
    pub container: String,
    pub host: u16,
}

impl PortMapping {
    pub fn new(container: impl Into<String>, host: u16) -> Self {
        Self {
            container: container.into(),
            host,
        }
    }

    /// Container port in `<port>/<proto>` form, defaulting the protocol to tcp.
    pub fn container_spec(&self) -> String {
        let spec = self.container.trim();
        if spec.contains('/') {
            spec.to_ascii_lowercase()
        } else {
            format!("{}/tcp", spec)
        }
    }

    fn validate(&self) -> std::result::Result<(), String> {
        let spec = self.container_spec();
        let (port, proto) = spec
            .split_once('/')
            .ok_or_else(|| format!("invalid container port '{}'", self.container))?;
        match port.parse::<u16>() {
            Ok(0) | Err(_) => {
                return Err(format!("invalid container port '{}'", self.container));
            }
            Ok(_) => {}
        }
        if !matches!(proto, "tcp" | "udp" | "sctp") {
            return Err(format!(
                "unsupported protocol '{}' in port '{}'",
                proto, self.container
            ));
        }
        if self.host == 0 {
            return Err(format!("host port for '{}' must not be 0", self.container));
        }
        Ok(())
    }

    fn binding(&self) -> PortBinding {
        PortBinding {
            container_port: self.container_spec(),
            host_port: self.host,
        }
    }
}

/// The command a health probe runs inside the container.
///
/// Written in config the way Docker healthchecks are:
/// `["CMD", "redis-cli", "ping"]` or `["CMD-SHELL", "pg_isready -U test"]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub enum ProbeCommand {
    /// Run the program directly.
    Exec(Vec<String>),
    /// Run the string through `/bin/sh -c`.
    Shell(String),
}

impl ProbeCommand {
    /// Argument vector to hand to the engine's exec.
    pub fn argv(&self) -> Vec<String> {
        match self {
            ProbeCommand::Exec(args) => args.clone(),
            ProbeCommand::Shell(script) => {
                vec!["/bin/sh".to_string(), "-c".to_string(), script.clone()]
            }
        }
    }
}

impl TryFrom<Vec<String>> for ProbeCommand {
    type Error = String;

    fn try_from(test: Vec<String>) -> std::result::Result<Self, Self::Error> {
        let mut parts = test.into_iter();
        match parts.next().as_deref() {
            Some("CMD") => {
                let args: Vec<String> = parts.collect();
                if args.is_empty() {
                    Err("CMD healthcheck needs a command".to_string())
                } else {
                    Ok(ProbeCommand::Exec(args))
                }
            }
            Some("CMD-SHELL") => {
                let script = parts.collect::<Vec<_>>().join(" ");
                if script.trim().is_empty() {
                    Err("CMD-SHELL healthcheck needs a command".to_string())
                } else {
                    Ok(ProbeCommand::Shell(script))
                }
            }
            Some("NONE") => Err("'NONE' healthcheck: omit the healthcheck instead".to_string()),
            Some(other) => Err(format!(
                "healthcheck test must start with CMD or CMD-SHELL, got '{}'",
                other
            )),
            None => Err("healthcheck test must not be empty".to_string()),
        }
    }
}

impl From<ProbeCommand> for Vec<String> {
    fn from(cmd: ProbeCommand) -> Self {
        match cmd {
            ProbeCommand::Exec(args) => std::iter::once("CMD".to_string()).chain(args).collect(),
            ProbeCommand::Shell(script) => vec!["CMD-SHELL".to_string(), script],
        }
    }
}

impl fmt::Display for ProbeCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeCommand::Exec(args) => write!(f, "{}", args.join(" ")),
            ProbeCommand::Shell(script) => write!(f, "{}", script),
        }
    }
}

/// Application-level readiness probe: what to run and how long to keep trying.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeSpec {
    pub test: ProbeCommand,
    #[serde(with = "serde_duration", default = "default_probe_interval")]
    pub interval: Duration,
    #[serde(with = "serde_duration", default = "default_probe_timeout")]
    pub timeout: Duration,
}

fn default_probe_interval() -> Duration {
    DEFAULT_PROBE_INTERVAL
}

fn default_probe_timeout() -> Duration {
    DEFAULT_PROBE_TIMEOUT
}

impl ProbeSpec {
    pub fn new(test: ProbeCommand, interval: Duration, timeout: Duration) -> Self {
        Self {
            test,
            interval,
            timeout,
        }
    }
}

/// Immutable description of how to run one kind of service container.
///
/// `port` is the primary port: its host side appears in the connection
/// string and is the one a port override replaces. `extra_ports` are bound
/// as declared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    pub image: String,
    pub port: PortMapping,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_ports: Vec<PortMapping>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub environment: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub healthcheck: Option<ProbeSpec>,
    pub connection_template: String,
}

impl ServiceDescriptor {
    pub fn new(image: impl Into<String>, port: PortMapping, template: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            port,
            extra_ports: Vec::new(),
            environment: BTreeMap::new(),
            command: Vec::new(),
            healthcheck: None,
            connection_template: template.into(),
        }
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }

    pub fn with_extra_port(mut self, port: PortMapping) -> Self {
        self.extra_ports.push(port);
        self
    }

    pub fn with_command<I, S>(mut self, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command = command.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_healthcheck(mut self, probe: ProbeSpec) -> Self {
        self.healthcheck = Some(probe);
        self
    }

    /// Check the descriptor's structural invariants.
    pub fn validate(&self, service: &str) -> Result<()> {
        let invalid = |reason: String| Error::InvalidDescriptor {
            service: service.to_string(),
            reason,
        };

        if self.image.trim().is_empty() {
            return Err(invalid("image must not be empty".to_string()));
        }
        if !self.connection_template.contains(PORT_PLACEHOLDER) {
            return Err(invalid(format!(
                "connection template '{}' has no {} placeholder",
                self.connection_template, PORT_PLACEHOLDER
            )));
        }

        let mut container_ports = HashSet::new();
        let mut host_ports = HashSet::new();
        for mapping in self.all_ports() {
            mapping.validate().map_err(invalid)?;
            if !container_ports.insert(mapping.container_spec()) {
                return Err(invalid(format!(
                    "container port '{}' is mapped twice",
                    mapping.container
                )));
            }
            if !host_ports.insert(mapping.host) {
                return Err(invalid(format!("host port {} is used twice", mapping.host)));
            }
        }

        if let Some(ref probe) = self.healthcheck {
            if probe.interval.is_zero() || probe.timeout.is_zero() {
                return Err(invalid(
                    "healthcheck interval and timeout must be positive".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Primary port first, then the extras in declaration order.
    pub fn all_ports(&self) -> impl Iterator<Item = &PortMapping> {
        std::iter::once(&self.port).chain(self.extra_ports.iter())
    }

    /// Resolve engine port bindings, applying an override to the primary port.
    ///
    /// Returns the resolved primary host port and the full binding list.
    pub fn resolve_ports(
        &self,
        service: &str,
        port_override: Option<u16>,
    ) -> Result<(u16, Vec<PortBinding>)> {
        let mut primary = self.port.clone();
        if let Some(port) = port_override {
            if port == 0 {
                return Err(Error::InvalidDescriptor {
                    service: service.to_string(),
                    reason: "port override must not be 0".to_string(),
                });
            }
            if self.extra_ports.iter().any(|m| m.host == port) {
                return Err(Error::InvalidDescriptor {
                    service: service.to_string(),
                    reason: format!("port override {} collides with another mapping", port),
                });
            }
            primary.host = port;
        }

        let bindings = std::iter::once(primary.binding())
            .chain(self.extra_ports.iter().map(PortMapping::binding))
            .collect();
        Ok((primary.host, bindings))
    }

    pub fn connection_string(&self, port: u16) -> String {
        self.connection_template
            .replace(PORT_PLACEHOLDER, &port.to_string())
    }
}
