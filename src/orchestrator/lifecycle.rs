//! Per-container lifecycle: create, start, wait for readiness, stop, remove.
//!
//! [`LifecycleController`] drives a single service's container through the
//! engine and keeps the owning [`Environment`] in sync. It never decides
//! *which* services run; that is the orchestrator's job.

use super::environment::Environment;
use crate::config::{stop_bound_for, ServiceDescriptor, Settings, STOP_TIMEOUT_BUFFER};
use crate::docker::{ContainerEngine, ContainerSpec, ContainerState};
use crate::error::{Error, Result};
use crate::healthcheck::{ExecChecker, HealthChecker};
use crate::readiness::{poll_until, PollOutcome, PollPolicy};
use crate::service::{InstanceStatus, ServiceInstance};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Label marking containers created by this tool.
pub const LABEL_MANAGED: &str = "itenv.managed";
/// Label carrying the environment prefix.
pub const LABEL_PREFIX: &str = "itenv.prefix";
/// Label carrying the service name.
pub const LABEL_SERVICE: &str = "itenv.service";

pub struct LifecycleController {
    engine: Arc<dyn ContainerEngine>,
    environment: Arc<Environment>,
    settings: Settings,
}

impl LifecycleController {
    pub fn new(
        engine: Arc<dyn ContainerEngine>,
        environment: Arc<Environment>,
        settings: Settings,
    ) -> Self {
        Self {
            engine,
            environment,
            settings,
        }
    }

    pub fn environment(&self) -> &Arc<Environment> {
        &self.environment
    }

    /// Start a fresh container for `service` and wait until it is ready.
    ///
    /// Any container already named `container_name` is removed first, so
    /// repeated starts always produce a new container. The instance is
    /// tracked from the moment the container is created; if a later step
    /// fails, the entry stays so a subsequent stop can clean it up.
    pub async fn start(
        &self,
        service: &str,
        descriptor: &ServiceDescriptor,
        container_name: &str,
        port_override: Option<u16>,
    ) -> Result<ServiceInstance> {
        if descriptor.healthcheck.is_none() && self.settings.require_probe {
            return Err(Error::Config(format!(
                "service '{}' has no healthcheck and require_probe is set",
                service
            )));
        }

        self.remove_if_exists(container_name).await?;
        if self.environment.deregister(service).is_some() {
            tracing::debug!("Dropped stale tracking entry for '{}'", service);
        }

        let (port, ports) = descriptor.resolve_ports(service, port_override)?;

        self.ensure_image(&descriptor.image).await?;

        let spec = ContainerSpec {
            name: container_name.to_string(),
            image: descriptor.image.clone(),
            env: descriptor.environment.clone(),
            ports,
            command: descriptor.command.clone(),
            labels: self.labels(service),
        };
        let created = self.engine.create_container(&spec).await?;
        tracing::debug!("Created container {} ({})", container_name, created.id);

        self.environment.register(ServiceInstance::provisional(
            service,
            container_name,
            created.id.clone(),
            port,
        ));

        self.engine.start(&created.id).await?;
        tracing::info!("Started container {} on port {}", container_name, port);

        self.wait_running(container_name, &created.id).await?;
        self.wait_healthy(service, container_name, &created.id, descriptor)
            .await?;

        let connection = descriptor.connection_string(port);
        let instance = self
            .environment
            .update(service, |instance| {
                instance.connection = Some(connection);
                instance.credentials = descriptor.environment.clone();
                instance.status = InstanceStatus::Ready;
            })
            .ok_or_else(|| Error::NotFound(container_name.to_string()))?;

        tracing::info!("Service '{}' is ready", service);
        Ok(instance)
    }

    /// Stop and remove the tracked container for `service`.
    ///
    /// Untracked services are a no-op. The whole stop is bounded by
    /// `timeout` plus slack for observing the exit and removing the container.
    /// On failure, including that bound running out, the entry is kept with
    /// its previous status so the caller can retry.
    pub async fn stop(&self, service: &str, timeout: Duration) -> Result<()> {
        let Some(instance) = self.environment.get(service) else {
            tracing::warn!("Service '{}' is not running, nothing to stop", service);
            return Ok(());
        };

        let previous = instance.status;
        self.environment
            .update(service, |i| i.status = InstanceStatus::Stopping);

        let bound = stop_bound_for(timeout);
        let stop = self.stop_container(&instance, timeout);
        let outcome = match tokio::time::timeout(bound, stop).await {
            Ok(result) => result,
            Err(_elapsed) => {
                tracing::warn!("Stop of '{}' did not finish within {:?}", service, bound);
                Err(Error::Timeout(service.to_string()))
            }
        };

        match outcome {
            Ok(()) => {
                self.environment.deregister(service);
                tracing::info!("Stopped service '{}'", service);
                Ok(())
            }
            Err(e) => {
                tracing::error!("Failed to stop service '{}': {}", service, e);
                self.environment.update(service, |i| i.status = previous);
                Err(e)
            }
        }
    }

    /// Force-remove a container by name if it exists.
    ///
    /// Returns whether a container was found.
    pub async fn remove_if_exists(&self, container_name: &str) -> Result<bool> {
        let info = match self.engine.get_container(container_name).await {
            Ok(info) => info,
            Err(e) if e.is_not_found() => return Ok(false),
            Err(e) => return Err(e.into()),
        };

        tracing::info!(
            "Removing existing container {} ({})",
            container_name,
            info.state
        );
        match self.engine.remove(&info.id, true).await {
            Ok(()) => Ok(true),
            Err(e) if e.is_not_found() => Ok(true),
            Err(e) => Err(e.into()),
        }
    }

    fn labels(&self, service: &str) -> BTreeMap<String, String> {
        BTreeMap::from([
            (LABEL_MANAGED.to_string(), "true".to_string()),
            (
                LABEL_PREFIX.to_string(),
                self.environment.prefix().to_string(),
            ),
            (LABEL_SERVICE.to_string(), service.to_string()),
        ])
    }

    async fn ensure_image(&self, image: &str) -> Result<()> {
        match self.engine.image_exists(image).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => {
                tracing::info!("Pulling image {}", image);
                self.engine.pull_image(image).await?;
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn wait_running(&self, container_name: &str, id: &str) -> Result<()> {
        let policy = PollPolicy::new(
            self.settings.poll_interval,
            self.settings.max_status_checks,
            self.settings.running_timeout,
        );
        poll_until(container_name, policy, move || self.running_state(id)).await
    }

    async fn running_state(&self, id: &str) -> Result<PollOutcome> {
        let info = self.engine.inspect(id).await?;
        Ok(match info.state {
            ContainerState::Running => PollOutcome::Ready,
            state if state.is_terminated() => PollOutcome::Terminal(state.to_string()),
            _ => PollOutcome::Pending,
        })
    }

    async fn wait_healthy(
        &self,
        service: &str,
        container_name: &str,
        id: &str,
        descriptor: &ServiceDescriptor,
    ) -> Result<()> {
        let Some(ref probe) = descriptor.healthcheck else {
            tracing::warn!(
                "Service '{}' has no healthcheck; waiting {:?}, readiness is unverified",
                service,
                self.settings.grace_delay
            );
            tokio::time::sleep(self.settings.grace_delay).await;
            return Ok(());
        };

        let checker = ExecChecker::new(
            Arc::clone(&self.engine),
            id,
            probe.test.clone(),
            probe.timeout,
        );
        let checker: &dyn HealthChecker = &checker;
        let policy = PollPolicy::for_probe(probe, self.settings.max_status_checks);

        tracing::debug!(
            "Waiting for '{}' healthcheck: {} (per-check timeout {:?})",
            service,
            probe.test,
            checker.timeout()
        );
        poll_until(container_name, policy, move || {
            self.health_state(id, checker)
        })
        .await
    }

    async fn health_state(&self, id: &str, checker: &dyn HealthChecker) -> Result<PollOutcome> {
        let info = self.engine.inspect(id).await?;
        if info.state.is_terminated() {
            return Ok(PollOutcome::Terminal(info.state.to_string()));
        }
        Ok(if checker.check().await? {
            PollOutcome::Ready
        } else {
            PollOutcome::Pending
        })
    }

    async fn stop_container(&self, instance: &ServiceInstance, timeout: Duration) -> Result<()> {
        let id = instance.container_id.as_str();

        match self.engine.stop(id, timeout).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                tracing::debug!("Container {} already gone", instance.container_name);
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        }

        let policy = PollPolicy::new(
            self.settings.poll_interval,
            self.settings.max_status_checks,
            timeout.saturating_add(STOP_TIMEOUT_BUFFER),
        );
        poll_until(&instance.container_name, policy, move || {
            self.stopped_state(id)
        })
        .await?;

        match self.engine.remove(id, true).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn stopped_state(&self, id: &str) -> Result<PollOutcome> {
        match self.engine.inspect(id).await {
            Ok(info) if info.state.is_stopped() => Ok(PollOutcome::Ready),
            Ok(_) => Ok(PollOutcome::Pending),
            Err(e) if e.is_not_found() => Ok(PollOutcome::Ready),
            Err(e) => Err(e.into()),
        }
    }
}
