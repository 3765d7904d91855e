use super::environment::Environment;
use super::lifecycle::LifecycleController;
use super::OrchestratorBuilder;
use crate::config::{ServiceRegistry, Settings};
use crate::error::{Error, Result};
use crate::service::ServiceInstance;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Outcome of [`Orchestrator::stop_all`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StopSummary {
    pub stopped: Vec<String>,
    pub failed: Vec<String>,
}

impl StopSummary {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Coordinates a set of service containers for one test environment.
///
/// The Orchestrator is responsible for:
/// - Resolving service names against the registry
/// - Starting services concurrently, with a bounded number in flight
/// - Tearing everything down, even after a failed or cancelled start
/// - Answering connection-info queries
///
/// # Concurrency Model
///
/// All methods take `&self`. Tracked instances live in a shared
/// [`Environment`]; a `CancellationToken` interrupts every in-flight start.
/// Stops ignore the token so teardown always runs.
///
/// # Example
///
/// ```no_run
/// use itenv::Orchestrator;
///
/// # async fn example() -> Result<(), itenv::Error> {
/// let orchestrator = Orchestrator::builder().build()?;
///
/// let results = orchestrator.start_services(&["postgres", "redis"]).await;
/// if let Some(pg) = orchestrator.get_connection_info("postgres") {
///     println!("{}", pg.connection.unwrap_or_default());
/// }
///
/// orchestrator.stop_all().await;
/// # Ok(())
/// # }
/// ```
pub struct Orchestrator {
    registry: Arc<dyn ServiceRegistry>,
    controller: LifecycleController,
    environment: Arc<Environment>,
    settings: Settings,
    cancellation_token: CancellationToken,
}

impl Orchestrator {
    pub(super) fn new(
        registry: Arc<dyn ServiceRegistry>,
        controller: LifecycleController,
        settings: Settings,
    ) -> Self {
        let environment = Arc::clone(controller.environment());
        Self {
            registry,
            controller,
            environment,
            settings,
            cancellation_token: CancellationToken::new(),
        }
    }

    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::new()
    }

    pub fn environment(&self) -> &Arc<Environment> {
        &self.environment
    }

    pub fn registry(&self) -> &Arc<dyn ServiceRegistry> {
        &self.registry
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Start one service with timeout and cancellation support.
    ///
    /// An explicit `port_override` wins over one in `settings.ports`.
    pub async fn start_service(
        &self,
        name: &str,
        port_override: Option<u16>,
    ) -> Result<ServiceInstance> {
        let cancel_token = self.cancellation_token.clone();
        if cancel_token.is_cancelled() {
            return Err(Error::Cancelled(name.to_string()));
        }
        let timeout = self.settings.start_timeout;

        let result = tokio::select! {
            biased;

            _ = cancel_token.cancelled() => {
                Err(Error::Cancelled(name.to_string()))
            }

            result = tokio::time::timeout(timeout, self.start_service_impl(name, port_override)) => {
                match result {
                    Ok(inner_result) => inner_result,
                    Err(_elapsed) => Err(Error::Timeout(name.to_string())),
                }
            }
        };

        if matches!(result, Err(Error::Cancelled(_) | Error::Timeout(_))) {
            self.discard_untracked(name).await;
        }
        result
    }

    /// Remove a container an interrupted start may have created before it
    /// was tracked. Tracked containers are left to `stop_all`.
    async fn discard_untracked(&self, name: &str) {
        if self.environment.contains(name) || self.registry.lookup(name).is_err() {
            return;
        }

        let container_name = self.environment.container_name(name);
        let removal = self.controller.remove_if_exists(&container_name);
        match tokio::time::timeout(self.settings.stop_bound(), removal).await {
            Ok(Ok(true)) => tracing::info!(
                "Removed untracked container {} after interrupted start",
                container_name
            ),
            Ok(Ok(false)) => {}
            Ok(Err(e)) => tracing::warn!(
                "Failed to remove untracked container {}: {}",
                container_name,
                e
            ),
            Err(_elapsed) => {
                tracing::warn!("Timed out removing untracked container {}", container_name)
            }
        }
    }

    async fn start_service_impl(
        &self,
        name: &str,
        port_override: Option<u16>,
    ) -> Result<ServiceInstance> {
        async {
            let descriptor = self.registry.lookup(name)?;
            descriptor.validate(name)?;

            let container_name = self.environment.container_name(name);
            let port = port_override.or_else(|| self.settings.ports.get(name).copied());

            tracing::info!("Starting service '{}' as {}", name, container_name);
            self.controller
                .start(name, &descriptor, &container_name, port)
                .await
        }
        .instrument(tracing::info_span!("start_service", service.name = %name))
        .await
    }

    /// Start several services concurrently.
    ///
    /// Duplicate names are started once. Each outcome is recorded under its
    /// name; a failure is logged and never affects the other starts.
    pub async fn start_services<S: AsRef<str>>(
        &self,
        names: &[S],
    ) -> BTreeMap<String, Result<ServiceInstance>> {
        let mut seen = BTreeSet::new();
        let unique: Vec<String> = names
            .iter()
            .map(|name| name.as_ref().to_string())
            .filter(|name| seen.insert(name.clone()))
            .collect();

        let results: Vec<(String, Result<ServiceInstance>)> = stream::iter(unique)
            .map(|name| async move {
                let result = self.start_service(&name, None).await;
                (name, result)
            })
            .buffer_unordered(self.settings.max_parallel_starts)
            .collect()
            .await;

        for (name, result) in &results {
            if let Err(e) = result {
                tracing::error!("Failed to start service '{}': {}", name, e);
            }
        }

        results.into_iter().collect()
    }

    /// Stop one service, bounded by the configured stop timeout plus slack.
    pub async fn stop_service(&self, name: &str) -> Result<()> {
        self.controller
            .stop(name, self.settings.stop_timeout)
            .instrument(tracing::info_span!("stop_service", service.name = %name))
            .await
    }

    /// Stop every tracked service concurrently.
    ///
    /// Failures are logged and reported in the summary, never raised. Runs
    /// even after cancellation.
    pub async fn stop_all(&self) -> StopSummary {
        let names = self.environment.names();
        if names.is_empty() {
            return StopSummary::default();
        }

        tracing::info!("Stopping {} service(s)", names.len());
        let results =
            futures::future::join_all(names.iter().map(|name| self.stop_service(name))).await;

        let mut summary = StopSummary::default();
        for (name, result) in names.into_iter().zip(results) {
            match result {
                Ok(()) => summary.stopped.push(name),
                Err(e) => {
                    tracing::error!("Failed to stop service '{}': {}", name, e);
                    summary.failed.push(name);
                }
            }
        }
        summary
    }

    /// Remove leftover containers named `<prefix>_<service>` from earlier runs.
    ///
    /// Returns, per name, whether a container was found and removed.
    pub async fn remove_leftovers<S: AsRef<str>>(&self, names: &[S]) -> BTreeMap<String, Result<bool>> {
        let futures = names.iter().map(|name| {
            let name = name.as_ref().to_string();
            async move {
                let container_name = self.environment.container_name(&name);
                let result = self.controller.remove_if_exists(&container_name).await;
                if result.is_ok() {
                    self.environment.deregister(&name);
                }
                (name, result)
            }
        });

        futures::future::join_all(futures).await.into_iter().collect()
    }

    /// Snapshot of a tracked service, if any.
    pub fn get_connection_info(&self, name: &str) -> Option<ServiceInstance> {
        self.environment.get(name)
    }

    /// Names of all tracked services, sorted.
    pub fn list_running(&self) -> Vec<String> {
        self.environment.names()
    }

    /// Cancel all in-flight start operations.
    pub fn cancel_operations(&self) {
        self.cancellation_token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation_token.is_cancelled()
    }

    /// Token shared with signal handlers.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    /// Cancel pending starts, then stop everything.
    pub async fn shutdown(&self) -> StopSummary {
        self.cancel_operations();
        self.stop_all().await
    }
}
