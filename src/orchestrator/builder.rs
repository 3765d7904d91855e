use super::environment::Environment;
use super::lifecycle::LifecycleController;
use super::Orchestrator;
use crate::config::{ServiceRegistry, Settings, StaticRegistry};
use crate::docker::{ContainerEngine, DockerClient};
use crate::error::Result;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Builder for constructing an `Orchestrator` with a fluent API.
///
/// Anything not set falls back to a default: the built-in service registry,
/// the `docker` CLI engine, and default [`Settings`].
///
/// # Example
///
/// ```no_run
/// use itenv::{Orchestrator, Settings};
///
/// # fn example() -> Result<(), itenv::Error> {
/// let settings = Settings {
///     prefix: "myapp_test".to_string(),
///     ..Default::default()
/// };
/// let orchestrator = Orchestrator::builder()
///     .settings(settings)
///     .port_override("postgres", 15432)
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct OrchestratorBuilder {
    registry: Option<Arc<dyn ServiceRegistry>>,
    engine: Option<Arc<dyn ContainerEngine>>,
    settings: Settings,
    port_overrides: BTreeMap<String, u16>,
}

impl OrchestratorBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            registry: None,
            engine: None,
            settings: Settings::default(),
            port_overrides: BTreeMap::new(),
        }
    }

    /// Set the registry services are looked up in.
    pub fn registry(mut self, registry: Arc<dyn ServiceRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Set the container engine.
    pub fn engine(mut self, engine: Arc<dyn ContainerEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Set the environment settings.
    ///
    /// Port overrides in `settings.ports` are merged with any set through
    /// [`port_override`](Self::port_override); the latter win.
    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    /// Override the primary host port for one service.
    pub fn port_override(mut self, service: impl Into<String>, port: u16) -> Self {
        self.port_overrides.insert(service.into(), port);
        self
    }

    /// Validate the settings and build the orchestrator.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) if the settings are invalid.
    pub fn build(self) -> Result<Orchestrator> {
        let mut settings = self.settings;
        settings.ports.extend(self.port_overrides);
        settings.validate()?;

        let registry = self
            .registry
            .unwrap_or_else(|| Arc::new(StaticRegistry::builtin()));
        let engine = self
            .engine
            .unwrap_or_else(|| Arc::new(DockerClient::new()));

        let environment = Arc::new(Environment::new(settings.prefix.clone()));
        let controller = LifecycleController::new(engine, environment, settings.clone());

        Ok(Orchestrator::new(registry, controller, settings))
    }
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
