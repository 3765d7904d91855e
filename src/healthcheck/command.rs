use super::HealthChecker;
use crate::config::ProbeCommand;
use crate::docker::ContainerEngine;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Longest a single probe command may run before it counts as a failed check.
const MAX_CHECK_TIMEOUT: Duration = Duration::from_secs(10);

/// Runs the descriptor's probe command inside the container through the engine.
///
/// Exit code 0 is healthy. Non-zero exits, engine errors, and slow checks all
/// count as "not healthy yet".
pub struct ExecChecker {
    engine: Arc<dyn ContainerEngine>,
    container_id: String,
    command: ProbeCommand,
    timeout: Duration,
}

impl ExecChecker {
    pub fn new(
        engine: Arc<dyn ContainerEngine>,
        container_id: impl Into<String>,
        command: ProbeCommand,
        probe_timeout: Duration,
    ) -> Self {
        Self {
            engine,
            container_id: container_id.into(),
            command,
            timeout: probe_timeout.min(MAX_CHECK_TIMEOUT),
        }
    }
}

#[async_trait]
impl HealthChecker for ExecChecker {
    async fn check(&self) -> Result<bool> {
        let argv = self.command.argv();
        let result =
            tokio::time::timeout(self.timeout, self.engine.exec(&self.container_id, &argv)).await;

        match result {
            Ok(Ok(0)) => Ok(true),
            Ok(Ok(code)) => {
                tracing::debug!(
                    "Healthcheck '{}' in {} exited with {}",
                    self.command,
                    self.container_id,
                    code
                );
                Ok(false)
            }
            Ok(Err(e)) => {
                tracing::debug!(
                    "Healthcheck '{}' in {} failed: {}",
                    self.command,
                    self.container_id,
                    e
                );
                Ok(false)
            }
            Err(_) => {
                tracing::debug!(
                    "Healthcheck '{}' in {} timed out after {:?}",
                    self.command,
                    self.container_id,
                    self.timeout
                );
                Ok(false)
            }
        }
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }
}
