use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Application-level health check for a service.
///
/// `Ok(false)` means "not healthy yet" and is retried by the readiness
/// poller. An `Err` is fatal to the wait.
#[async_trait]
pub trait HealthChecker: Send + Sync {
    /// Check if the service is healthy
    async fn check(&self) -> Result<bool>;

    /// Upper bound on a single check.
    fn timeout(&self) -> Duration;
}
