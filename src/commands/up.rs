use crate::output::UserOutput;
use itenv::docker::DockerClient;
use itenv::{Orchestrator, ServiceInstance, StopSummary};
use serde_json::json;
use std::collections::BTreeMap;
use std::time::Duration;

const DAEMON_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn run_up(
    orchestrator: &Orchestrator,
    services: Vec<String>,
    json: bool,
    out: &dyn UserOutput,
) -> anyhow::Result<()> {
    let services = if services.is_empty() {
        orchestrator.settings().default_services.clone()
    } else {
        services
    };
    if services.is_empty() {
        out.status("No services specified and no default services configured");
        return Ok(());
    }

    if !DockerClient::new().is_daemon_healthy(DAEMON_CHECK_TIMEOUT).await {
        anyhow::bail!("Docker daemon is not reachable. Is Docker running?");
    }

    // Ctrl-C cancels in-flight starts and ends the wait below.
    let cancel_token = orchestrator.cancellation_token();
    let signal_token = cancel_token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal_token.cancel();
        }
    });

    out.status(&format!("Starting {}...", services.join(", ")));
    let results = orchestrator.start_services(&services).await;

    let mut ready: BTreeMap<String, ServiceInstance> = BTreeMap::new();
    let mut failed: BTreeMap<String, String> = BTreeMap::new();
    for (name, result) in results {
        match result {
            Ok(instance) => {
                out.success(&format!(
                    "  + {:<15} {}",
                    name,
                    instance.connection.as_deref().unwrap_or("")
                ));
                ready.insert(name, instance);
            }
            Err(e) => {
                out.error(&format!("  x {:<15} {}", name, e.with_suggestion()));
                failed.insert(name, e.to_string());
            }
        }
    }

    if json {
        let payload = json!({
            "prefix": orchestrator.environment().prefix(),
            "services": ready,
            "failed": failed,
        });
        out.data(&serde_json::to_string_pretty(&payload)?);
    }

    if cancel_token.is_cancelled() {
        out.status("\nStartup aborted. Cleaning up...");
        report_teardown(&orchestrator.stop_all().await, out);
        return Ok(());
    }

    if ready.is_empty() {
        report_teardown(&orchestrator.stop_all().await, out);
        anyhow::bail!("No services could be started");
    }

    out.blank();
    out.status("Services are running. Press Ctrl-C to stop.");
    cancel_token.cancelled().await;

    out.status("\nStopping services...");
    report_teardown(&orchestrator.stop_all().await, out);
    Ok(())
}

fn report_teardown(summary: &StopSummary, out: &dyn UserOutput) {
    for name in &summary.failed {
        out.warning(&format!(
            "Failed to stop '{}'; remove it later with `itenv down {}`",
            name, name
        ));
    }
    if !summary.stopped.is_empty() {
        out.status(&format!("Stopped {}", summary.stopped.join(", ")));
    }
}
