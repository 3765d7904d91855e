use crate::output::UserOutput;
use itenv::Orchestrator;

pub async fn run_down(
    orchestrator: &Orchestrator,
    services: Vec<String>,
    out: &dyn UserOutput,
) -> anyhow::Result<()> {
    let services = if services.is_empty() {
        orchestrator.registry().names()
    } else {
        services
    };

    let results = orchestrator.remove_leftovers(&services).await;

    let mut removed = 0;
    let mut failures = 0;
    for (name, result) in results {
        let container = orchestrator.environment().container_name(&name);
        match result {
            Ok(true) => {
                out.status(&format!("  Removed {}", container));
                removed += 1;
            }
            Ok(false) => {}
            Err(e) => {
                out.warning(&format!("  Failed to remove {}: {}", container, e));
                failures += 1;
            }
        }
    }

    if removed == 0 && failures == 0 {
        out.status(&format!(
            "No containers found for prefix '{}'",
            orchestrator.environment().prefix()
        ));
    }

    if failures > 0 {
        anyhow::bail!("{} container(s) could not be removed", failures);
    }
    Ok(())
}
