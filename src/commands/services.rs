use crate::output::UserOutput;
use itenv::ServiceRegistry;
use serde_json::json;

pub fn run_services(
    registry: &dyn ServiceRegistry,
    json: bool,
    out: &dyn UserOutput,
) -> anyhow::Result<()> {
    let mut rows = Vec::new();
    for name in registry.names() {
        let descriptor = registry.lookup(&name)?;
        rows.push((name, descriptor));
    }

    if json {
        let list: Vec<_> = rows
            .iter()
            .map(|(name, descriptor)| {
                json!({
                    "name": name,
                    "image": descriptor.image,
                    "port": descriptor.port.host,
                    "healthcheck": descriptor.healthcheck.is_some(),
                })
            })
            .collect();
        out.data(&serde_json::to_string_pretty(&list)?);
        return Ok(());
    }

    out.status("Supported services:");
    out.status(&format!("{:-<50}", ""));
    for (name, descriptor) in rows {
        out.status(&format!(
            "  {:<15} {:<35} {}",
            name, descriptor.image, descriptor.port.host
        ));
    }
    Ok(())
}
