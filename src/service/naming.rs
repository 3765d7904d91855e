/// Container name for a service in an environment: `<prefix>_<service>`.
///
/// Both components are sanitized, so any registry name yields a name Docker
/// accepts.
pub fn container_name(prefix: &str, service: &str) -> String {
    format!(
        "{}_{}",
        sanitize_container_name_component(prefix),
        sanitize_container_name_component(service)
    )
}

/// Sanitize a string for use in Docker container names.
///
/// Docker container names must match `[a-zA-Z0-9][a-zA-Z0-9_.-]*`.
/// This function:
/// - Replaces invalid characters with underscores
/// - Truncates to 32 characters (to keep total name under Docker's 128 char limit)
/// - Ensures the result doesn't start with invalid characters
pub fn sanitize_container_name_component(input: &str) -> String {
    const MAX_COMPONENT_LEN: usize = 32;

    if input.is_empty() {
        return "unnamed".to_string();
    }

    // Every char is ASCII after this map, so byte-indexing the result is safe.
    let sanitized: String = input
        .chars()
        .take(MAX_COMPONENT_LEN)
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();

    // Docker requires first char to be alphanumeric
    if sanitized.starts_with(|c: char| !c.is_ascii_alphanumeric()) {
        format!("x{}", &sanitized[1..])
    } else {
        sanitized
    }
}
