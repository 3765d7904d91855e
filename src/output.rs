/// Abstraction over user-facing output.
///
/// Command modules use this trait instead of `println!`/`eprintln!` so that
/// JSON mode can keep stdout machine-readable.
pub trait UserOutput: Send + Sync {
    /// Informational status message (e.g., "Stopping all services...")
    fn status(&self, message: &str);

    /// Success message (e.g., "postgres ready: postgresql://...")
    fn success(&self, message: &str);

    /// Warning message (e.g., "Failed to remove itest_redis")
    fn warning(&self, message: &str);

    /// Error message (e.g., "redis failed: ...")
    fn error(&self, message: &str);

    /// Structured payload for machine consumers.
    fn data(&self, payload: &str);

    /// A blank line separator.
    fn blank(&self);
}

/// Standard CLI output: results to stdout, diagnostics to stderr.
pub struct CliOutput;

impl UserOutput for CliOutput {
    fn status(&self, message: &str) {
        println!("{}", message);
    }

    fn success(&self, message: &str) {
        println!("{}", message);
    }

    fn warning(&self, message: &str) {
        eprintln!("{}", message);
    }

    fn error(&self, message: &str) {
        eprintln!("\x1b[31m{}\x1b[0m", message);
    }

    fn data(&self, payload: &str) {
        println!("{}", payload);
    }

    fn blank(&self) {
        println!();
    }
}

/// JSON mode: only structured payloads reach stdout; everything else goes
/// to stderr.
pub struct JsonOutput;

impl UserOutput for JsonOutput {
    fn status(&self, message: &str) {
        eprintln!("{}", message);
    }

    fn success(&self, message: &str) {
        eprintln!("{}", message);
    }

    fn warning(&self, message: &str) {
        eprintln!("{}", message);
    }

    fn error(&self, message: &str) {
        eprintln!("{}", message);
    }

    fn data(&self, payload: &str) {
        println!("{}", payload);
    }

    fn blank(&self) {}
}
