use std::fmt;
use std::time::Duration;

/// Structured error type for Docker CLI operations.
///
/// `NotFound` is split out from the generic command failure so callers can
/// treat expected absence (idempotent removal, image presence checks) as a
/// normal outcome without string matching.
#[derive(Debug)]
pub enum DockerError {
    /// Docker command timed out.
    Timeout { command: String, timeout: Duration },

    /// Docker command ran but returned non-zero exit.
    CommandFailed {
        command: String,
        stderr: String,
        exit_code: Option<i32>,
    },

    /// Docker binary couldn't be executed (not in PATH, permission denied).
    ExecFailed {
        command: String,
        source: std::io::Error,
    },

    /// Container or image doesn't exist (parsed from "No such ..." stderr).
    NotFound { object: String },

    /// Docker answered, but with output we could not interpret.
    Malformed { command: String, reason: String },
}

impl DockerError {
    /// Create a timeout error.
    pub fn timeout(cmd: impl Into<String>, dur: Duration) -> Self {
        DockerError::Timeout {
            command: cmd.into(),
            timeout: dur,
        }
    }

    /// Create an error from a failed `std::process::Output`.
    ///
    /// Docker reports missing containers and images only through stderr, so
    /// this is where "No such ..." becomes [`DockerError::NotFound`].
    pub fn failed(cmd: impl Into<String>, object: &str, output: &std::process::Output) -> Self {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if is_not_found_message(&stderr) {
            return DockerError::NotFound {
                object: object.to_string(),
            };
        }
        DockerError::CommandFailed {
            command: cmd.into(),
            stderr,
            exit_code: output.status.code(),
        }
    }

    /// Create an exec-failed error (binary not found / permission denied).
    pub fn exec_failed(cmd: impl Into<String>, err: std::io::Error) -> Self {
        DockerError::ExecFailed {
            command: cmd.into(),
            source: err,
        }
    }

    pub fn malformed(cmd: impl Into<String>, reason: impl Into<String>) -> Self {
        DockerError::Malformed {
            command: cmd.into(),
            reason: reason.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DockerError::NotFound { .. })
    }
}

pub(crate) fn is_not_found_message(stderr: &str) -> bool {
    stderr.contains("No such container")
        || stderr.contains("No such image")
        || stderr.contains("No such object")
}

impl fmt::Display for DockerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DockerError::Timeout { command, timeout } => {
                write!(
                    f,
                    "Timed out running '{}' (exceeded {} seconds)",
                    command,
                    timeout.as_secs()
                )
            }
            DockerError::CommandFailed {
                command,
                stderr,
                exit_code,
            } => {
                if let Some(code) = exit_code {
                    write!(f, "'{}' failed (exit code {}): {}", command, code, stderr)
                } else {
                    write!(f, "'{}' failed: {}", command, stderr)
                }
            }
            DockerError::ExecFailed { command, source } => {
                write!(f, "Failed to execute '{}': {}", command, source)
            }
            DockerError::NotFound { object } => {
                write!(f, "No such object: {}", object)
            }
            DockerError::Malformed { command, reason } => {
                write!(f, "Unexpected output from '{}': {}", command, reason)
            }
        }
    }
}

impl std::error::Error for DockerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DockerError::ExecFailed { source, .. } => Some(source),
            _ => None,
        }
    }
}
