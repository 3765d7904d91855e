// Allow unused_assignments at module level because thiserror's generated code
// for struct variants triggers false positive warnings - the fields ARE used
// in the Display impl but rustc's lint pass doesn't see this.
#![allow(unused_assignments)]

use crate::docker::DockerError;
use miette::Diagnostic;
use std::io;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    #[error("Not found: {0}")]
    #[diagnostic(code(itenv::engine::not_found))]
    NotFound(String),

    #[error("Docker error: {0}")]
    #[diagnostic(
        code(itenv::engine::error),
        help("Check that Docker is running with `docker ps`")
    )]
    Engine(DockerError),

    #[error("{target}: container entered '{state}' state")]
    #[diagnostic(
        code(itenv::container::terminal_state),
        help("Inspect the container output with `docker logs <container>`")
    )]
    TerminalState { target: String, state: String },

    #[error("{target}: not ready after {attempts} checks ({elapsed:?})")]
    #[diagnostic(
        code(itenv::container::readiness_timeout),
        help("The service may be slow to start; raise the healthcheck timeout in itenv.yaml")
    )]
    ReadinessTimeout {
        target: String,
        attempts: u32,
        elapsed: Duration,
    },

    #[error("Service '{name}' not supported. Supported: {}", .supported.join(", "))]
    #[diagnostic(
        code(itenv::service::unsupported),
        help("List the available services with `itenv services`")
    )]
    UnsupportedService { name: String, supported: Vec<String> },

    #[error("Invalid descriptor for service '{service}': {reason}")]
    #[diagnostic(code(itenv::config::descriptor))]
    InvalidDescriptor { service: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Timeout waiting for service '{0}'")]
    #[diagnostic(
        code(itenv::service::timeout),
        help("The operation exceeded its overall time bound; the container is still tracked for cleanup")
    )]
    Timeout(String),

    #[error("Operation cancelled for service '{0}'")]
    Cancelled(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<DockerError> for Error {
    fn from(err: DockerError) -> Self {
        match err {
            DockerError::NotFound { object } => Error::NotFound(object),
            other => Error::Engine(other),
        }
    }
}

impl Error {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    /// Returns a helpful suggestion for resolving this error, if available.
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Error::Engine(DockerError::ExecFailed { .. }) => Some(
                "The docker CLI could not be executed. Install Docker or put it on PATH.".to_string(),
            ),
            Error::Engine(_) => Some("Check that Docker is running: docker ps".to_string()),
            Error::UnsupportedService { .. } => {
                Some("List the available services with: itenv services".to_string())
            }
            Error::TerminalState { target, .. } => Some(format!(
                "The container exited during startup. Inspect it with: docker logs {}",
                target
            )),
            Error::ReadinessTimeout { .. } | Error::Timeout(_) => Some(
                "Leftover containers can be removed with: itenv down".to_string(),
            ),
            Error::InvalidDescriptor { .. } | Error::Config(_) | Error::Parse(_) => {
                Some("Check the services section of itenv.yaml".to_string())
            }
            _ => None,
        }
    }

    /// Formats the error with its suggestion (if any) for user-friendly display.
    pub fn with_suggestion(&self) -> String {
        match self.suggestion() {
            Some(suggestion) => format!("{}\n\nHint: {}", self, suggestion),
            None => self.to_string(),
        }
    }
}
