//! Environment orchestration.
//!
//! - `core` - [`Orchestrator`]: fan-out starts, teardown, queries, cancellation
//! - `builder` - [`OrchestratorBuilder`]
//! - `lifecycle` - [`LifecycleController`]: one container from create to remove
//! - `environment` - [`Environment`]: the tracked instances of one prefix

mod builder;
mod core;
mod environment;
mod lifecycle;

pub use builder::OrchestratorBuilder;
pub use core::*;
pub use environment::Environment;
pub use lifecycle::{LifecycleController, LABEL_MANAGED, LABEL_PREFIX, LABEL_SERVICE};
