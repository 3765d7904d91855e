#![allow(unused_assignments)]

//! # itenv
//!
//! Disposable Docker service environments for integration tests.
//!
//! ## Features
//!
//! - **Built-in services**: postgres, mysql, mongodb, redis, rabbitmq, elasticsearch, minio
//! - **Fresh containers**: any leftover container with the same name is removed before a start
//! - **Readiness**: waits for the engine to report the container running, then for its healthcheck
//! - **Concurrent starts**: bounded fan-out; one failing service never affects the others
//! - **Guaranteed teardown**: `stop_all` stops everything concurrently, each stop time-bounded
//! - **Cancellation Support**: one `CancellationToken` interrupts every in-flight start
//!
//! ## Quick Start
//!
//! ```no_run
//! use itenv::Orchestrator;
//!
//! # async fn example() -> Result<(), itenv::Error> {
//! let orchestrator = Orchestrator::builder().build()?;
//!
//! let results = orchestrator.start_services(&["postgres", "redis"]).await;
//! for (name, result) in &results {
//!     match result {
//!         Ok(instance) => println!("{}: {:?}", name, instance.connection),
//!         Err(e) => eprintln!("{}: {}", name, e),
//!     }
//! }
//!
//! orchestrator.stop_all().await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Concurrency Model
//!
//! - All orchestrator methods take `&self`
//! - In-flight starts can be cancelled via [`Orchestrator::cancel_operations`]
//! - Every start and stop is bounded by a timeout

pub mod config;
pub mod docker;
pub mod error;
pub mod healthcheck;
pub mod orchestrator;
pub mod readiness;
pub mod service;

// Re-export commonly used types
pub use config::{Config, Parser, ServiceDescriptor, ServiceRegistry, Settings, StaticRegistry};
pub use error::{Error, Result};
pub use orchestrator::{Environment, Orchestrator, OrchestratorBuilder, StopSummary};
pub use service::{InstanceStatus, ServiceInstance};
