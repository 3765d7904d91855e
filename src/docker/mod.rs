//! Container engine access.
//!
//! [`ContainerEngine`] is the capability interface the lifecycle controller
//! depends on; [`DockerClient`] implements it on top of the `docker` CLI.

pub mod client;
pub mod engine;
pub mod error;

pub use client::DockerClient;
pub use engine::{ContainerEngine, ContainerInfo, ContainerSpec, ContainerState, PortBinding};
pub use error::DockerError;
