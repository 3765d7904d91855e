//! Live service instances and container naming.

mod naming;
mod types;

pub use naming::{container_name, sanitize_container_name_component};
pub use types::*;
