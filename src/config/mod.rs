//! Configuration: service descriptors, the descriptor registry, and
//! environment settings.
//!
//! - `descriptor` - `ServiceDescriptor`, `PortMapping`, `ProbeSpec`
//! - `builtin` - the built-in service table
//! - `registry` - `ServiceRegistry` trait and `StaticRegistry`
//! - `settings` - `Settings` and the `itenv.yaml` layout (`Config`)
//! - `parser` - YAML config loading
//! - `duration` - "500ms" / "10s" / "1m" parsing

mod builtin;
mod descriptor;
mod duration;
mod parser;
mod registry;
mod settings;

pub use builtin::*;
pub use descriptor::*;
pub use duration::*;
pub use parser::*;
pub use registry::*;
pub use settings::*;
