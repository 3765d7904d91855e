//! Application-level health checks.
//!
//! A [`HealthChecker`] answers one question once; the readiness poller in
//! [`crate::readiness`] decides how often to ask and for how long.

mod checker;
mod command;

pub use checker::HealthChecker;
pub use command::ExecChecker;
