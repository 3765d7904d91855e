mod down;
mod services;
mod up;

pub use down::run_down;
pub use services::run_services;
pub use up::run_up;
