//! Logging and filesystem helpers

pub mod app_paths;
pub mod dual_logging;
pub mod logging;
