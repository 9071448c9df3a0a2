//! Configuration module
//!
//! Endpoint, behavior and display settings loaded from a TOML file.

pub mod config;

pub use config::{BehaviorConfig, Config, DisplayConfig, EndpointConfig};
