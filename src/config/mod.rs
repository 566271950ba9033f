//! Configuration loading and management.
//!
//! This module is split into logical submodules:
//! - [`types`]: Config struct definitions, loading and env overrides
//! - [`defaults`]: serde default functions
//! - [`validation`]: startup checks that report every problem at once

mod defaults;
mod types;
mod validation;

pub use types::{
    AdminConfig, Config, ConfigError, LogConfig, LogFormat, Secret, ServerConfig, TimeoutsConfig,
};
pub use validation::{ValidationError, validate};
