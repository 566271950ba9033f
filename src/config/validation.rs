//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.

use super::Config;
use thiserror::Error;

/// Validation errors for configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("server.host is required")]
    MissingHost,
    #[error("server.port must be non-zero")]
    ZeroPort,
    #[error("server.greeting_lines must be at least 1")]
    ZeroGreetingLines,
    #[error("admin.login is required")]
    MissingLogin,
    #[error("admin.password is required (or set SQADMIN_PASSWORD)")]
    MissingPassword,
    #[error("timeouts.{0} must be non-zero")]
    ZeroTimeout(&'static str),
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.host.trim().is_empty() {
        errors.push(ValidationError::MissingHost);
    }
    if config.server.port == 0 {
        errors.push(ValidationError::ZeroPort);
    }
    if config.server.greeting_lines == 0 {
        errors.push(ValidationError::ZeroGreetingLines);
    }

    if config.admin.login.trim().is_empty() {
        errors.push(ValidationError::MissingLogin);
    }
    if config.admin.password.as_ref().is_none_or(|p| p.is_empty()) {
        errors.push(ValidationError::MissingPassword);
    }

    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("connect_secs"));
    }
    if config.timeouts.read_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("read_secs"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
