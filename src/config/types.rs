//! Core configuration types and loading.

use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

use squery_proto::ConnectOptions;

use super::defaults::{
    default_connect_secs, default_greeting_lines, default_host, default_login, default_port,
    default_read_secs,
};
use super::validation::{self, ValidationError};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid value for {var}: {value:?}")]
    Env { var: &'static str, value: String },
    #[error("invalid configuration: {}", join_errors(.0))]
    Invalid(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Client configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Query endpoint.
    #[serde(default)]
    pub server: ServerConfig,
    /// Login credentials.
    #[serde(default)]
    pub admin: AdminConfig,
    /// Connect and read bounds.
    #[serde(default)]
    pub timeouts: TimeoutsConfig,
    /// Logging setup.
    #[serde(default)]
    pub log: LogConfig,
}

impl Config {
    /// Environment variable overriding `server.host`.
    pub const ENV_HOST: &'static str = "SQADMIN_HOST";
    /// Environment variable overriding `server.port`.
    pub const ENV_PORT: &'static str = "SQADMIN_PORT";
    /// Environment variable overriding `admin.login`.
    pub const ENV_LOGIN: &'static str = "SQADMIN_LOGIN";
    /// Environment variable overriding `admin.password`.
    pub const ENV_PASSWORD: &'static str = "SQADMIN_PASSWORD";

    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// Apply `SQADMIN_*` overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_from(|var| std::env::var(var).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        if let Some(host) = lookup(Self::ENV_HOST) {
            self.server.host = host;
        }
        if let Some(port) = lookup(Self::ENV_PORT) {
            self.server.port = port.trim().parse().map_err(|_| ConfigError::Env {
                var: Self::ENV_PORT,
                value: port,
            })?;
        }
        if let Some(login) = lookup(Self::ENV_LOGIN) {
            self.admin.login = login;
        }
        if let Some(password) = lookup(Self::ENV_PASSWORD) {
            self.admin.password = Some(Secret::new(password));
        }
        Ok(())
    }

    /// Check the configuration, collecting every problem.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validation::validate(self).map_err(ConfigError::Invalid)
    }

    /// `host:port` of the query endpoint.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Transport options derived from this configuration.
    pub fn connect_options(&self) -> ConnectOptions {
        ConnectOptions {
            connect_timeout: Duration::from_secs(self.timeouts.connect_secs),
            read_timeout: Duration::from_secs(self.timeouts.read_secs),
            greeting_lines: self.server.greeting_lines,
            banner: self.server.banner.clone(),
            log_wire: self.log.verbosity >= 1,
            ..ConnectOptions::default()
        }
    }
}

/// Query endpoint configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host name or address (default: "localhost").
    #[serde(default = "default_host")]
    pub host: String,
    /// Query port (default: 10011).
    #[serde(default = "default_port")]
    pub port: u16,
    /// Expected first greeting line, checked when set.
    #[serde(default)]
    pub banner: Option<String>,
    /// Number of greeting lines sent by the server (default: 2).
    #[serde(default = "default_greeting_lines")]
    pub greeting_lines: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            banner: None,
            greeting_lines: default_greeting_lines(),
        }
    }
}

/// Login credentials.
#[derive(Debug, Clone, Deserialize)]
pub struct AdminConfig {
    /// Query login name (default: "serveradmin").
    #[serde(default = "default_login")]
    pub login: String,
    /// Query password. May come from `SQADMIN_PASSWORD` instead.
    #[serde(default)]
    pub password: Option<Secret>,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            login: default_login(),
            password: None,
        }
    }
}

/// Connect and read bounds, in seconds.
#[derive(Debug, Clone, Deserialize)]
pub struct TimeoutsConfig {
    /// TCP connect bound (default: 10).
    #[serde(default = "default_connect_secs")]
    pub connect_secs: u64,
    /// Bound on each line read while awaiting a response (default: 30).
    #[serde(default = "default_read_secs")]
    pub read_secs: u64,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            connect_secs: default_connect_secs(),
            read_secs: default_read_secs(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogConfig {
    /// 0: info, 1: debug plus raw wire lines, 2 or more: trace.
    #[serde(default)]
    pub verbosity: u8,
    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl LogConfig {
    /// Default `EnvFilter` directive for this verbosity.
    pub fn filter_directive(&self) -> &'static str {
        match self.verbosity {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// A credential that is wiped from memory on drop and never printed.
#[derive(Clone, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The secret text.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}
