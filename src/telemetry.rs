//! Telemetry utilities: logging setup, command timing and span helpers.

use std::time::Instant;

use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::config::{LogConfig, LogFormat};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise the configured verbosity picks the
/// level. Raw wire lines are emitted under [`squery_proto::WIRE_TARGET`]
/// once verbosity is at least 1.
pub fn init(log: &LogConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log.filter_directive()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    match log.format {
        LogFormat::Pretty => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// Guard for timing one command round trip.
///
/// Logs the elapsed time when dropped, whatever the outcome.
pub struct CommandTimer {
    verb: String,
    seq: u64,
    start: Instant,
}

impl CommandTimer {
    /// Start timing a command.
    pub fn new(verb: impl Into<String>, seq: u64) -> Self {
        Self {
            verb: verb.into(),
            seq,
            start: Instant::now(),
        }
    }
}

impl Drop for CommandTimer {
    fn drop(&mut self) {
        let elapsed_ms = self.start.elapsed().as_secs_f64() * 1000.0;
        debug!(verb = %self.verb, seq = self.seq, elapsed_ms, "command finished");
    }
}

/// Standardized span constructors for session observability.
pub mod spans {
    use tracing::{Span, info_span};

    /// Create a span for a query session.
    pub fn session(id: &str, addr: &str) -> Span {
        info_span!("session", id = %id, addr = %addr)
    }

    /// Create a span for a command execution.
    pub fn command(verb: &str, seq: u64, context: Option<u64>) -> Span {
        if let Some(context) = context {
            info_span!("command", verb = %verb, seq, context)
        } else {
            info_span!("command", verb = %verb, seq)
        }
    }
}
