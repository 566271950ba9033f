//! Default value functions for configuration.
//!
//! Separated into its own module for clarity and reuse.

// =============================================================================
// Server Defaults
// =============================================================================

pub fn default_host() -> String {
    "localhost".to_string()
}

pub fn default_port() -> u16 {
    10011
}

pub fn default_greeting_lines() -> usize {
    2
}

// =============================================================================
// Admin Defaults
// =============================================================================

pub fn default_login() -> String {
    "serveradmin".to_string()
}

// =============================================================================
// Timeout Defaults
// =============================================================================

pub fn default_connect_secs() -> u64 {
    10
}

pub fn default_read_secs() -> u64 {
    30
}
