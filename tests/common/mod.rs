//! Integration test common infrastructure.
//!
//! Provides an in-process mock query server with scripted replies and a
//! record of every command line it received.

pub mod server;

#[allow(unused_imports)]
pub use server::{MockServer, Reply, standard_reply};
