//! # squery-proto
//!
//! Codec, framing and transport for line-oriented server query protocols
//! of the `verb key=value -flag` family.
//!
//! ## Features
//!
//! - Value escaping and unescaping for the reserved character set
//! - Validated command construction with list parameters and flags
//! - Response decoding into ordered rows plus a terminating status
//! - A sans-IO session state machine
//! - Optional Tokio integration: line codec and a framed connection

#![deny(clippy::all)]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! ## Quick Start
//!
//! ### Building commands
//!
//! ```rust
//! use squery_proto::{Command, SessionState};
//!
//! let cmd = Command::builder("clientkick")
//!     .list("clid", [5, 6])
//!     .param("reasonid", 5)
//!     .param("reasonmsg", "go away")
//!     .requires(SessionState::ContextSelected)
//!     .build()
//!     .expect("valid command");
//!
//! assert_eq!(
//!     cmd.encode(),
//!     "clientkick clid=5|clid=6 reasonid=5 reasonmsg=go\\saway"
//! );
//! ```
//!
//! ### Parsing responses
//!
//! ```rust
//! use squery_proto::Response;
//!
//! let raw = "clid=1 client_nickname=Alice|clid=2 client_nickname=Bob\nerror id=0 msg=ok";
//! let response = Response::parse(raw).expect("well-formed response");
//!
//! assert!(response.is_ok());
//! assert_eq!(response.rows[1].get("client_nickname"), Some("Bob"));
//! ```

pub mod codec;
pub mod error;
#[cfg(feature = "tokio")]
pub mod line;
pub mod state;
#[cfg(feature = "tokio")]
pub mod transport;

pub use self::codec::{
    escape, unescape, Command, CommandBuilder, LineKind, Response, ResponseReader, Row, Status,
    Value,
};
pub use self::error::{CommandBuildError, CommandError, ProtocolError};
pub use self::state::{SessionMachine, SessionState, StateError};

#[cfg(feature = "tokio")]
pub use self::line::{LineCodec, DEFAULT_MAX_LINE_LEN};
#[cfg(feature = "tokio")]
pub use self::transport::{ConnectOptions, Connection, TransportError, WIRE_TARGET};
