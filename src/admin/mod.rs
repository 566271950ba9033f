//! Command façade: one typed method per administrative operation.
//!
//! [`ServerAdmin`] borrows a caller-owned [`Session`] and turns domain
//! arguments into [`Command`]s. Arguments are checked locally first;
//! violations fail with [`AdminError::Validation`] and nothing is sent.
//! Server rejections come back unchanged as [`AdminError::Command`].
//!
//! Operations are grouped by domain:
//! - [`server`]: virtual server listing and selection, broadcast
//! - [`ban`]: ban rules and direct bans
//! - [`channel`]: channel CRUD, find and list
//! - [`client`]: client move, edit, find, kick and listings

mod ban;
mod channel;
mod client;
mod server;

pub use ban::BanRequest;
pub use channel::{ChannelListFlag, ChannelProperties};
pub use client::{ClientListFlag, ClientProperties, KickFrom};

use squery_proto::{Command, ProtocolError, Row, Status};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

use crate::entity::from_rows;
use crate::error::{AdminError, AdminResult};
use crate::session::Session;

/// Typed administrative operations over one session.
pub struct ServerAdmin<'a, S = TcpStream> {
    session: &'a Session<S>,
}

impl<'a, S> ServerAdmin<'a, S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Borrow `session` for administrative commands.
    pub fn new(session: &'a Session<S>) -> Self {
        Self { session }
    }

    /// The underlying session.
    pub fn session(&self) -> &'a Session<S> {
        self.session
    }

    /// Run an action command and return its status.
    async fn action(&self, command: Command) -> AdminResult<Status> {
        Ok(self.session.execute(command).await?.status)
    }

    /// Run a listing command and project its rows.
    async fn query<T>(&self, command: Command) -> AdminResult<Vec<T>>
    where
        T: for<'r> TryFrom<&'r Row, Error = ProtocolError>,
    {
        let response = self.session.execute(command).await?;
        from_rows(&response.rows).map_err(AdminError::View)
    }
}

fn require(condition: bool, message: &str) -> AdminResult<()> {
    if condition {
        Ok(())
    } else {
        Err(AdminError::Validation(message.to_string()))
    }
}

fn non_empty(value: &str, what: &str) -> AdminResult<()> {
    require(!value.trim().is_empty(), &format!("{what} must not be empty"))
}

fn unsupported<T>(operation: &'static str) -> AdminResult<T> {
    Err(AdminError::Unsupported(operation))
}
