//! Client operations.

use squery_proto::{Command, Status};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::instrument;

use super::{ServerAdmin, non_empty, require, unsupported};
use crate::entity::{Client, ClientIds, ClientMatch, DbClient};
use crate::error::AdminResult;

/// Optional fields of `clientlist` output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientListFlag {
    /// Unique identity.
    Uid,
    /// Away flag and message.
    Away,
    /// Talk and mute flags.
    Voice,
    /// Idle, created and last-connected times.
    Times,
    /// Server and channel groups.
    Groups,
    /// Client version and platform.
    Info,
    /// Country code.
    Country,
    /// Remote address.
    Ip,
}

impl ClientListFlag {
    /// Wire token, e.g. `-uid`.
    pub fn as_flag(self) -> &'static str {
        match self {
            Self::Uid => "-uid",
            Self::Away => "-away",
            Self::Voice => "-voice",
            Self::Times => "-times",
            Self::Groups => "-groups",
            Self::Info => "-info",
            Self::Country => "-country",
            Self::Ip => "-ip",
        }
    }
}

/// Where a kicked client is removed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KickFrom {
    /// Back to the default channel.
    Channel,
    /// Off the server.
    Server,
}

impl KickFrom {
    /// Protocol reason id.
    pub fn reason_id(self) -> u8 {
        match self {
            Self::Channel => 4,
            Self::Server => 5,
        }
    }
}

/// Client properties for edit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientProperties {
    pub description: Option<String>,
    /// Grants talk power in moderated channels.
    pub is_talker: Option<bool>,
    /// Other `client_*` properties, sent verbatim.
    pub extra: Vec<(String, String)>,
}

impl ClientProperties {
    /// Whether no property is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl<S> ServerAdmin<'_, S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Move clients into a channel.
    pub async fn client_move(
        &self,
        channel_id: u64,
        client_ids: &[u64],
        password: Option<&str>,
    ) -> AdminResult<Status> {
        require(!client_ids.is_empty(), "client move needs at least one client id")?;

        let builder = Command::builder("clientmove")
            .list("clid", client_ids)
            .param("cid", channel_id);
        let builder = match password {
            Some(password) => builder.secret("cpw", password),
            None => builder,
        };
        self.action(builder.build()?).await
    }

    /// Change client properties.
    pub async fn client_edit(
        &self,
        client_id: u64,
        properties: ClientProperties,
    ) -> AdminResult<Status> {
        require(!properties.is_empty(), "client edit needs at least one property")?;

        let builder = Command::builder("clientedit")
            .param("clid", client_id)
            .param_opt("client_description", properties.description.as_deref())
            .param_opt("client_is_talker", properties.is_talker);
        let command = properties
            .extra
            .iter()
            .fold(builder, |b, (key, value)| b.param(key, value))
            .build()?;
        self.action(command).await
    }

    /// Online clients whose nickname matches `pattern`.
    pub async fn client_find(&self, pattern: &str) -> AdminResult<Vec<ClientMatch>> {
        non_empty(pattern, "client find pattern")?;
        let command = Command::builder("clientfind")
            .param("pattern", pattern)
            .build()?;
        self.query(command).await
    }

    /// Kick clients from their channel or from the server.
    #[instrument(skip(self), level = "debug")]
    pub async fn client_kick(
        &self,
        client_ids: &[u64],
        from: KickFrom,
        reason: Option<&str>,
    ) -> AdminResult<Status> {
        require(!client_ids.is_empty(), "client kick needs at least one client id")?;

        let command = Command::builder("clientkick")
            .list("clid", client_ids)
            .param("reasonid", from.reason_id())
            .param_opt("reasonmsg", reason)
            .build()?;
        self.action(command).await
    }

    /// Online clients, with the optional fields selected by `flags`.
    pub async fn client_list(&self, flags: &[ClientListFlag]) -> AdminResult<Vec<Client>> {
        let command = flags
            .iter()
            .fold(Command::builder("clientlist"), |b, flag| b.flag(flag.as_flag()))
            .build()?;
        self.query(command).await
    }

    /// Clients known to the server database.
    pub async fn client_db_list(&self) -> AdminResult<Vec<DbClient>> {
        let command = Command::builder("clientdblist").build()?;
        self.query(command).await
    }

    /// Connection ids currently held by a unique identity.
    pub async fn client_get_ids(&self, unique_id: &str) -> AdminResult<Vec<ClientIds>> {
        non_empty(unique_id, "client unique id")?;
        let command = Command::builder("clientgetids")
            .param("cluid", unique_id)
            .build()?;
        self.query(command).await
    }

    /// Not available on this client.
    pub async fn client_poke(&self, _client_id: u64, _message: &str) -> AdminResult<Status> {
        unsupported("client_poke")
    }

    /// Not available on this client.
    pub async fn client_permission_list(&self, _database_id: u64) -> AdminResult<Status> {
        unsupported("client_permission_list")
    }
}
