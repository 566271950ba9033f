//! Channel operations.

use squery_proto::{Command, CommandBuilder, Status};
use tokio::io::{AsyncRead, AsyncWrite};

use super::{ServerAdmin, non_empty, require};
use crate::entity::{Channel, ChannelMatch};
use crate::error::AdminResult;

/// Optional fields of `channellist` output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelListFlag {
    /// Channel topic.
    Topic,
    /// Default, password, permanent and semi-permanent flags.
    Flags,
    /// Needed talk power.
    Voice,
    /// Client limits.
    Limits,
    /// Icon id.
    Icon,
    /// Seconds the channel has been empty.
    SecondsEmpty,
}

impl ChannelListFlag {
    /// Wire token, e.g. `-topic`.
    pub fn as_flag(self) -> &'static str {
        match self {
            Self::Topic => "-topic",
            Self::Flags => "-flags",
            Self::Voice => "-voice",
            Self::Limits => "-limits",
            Self::Icon => "-icon",
            Self::SecondsEmpty => "-secondsempty",
        }
    }
}

/// Channel properties for create and edit.
///
/// Unset fields are not sent. `extra` carries any other `channel_*`
/// property verbatim; its keys must be valid parameter keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelProperties {
    /// New name (edit only; create takes the name as an argument).
    pub name: Option<String>,
    pub topic: Option<String>,
    pub description: Option<String>,
    /// Sent as a secret parameter, masked in wire logs.
    pub password: Option<String>,
    /// Survives the server restarting.
    pub permanent: Option<bool>,
    /// Survives until the server restarts.
    pub semi_permanent: Option<bool>,
    /// `-1` for unlimited.
    pub max_clients: Option<i64>,
    pub needed_talk_power: Option<i64>,
    /// Other `channel_*` properties, sent verbatim.
    pub extra: Vec<(String, String)>,
}

impl ChannelProperties {
    /// Whether no property is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    fn apply(&self, builder: CommandBuilder) -> CommandBuilder {
        let builder = builder
            .param_opt("channel_name", self.name.as_deref())
            .param_opt("channel_topic", self.topic.as_deref())
            .param_opt("channel_description", self.description.as_deref())
            .param_opt("channel_flag_permanent", self.permanent)
            .param_opt("channel_flag_semi_permanent", self.semi_permanent)
            .param_opt("channel_maxclients", self.max_clients)
            .param_opt("channel_needed_talk_power", self.needed_talk_power);
        let builder = match &self.password {
            Some(password) => builder.secret("channel_password", password),
            None => builder,
        };
        self.extra
            .iter()
            .fold(builder, |b, (key, value)| b.param(key, value))
    }
}

impl<S> ServerAdmin<'_, S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Create a channel.
    pub async fn channel_create(
        &self,
        name: &str,
        properties: ChannelProperties,
    ) -> AdminResult<Status> {
        non_empty(name, "channel name")?;
        require(
            properties.name.is_none(),
            "channel name given both as argument and property",
        )?;

        let builder = Command::builder("channelcreate").param("channel_name", name);
        let command = properties.apply(builder).build()?;
        self.action(command).await
    }

    /// Delete a channel. Without `force` the server refuses occupied channels.
    pub async fn channel_delete(&self, channel_id: u64, force: bool) -> AdminResult<Status> {
        let command = Command::builder("channeldelete")
            .param("cid", channel_id)
            .param("force", force)
            .build()?;
        self.action(command).await
    }

    /// Change channel properties.
    pub async fn channel_edit(
        &self,
        channel_id: u64,
        properties: ChannelProperties,
    ) -> AdminResult<Status> {
        require(!properties.is_empty(), "channel edit needs at least one property")?;
        if let Some(name) = &properties.name {
            non_empty(name, "channel name")?;
        }

        let builder = Command::builder("channeledit").param("cid", channel_id);
        let command = properties.apply(builder).build()?;
        self.action(command).await
    }

    /// Move a channel under `parent_id` at position `order`.
    pub async fn channel_move(
        &self,
        channel_id: u64,
        parent_id: u64,
        order: u64,
    ) -> AdminResult<Status> {
        require(channel_id != parent_id, "a channel cannot be its own parent")?;

        let command = Command::builder("channelmove")
            .param("cid", channel_id)
            .param("cpid", parent_id)
            .param("order", order)
            .build()?;
        self.action(command).await
    }

    /// Channels whose name matches `pattern`.
    pub async fn channel_find(&self, pattern: &str) -> AdminResult<Vec<ChannelMatch>> {
        non_empty(pattern, "channel find pattern")?;
        let command = Command::builder("channelfind")
            .param("pattern", pattern)
            .build()?;
        self.query(command).await
    }

    /// All channels, with the optional fields selected by `flags`.
    pub async fn channel_list(&self, flags: &[ChannelListFlag]) -> AdminResult<Vec<Channel>> {
        let command = flags
            .iter()
            .fold(Command::builder("channellist"), |b, flag| b.flag(flag.as_flag()))
            .build()?;
        self.query(command).await
    }
}
