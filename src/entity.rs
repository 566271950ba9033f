//! Entity views: typed, read-only projections of response rows.
//!
//! Required fields missing or non-numeric fail with
//! [`ProtocolError::MissingField`] / [`ProtocolError::InvalidField`].
//! Fields that only appear with list flags (`-uid`, `-away`, `-ip`, ...)
//! are `Option`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use squery_proto::{ProtocolError, Row};

/// Convert every row of a response.
pub fn from_rows<T>(rows: &[Row]) -> Result<Vec<T>, ProtocolError>
where
    T: for<'a> TryFrom<&'a Row, Error = ProtocolError>,
{
    rows.iter().map(T::try_from).collect()
}

fn timestamp(row: &Row, key: &str) -> Result<DateTime<Utc>, ProtocolError> {
    opt_timestamp(row, key)?.ok_or_else(|| ProtocolError::MissingField {
        field: key.to_string(),
    })
}

fn opt_timestamp(row: &Row, key: &str) -> Result<Option<DateTime<Utc>>, ProtocolError> {
    match row.opt_int(key)? {
        None => Ok(None),
        Some(secs) => DateTime::from_timestamp(secs, 0)
            .map(Some)
            .ok_or_else(|| ProtocolError::InvalidField {
                field: key.to_string(),
                value: secs.to_string(),
                expected: "unix timestamp",
            }),
    }
}

fn owned(value: Option<&str>) -> Option<String> {
    value.map(str::to_string)
}

/// A virtual server (`serverlist`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VirtualServer {
    pub id: u64,
    pub port: u64,
    pub name: String,
    /// `online`, `offline`, `none`, ...
    pub status: String,
    pub clients_online: Option<u64>,
    pub query_clients_online: Option<u64>,
    pub max_clients: Option<u64>,
    pub uptime_secs: Option<u64>,
    pub autostart: Option<bool>,
}

impl VirtualServer {
    pub fn is_online(&self) -> bool {
        self.status == "online"
    }
}

impl TryFrom<&Row> for VirtualServer {
    type Error = ProtocolError;

    fn try_from(row: &Row) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.uint("virtualserver_id")?,
            port: row.uint("virtualserver_port")?,
            name: row.text("virtualserver_name")?.to_string(),
            status: row.text("virtualserver_status")?.to_string(),
            clients_online: row.opt_uint("virtualserver_clientsonline")?,
            query_clients_online: row.opt_uint("virtualserver_queryclientsonline")?,
            max_clients: row.opt_uint("virtualserver_maxclients")?,
            uptime_secs: row.opt_uint("virtualserver_uptime")?,
            autostart: row.opt_flag("virtualserver_autostart")?,
        })
    }
}

/// A ban rule (`banlist`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BanRule {
    pub id: u64,
    pub ip: Option<String>,
    pub name: Option<String>,
    pub uid: Option<String>,
    pub reason: Option<String>,
    pub created: DateTime<Utc>,
    /// Seconds; `0` means permanent.
    pub duration_secs: u64,
    pub enforcements: Option<u64>,
    pub invoker_name: Option<String>,
    pub invoker_database_id: Option<u64>,
    pub invoker_uid: Option<String>,
}

impl BanRule {
    pub fn is_permanent(&self) -> bool {
        self.duration_secs == 0
    }
}

impl TryFrom<&Row> for BanRule {
    type Error = ProtocolError;

    fn try_from(row: &Row) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.uint("banid")?,
            ip: owned(row.opt_text("ip")),
            name: owned(row.opt_text("name")),
            uid: owned(row.opt_text("uid")),
            reason: owned(row.opt_text("reason")),
            created: timestamp(row, "created")?,
            duration_secs: row.opt_uint("duration")?.unwrap_or(0),
            enforcements: row.opt_uint("enforcements")?,
            invoker_name: owned(row.opt_text("invokername")),
            invoker_database_id: row.opt_uint("invokercldbid")?,
            invoker_uid: owned(row.opt_text("invokeruid")),
        })
    }
}

/// A channel (`channellist`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Channel {
    pub id: u64,
    /// Parent channel id, `0` at top level.
    pub parent_id: u64,
    pub order: u64,
    pub name: String,
    pub total_clients: Option<i64>,
    pub needed_subscribe_power: Option<i64>,
    /// With `-topic`.
    pub topic: Option<String>,
    /// With `-flags`.
    pub is_default: Option<bool>,
    pub has_password: Option<bool>,
    pub is_permanent: Option<bool>,
    pub is_semi_permanent: Option<bool>,
    /// With `-voice`.
    pub codec: Option<i64>,
    pub codec_quality: Option<i64>,
    pub needed_talk_power: Option<i64>,
    /// With `-limits`.
    pub max_clients: Option<i64>,
    pub max_family_clients: Option<i64>,
    /// With `-icon`.
    pub icon_id: Option<u64>,
    /// With `-secondsempty`; `-1` while occupied.
    pub seconds_empty: Option<i64>,
}

impl TryFrom<&Row> for Channel {
    type Error = ProtocolError;

    fn try_from(row: &Row) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.uint("cid")?,
            parent_id: row.opt_uint("pid")?.unwrap_or(0),
            order: row.opt_uint("channel_order")?.unwrap_or(0),
            name: row.text("channel_name")?.to_string(),
            total_clients: row.opt_int("total_clients")?,
            needed_subscribe_power: row.opt_int("channel_needed_subscribe_power")?,
            topic: owned(row.opt_text("channel_topic")),
            is_default: row.opt_flag("channel_flag_default")?,
            has_password: row.opt_flag("channel_flag_password")?,
            is_permanent: row.opt_flag("channel_flag_permanent")?,
            is_semi_permanent: row.opt_flag("channel_flag_semi_permanent")?,
            codec: row.opt_int("channel_codec")?,
            codec_quality: row.opt_int("channel_codec_quality")?,
            needed_talk_power: row.opt_int("channel_needed_talk_power")?,
            max_clients: row.opt_int("channel_maxclients")?,
            max_family_clients: row.opt_int("channel_maxfamilyclients")?,
            icon_id: row.opt_uint("channel_icon_id")?,
            seconds_empty: row.opt_int("seconds_empty")?,
        })
    }
}

/// A `channelfind` hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelMatch {
    pub id: u64,
    pub name: String,
}

impl TryFrom<&Row> for ChannelMatch {
    type Error = ProtocolError;

    fn try_from(row: &Row) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.uint("cid")?,
            name: row.text("channel_name")?.to_string(),
        })
    }
}

/// An online client (`clientlist`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Client {
    pub id: u64,
    pub channel_id: u64,
    pub database_id: u64,
    pub nickname: String,
    /// `0` voice client, `1` query client.
    pub client_type: u64,
    /// With `-uid`.
    pub unique_id: Option<String>,
    /// With `-away`.
    pub away: Option<bool>,
    pub away_message: Option<String>,
    /// With `-voice`.
    pub talking: Option<bool>,
    pub input_muted: Option<bool>,
    pub output_muted: Option<bool>,
    /// With `-times`.
    pub idle_time_ms: Option<u64>,
    pub created: Option<DateTime<Utc>>,
    pub last_connected: Option<DateTime<Utc>>,
    /// With `-groups`.
    pub server_groups: Option<Vec<u64>>,
    pub channel_group_id: Option<u64>,
    /// With `-info`.
    pub version: Option<String>,
    pub platform: Option<String>,
    /// With `-country`.
    pub country: Option<String>,
    /// With `-ip`.
    pub ip: Option<String>,
}

impl Client {
    pub fn is_query(&self) -> bool {
        self.client_type == 1
    }
}

fn id_list(row: &Row, key: &str) -> Result<Option<Vec<u64>>, ProtocolError> {
    let Some(raw) = row.opt_text(key) else {
        return Ok(None);
    };
    raw.split(',')
        .map(|id| {
            id.trim().parse().map_err(|_| ProtocolError::InvalidField {
                field: key.to_string(),
                value: raw.to_string(),
                expected: "comma-separated ids",
            })
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}

impl TryFrom<&Row> for Client {
    type Error = ProtocolError;

    fn try_from(row: &Row) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.uint("clid")?,
            channel_id: row.uint("cid")?,
            database_id: row.uint("client_database_id")?,
            nickname: row.text("client_nickname")?.to_string(),
            client_type: row.opt_uint("client_type")?.unwrap_or(0),
            unique_id: owned(row.opt_text("client_unique_identifier")),
            away: row.opt_flag("client_away")?,
            away_message: owned(row.opt_text("client_away_message")),
            talking: row.opt_flag("client_flag_talking")?,
            input_muted: row.opt_flag("client_input_muted")?,
            output_muted: row.opt_flag("client_output_muted")?,
            idle_time_ms: row.opt_uint("client_idle_time")?,
            created: opt_timestamp(row, "client_created")?,
            last_connected: opt_timestamp(row, "client_lastconnected")?,
            server_groups: id_list(row, "client_servergroups")?,
            channel_group_id: row.opt_uint("client_channel_group_id")?,
            version: owned(row.opt_text("client_version")),
            platform: owned(row.opt_text("client_platform")),
            country: owned(row.opt_text("client_country")),
            ip: owned(row.opt_text("connection_client_ip")),
        })
    }
}

/// A client known to the server database (`clientdblist`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DbClient {
    pub database_id: u64,
    pub unique_id: String,
    pub nickname: String,
    pub created: DateTime<Utc>,
    pub last_connected: DateTime<Utc>,
    pub total_connections: u64,
    pub last_ip: Option<String>,
    pub description: Option<String>,
}

impl TryFrom<&Row> for DbClient {
    type Error = ProtocolError;

    fn try_from(row: &Row) -> Result<Self, Self::Error> {
        Ok(Self {
            database_id: row.uint("cldbid")?,
            unique_id: row.text("client_unique_identifier")?.to_string(),
            nickname: row.text("client_nickname")?.to_string(),
            created: timestamp(row, "client_created")?,
            last_connected: timestamp(row, "client_lastconnected")?,
            total_connections: row.opt_uint("client_totalconnections")?.unwrap_or(0),
            last_ip: owned(row.opt_text("client_lastip")),
            description: owned(row.opt_text("client_description")),
        })
    }
}

/// Connection ids held by one unique identity (`clientgetids`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientIds {
    pub unique_id: String,
    pub id: u64,
    pub name: String,
}

impl TryFrom<&Row> for ClientIds {
    type Error = ProtocolError;

    fn try_from(row: &Row) -> Result<Self, Self::Error> {
        Ok(Self {
            unique_id: row.text("cluid")?.to_string(),
            id: row.uint("clid")?,
            name: row.text("name")?.to_string(),
        })
    }
}

/// A `clientfind` hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientMatch {
    pub id: u64,
    pub nickname: String,
}

impl TryFrom<&Row> for ClientMatch {
    type Error = ProtocolError;

    fn try_from(row: &Row) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.uint("clid")?,
            nickname: row.text("client_nickname")?.to_string(),
        })
    }
}
