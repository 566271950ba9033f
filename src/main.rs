//! sqadmin - query administration client.
//!
//! Usage: `sqadmin [config.toml] <action> [args]`
//!
//! Actions: `servers`, `clients <sid>`, `channels <sid>`, `bans <sid>`,
//! `dbclients <sid>`, `broadcast <message>`. Entity views are printed as
//! one JSON object per line.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, bail};
use serde::Serialize;
use sqadmin::admin::{ChannelListFlag, ClientListFlag};
use sqadmin::config::{Config, Secret};
use sqadmin::{Session, telemetry};
use tracing::{error, info};

const DEFAULT_CONFIG: &str = "sqadmin.toml";

enum Action {
    Servers,
    Clients(u64),
    Channels(u64),
    Bans(u64),
    DbClients(u64),
    Broadcast(String),
}

impl Action {
    fn parse(args: &[String]) -> anyhow::Result<Self> {
        let Some((name, rest)) = args.split_first() else {
            bail!("missing action (servers, clients, channels, bans, dbclients, broadcast)");
        };
        let sid = || -> anyhow::Result<u64> {
            let raw = rest.first().context("missing virtual server id")?;
            raw.parse()
                .with_context(|| format!("invalid virtual server id {raw:?}"))
        };

        Ok(match name.as_str() {
            "servers" => Self::Servers,
            "clients" => Self::Clients(sid()?),
            "channels" => Self::Channels(sid()?),
            "bans" => Self::Bans(sid()?),
            "dbclients" => Self::DbClients(sid()?),
            "broadcast" if !rest.is_empty() => Self::Broadcast(rest.join(" ")),
            "broadcast" => bail!("missing broadcast message"),
            other => bail!("unknown action {other:?}"),
        })
    }
}

fn load_config(path: Option<&str>) -> anyhow::Result<Config> {
    let mut config = match path {
        Some(path) => Config::load(path).with_context(|| format!("loading {path}"))?,
        None if Path::new(DEFAULT_CONFIG).exists() => Config::load(DEFAULT_CONFIG)?,
        None => Config::default(),
    };
    config.apply_env()?;
    config.validate()?;
    Ok(config)
}

fn emit<T: Serialize>(items: &[T]) -> anyhow::Result<()> {
    let mut out = std::io::stdout().lock();
    for item in items {
        serde_json::to_writer(&mut out, item)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(())
}

async fn run(session: &Session, action: Action) -> anyhow::Result<()> {
    let admin = session.admin();
    match action {
        Action::Servers => emit(&admin.server_list().await?)?,
        Action::Clients(sid) => {
            admin.select_server(sid).await?;
            let flags = [ClientListFlag::Uid, ClientListFlag::Away, ClientListFlag::Ip];
            emit(&admin.client_list(&flags).await?)?;
        }
        Action::Channels(sid) => {
            admin.select_server(sid).await?;
            let flags = [ChannelListFlag::Topic, ChannelListFlag::Flags];
            emit(&admin.channel_list(&flags).await?)?;
        }
        Action::Bans(sid) => {
            admin.select_server(sid).await?;
            emit(&admin.ban_list().await?)?;
        }
        Action::DbClients(sid) => {
            admin.select_server(sid).await?;
            emit(&admin.client_db_list().await?)?;
        }
        Action::Broadcast(message) => {
            let status = admin.broadcast(&message).await?;
            info!(status = status.id, "broadcast sent");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let (config_path, action_args) = match args.first() {
        Some(first) if first.ends_with(".toml") => (Some(first.as_str()), &args[1..]),
        _ => (None, &args[..]),
    };

    let config = load_config(config_path)?;
    telemetry::init(&config.log);
    let action = Action::parse(action_args)?;

    let session = Session::connect(&config).await.map_err(|e| {
        error!(addr = %config.addr(), error = %e, code = e.error_code(), "Failed to connect");
        e
    })?;

    let password = config.admin.password.as_ref().map(Secret::expose).unwrap_or_default();
    let result = match session.login(&config.admin.login, password).await {
        Ok(()) => run(&session, action).await,
        Err(e) => Err(e.into()),
    };

    session.close().await;
    if let Err(e) = &result {
        error!(error = %e, "action failed");
    }
    result
}
