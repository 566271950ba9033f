//! In-process mock query server.
//!
//! Accepts one connection, sends a greeting, then answers each command line
//! through a handler. Every received line is recorded, and the server notes
//! when a client sends a second command before the first was answered.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{FutureExt, SinkExt, StreamExt};
use parking_lot::Mutex;
use sqadmin::config::{Config, Secret};
use squery_proto::{Command, LineCodec, escape};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::codec::Framed;

pub const BANNER: &str = "TS3";
pub const PASSWORD: &str = "secret";

/// What the server sends back for one command.
#[derive(Debug, Clone, Default)]
pub struct Reply {
    pub lines: Vec<String>,
    pub delay: Option<Duration>,
}

impl Reply {
    pub fn ok() -> Self {
        Self::rows(Vec::<String>::new())
    }

    pub fn fail(id: u32, msg: &str) -> Self {
        Self {
            lines: vec![format!("error id={id} msg={}", escape(msg))],
            delay: None,
        }
    }

    /// Rows on one data line, then a success status.
    pub fn rows<I, T>(rows: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let rows: Vec<String> = rows.into_iter().map(Into::into).collect();
        let mut lines = Vec::new();
        if !rows.is_empty() {
            lines.push(rows.join("|"));
        }
        lines.push("error id=0 msg=ok".to_string());
        Self { lines, delay: None }
    }

    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

pub type Handler = Arc<dyn Fn(&Command) -> Reply + Send + Sync>;

#[derive(Default)]
struct Log {
    lines: Vec<String>,
    pipelined: bool,
}

pub struct MockServer {
    port: u16,
    log: Arc<Mutex<Log>>,
    task: JoinHandle<()>,
}

impl MockServer {
    /// Start a server answering like a small query host.
    pub async fn start() -> Self {
        Self::with_handler(Arc::new(standard_reply)).await
    }

    pub async fn with_handler(handler: Handler) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("local addr").port();
        let log = Arc::new(Mutex::new(Log::default()));

        let task_log = Arc::clone(&log);
        let task = tokio::spawn(async move {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            let mut framed = Framed::new(stream, LineCodec::new());
            for line in [BANNER, "Welcome to the mock query interface."] {
                if framed.send(line.to_string()).await.is_err() {
                    return;
                }
            }

            let mut pending = VecDeque::new();
            loop {
                let line = match pending.pop_front() {
                    Some(line) => line,
                    None => match framed.next().await {
                        Some(Ok(line)) => line,
                        _ => return,
                    },
                };
                if line.is_empty() {
                    continue;
                }
                task_log.lock().lines.push(line.clone());
                let reply = match Command::decode(&line) {
                    Ok(command) => handler(&command),
                    Err(_) => Reply::fail(1538, "invalid parameter"),
                };

                if let Some(delay) = reply.delay {
                    tokio::time::sleep(delay).await;
                }
                // A well-behaved client waits for the status line.
                while let Some(Some(Ok(early))) = framed.next().now_or_never() {
                    task_log.lock().pipelined = true;
                    pending.push_back(early);
                }
                for line in reply.lines {
                    if framed.send(line).await.is_err() {
                        return;
                    }
                }
            }
        });

        Self { port, log, task }
    }

    pub fn config(&self) -> Config {
        let mut config = Config::default();
        config.server.host = "127.0.0.1".to_string();
        config.server.port = self.port;
        config.server.banner = Some(BANNER.to_string());
        config.admin.password = Some(Secret::new(PASSWORD));
        config.timeouts.read_secs = 2;
        config
    }

    /// Command lines received so far.
    pub fn received(&self) -> Vec<String> {
        self.log.lock().lines.clone()
    }

    /// Last command line received.
    pub fn last(&self) -> Option<String> {
        self.log.lock().lines.last().cloned()
    }

    /// Whether a command arrived before the previous one was answered.
    pub fn saw_pipelining(&self) -> bool {
        self.log.lock().pipelined
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn arg(command: &Command, key: &str) -> Option<String> {
    command
        .param(key)
        .and_then(|value| value.as_text())
        .map(|text| text.into_owned())
}

/// Replies of a small query host with two virtual servers.
pub fn standard_reply(command: &Command) -> Reply {
    match command.verb() {
        "login" => match arg(command, "client_login_password").as_deref() {
            Some(PASSWORD) => Reply::ok(),
            _ => Reply::fail(520, "invalid loginname or password"),
        },
        "logout" | "gm" => Reply::ok(),
        "use" => match arg(command, "sid").as_deref() {
            Some("1") | Some("2") => Reply::ok(),
            _ => Reply::fail(1281, "invalid channelID"),
        },
        "serverlist" => Reply::rows([
            "virtualserver_id=1 virtualserver_port=9987 virtualserver_status=online virtualserver_clientsonline=3 virtualserver_name=Main\\sServer",
            "virtualserver_id=2 virtualserver_port=9988 virtualserver_status=online virtualserver_clientsonline=1 virtualserver_name=Second",
        ]),
        "clientlist" => Reply::rows([
            "clid=1 cid=1 client_database_id=1 client_nickname=serveradmin client_type=1",
            "clid=5 cid=2 client_database_id=10 client_nickname=alice client_type=0",
            "clid=6 cid=2 client_database_id=11 client_nickname=bob\\sthe\\sbuilder client_type=0",
        ]),
        "channellist" => Reply::rows([
            "cid=1 pid=0 channel_order=0 channel_name=Default\\sChannel total_clients=1",
            "cid=2 pid=0 channel_order=1 channel_name=Lobby total_clients=2",
        ]),
        "banlist" => Reply::fail(1281, "database empty result set"),
        _ => Reply::ok(),
    }
}
