//! Framed query connection over TCP (or any duplex stream).

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_util::codec::Framed;
use tracing::{debug, info, warn};

use crate::codec::{classify, Command, LineKind, Response, ResponseReader};
use crate::error::ProtocolError;
use crate::line::{LineCodec, DEFAULT_MAX_LINE_LEN};

use super::error::TransportError;

/// Tracing target for raw protocol lines.
pub const WIRE_TARGET: &str = "squery::wire";

/// Options applied when opening a [`Connection`].
#[derive(Clone, Debug)]
pub struct ConnectOptions {
    /// Bound on TCP connection establishment.
    pub connect_timeout: Duration,
    /// Bound on every line read while waiting for a response.
    pub read_timeout: Duration,
    /// Maximum accepted line length.
    pub max_line_len: usize,
    /// Number of greeting lines the server sends after accept.
    pub greeting_lines: usize,
    /// Expected first greeting line, if any.
    pub banner: Option<String>,
    /// Emit every raw line under the [`WIRE_TARGET`] tracing target.
    pub log_wire: bool,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(30),
            max_line_len: DEFAULT_MAX_LINE_LEN,
            greeting_lines: 2,
            banner: None,
            log_wire: false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LinkState {
    Open,
    /// An I/O, framing or timeout failure left the stream mid-response.
    Broken,
    Closed,
}

/// One query connection: strict request/response over a line-framed stream.
///
/// `send` and [`receive_until_status`](Self::receive_until_status) must
/// alternate; [`round_trip`](Self::round_trip) does both. Dropping the
/// connection releases the stream.
pub struct Connection<S = TcpStream> {
    framed: Framed<S, LineCodec>,
    options: ConnectOptions,
    greeting: Vec<String>,
    state: LinkState,
}

impl Connection<TcpStream> {
    /// Resolve `host`, connect and read the greeting.
    pub async fn connect(
        host: &str,
        port: u16,
        options: ConnectOptions,
    ) -> Result<Self, TransportError> {
        let addr = format!("{host}:{port}");
        let connect_error = |source| TransportError::Connect {
            addr: addr.clone(),
            source,
        };

        let stream = match timeout(options.connect_timeout, TcpStream::connect((host, port))).await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => return Err(connect_error(e)),
            Err(_) => {
                return Err(connect_error(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    format!("connect timed out after {:?}", options.connect_timeout),
                )))
            }
        };

        if let Err(e) = Self::enable_keepalive(&stream) {
            warn!(error = %e, "failed to enable TCP keepalive");
        }
        if let Err(e) = stream.set_nodelay(true) {
            warn!(error = %e, "failed to set TCP_NODELAY");
        }

        debug!(%addr, "transport established");
        Self::handshake(stream, options).await
    }

    fn enable_keepalive(stream: &TcpStream) -> std::io::Result<()> {
        use socket2::{SockRef, TcpKeepalive};

        let sock = SockRef::from(stream);
        let keepalive = TcpKeepalive::new()
            .with_time(Duration::from_secs(120))
            .with_interval(Duration::from_secs(30));

        sock.set_tcp_keepalive(&keepalive)
    }
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wrap an established stream and read the server greeting.
    pub async fn handshake(stream: S, options: ConnectOptions) -> Result<Self, TransportError> {
        let codec = LineCodec::with_max_len(options.max_line_len);
        let mut conn = Self {
            framed: Framed::new(stream, codec),
            greeting: Vec::with_capacity(options.greeting_lines),
            options,
            state: LinkState::Open,
        };

        while conn.greeting.len() < conn.options.greeting_lines {
            let line = conn.next_line().await?;
            if line.is_empty() {
                continue;
            }
            if conn.greeting.is_empty() {
                if let Some(banner) = &conn.options.banner {
                    if line != *banner {
                        conn.state = LinkState::Broken;
                        return Err(ProtocolError::UnexpectedBanner {
                            expected: banner.clone(),
                            actual: line,
                        }
                        .into());
                    }
                }
            }
            debug!(line = %line, "greeting");
            conn.greeting.push(line);
        }

        Ok(conn)
    }

    /// Greeting lines received at connect time.
    pub fn greeting(&self) -> &[String] {
        &self.greeting
    }

    /// Options in effect.
    pub fn options(&self) -> &ConnectOptions {
        &self.options
    }

    /// Whether commands may still be sent.
    pub fn is_open(&self) -> bool {
        self.state == LinkState::Open
    }

    /// Write one command line.
    pub async fn send(&mut self, command: &Command) -> Result<(), TransportError> {
        self.ensure_open()?;
        if self.options.log_wire {
            info!(target: WIRE_TARGET, "-> {}", command.redacted());
        }

        let result = self.framed.send(command.encode()).await;
        self.poison_on_error(result)
    }

    /// Read lines until the status line and decode the response.
    ///
    /// Notification lines are skipped. Each line read is bounded by the read
    /// timeout; on expiry the connection is left broken.
    pub async fn receive_until_status(&mut self) -> Result<Response, TransportError> {
        self.ensure_open()?;
        let mut reader = ResponseReader::new();

        loop {
            let line = self.next_line().await?;
            if line.is_empty() {
                continue;
            }
            if classify(&line) == LineKind::Notification {
                debug!(line = %line, "skipping notification");
                continue;
            }

            let fed = reader.feed(&line).map_err(TransportError::from);
            if let Some(response) = self.poison_on_error(fed)? {
                return Ok(response);
            }
        }
    }

    /// Send a command and wait for its response.
    pub async fn round_trip(&mut self, command: &Command) -> Result<Response, TransportError> {
        self.send(command).await?;
        self.receive_until_status().await
    }

    /// Shut the stream down. Idempotent.
    pub async fn close(&mut self) {
        if self.state == LinkState::Closed {
            return;
        }
        self.state = LinkState::Closed;
        if let Err(e) = self.framed.get_mut().shutdown().await {
            debug!(error = %e, "error while shutting down transport");
        }
    }

    async fn next_line(&mut self) -> Result<String, TransportError> {
        let read_timeout = self.options.read_timeout;
        let result = match timeout(read_timeout, self.framed.next()).await {
            Err(_) => Err(TransportError::Timeout(read_timeout)),
            Ok(None) => Err(TransportError::ConnectionClosed),
            Ok(Some(result)) => result,
        };

        let line = self.poison_on_error(result)?;
        if self.options.log_wire {
            info!(target: WIRE_TARGET, "<- {}", line);
        }
        Ok(line)
    }

    fn ensure_open(&self) -> Result<(), TransportError> {
        match self.state {
            LinkState::Open => Ok(()),
            LinkState::Broken | LinkState::Closed => Err(TransportError::Closed),
        }
    }

    fn poison_on_error<T>(&mut self, result: Result<T, TransportError>) -> Result<T, TransportError> {
        if result.is_err() && self.state == LinkState::Open {
            self.state = LinkState::Broken;
        }
        result
    }
}

impl<S> Drop for Connection<S> {
    fn drop(&mut self) {
        if self.state != LinkState::Closed {
            debug!("releasing query connection");
        }
    }
}
