//! Query session: login, context selection and serialized command execution.
//!
//! A [`Session`] owns one [`Connection`] behind a FIFO-fair async mutex, so
//! concurrent callers are served one round trip at a time in arrival order.
//! Login identity and the selected virtual server live in a
//! [`SessionMachine`] that is consulted before anything is queued and again
//! once the connection lock is held.
//!
//! [`Session::close`] cancels the in-flight command, fails every queued one
//! with [`AdminError::Closed`] and shuts the stream down. Any transport,
//! framing or timeout failure ends the session the same way. There is no
//! reconnect; open a new session instead.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex as StateLock;
use squery_proto::{
    Command, Connection, Response, SessionMachine, SessionState, Status,
};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Span, debug, info, instrument, warn};

use crate::admin::ServerAdmin;
use crate::config::Config;
use crate::error::{AdminError, AdminResult};
use crate::telemetry::{CommandTimer, spans};

/// One logged-in (or not yet logged-in) query connection.
///
/// Owned by the caller and shared by reference (wrap it in an `Arc` to use
/// it from several tasks). Dropping the session drops the connection, which
/// releases the socket.
pub struct Session<S = TcpStream> {
    id: String,
    conn: Mutex<Connection<S>>,
    machine: StateLock<SessionMachine>,
    cancel: CancellationToken,
    seq: AtomicU64,
    span: Span,
}

impl Session<TcpStream> {
    /// Connect to the configured endpoint and read the greeting.
    #[instrument(skip(config), fields(addr = %config.addr()))]
    pub async fn connect(config: &Config) -> AdminResult<Self> {
        let conn = Connection::connect(
            &config.server.host,
            config.server.port,
            config.connect_options(),
        )
        .await?;
        Ok(Self::with_label(conn, config.addr()))
    }
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wrap a connection whose greeting was already read.
    pub fn from_connection(conn: Connection<S>) -> Self {
        Self::with_label(conn, "stream".to_string())
    }

    fn with_label(conn: Connection<S>, addr: String) -> Self {
        let id = uuid::Uuid::new_v4().to_string();
        let span = spans::session(&id, &addr);
        let mut machine = SessionMachine::new();
        machine.opened();
        span.in_scope(|| info!("session opened"));

        Self {
            id,
            conn: Mutex::new(conn),
            machine: StateLock::new(machine),
            cancel: CancellationToken::new(),
            seq: AtomicU64::new(0),
            span,
        }
    }

    /// Unique id used in log spans.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        self.machine.lock().state()
    }

    /// Login name accepted by the server, if any.
    pub fn identity(&self) -> Option<String> {
        self.machine.lock().identity().map(str::to_string)
    }

    /// Selected virtual server, if any.
    pub fn context(&self) -> Option<u64> {
        self.machine.lock().context()
    }

    /// Sequence number of the last command sent (0 before the first).
    pub fn sequence(&self) -> u64 {
        self.seq.load(Ordering::Relaxed)
    }

    /// Whether the session reached its terminal state.
    pub fn is_closed(&self) -> bool {
        self.machine.lock().is_terminated()
    }

    /// Command façade borrowing this session.
    pub fn admin(&self) -> ServerAdmin<'_, S> {
        ServerAdmin::new(self)
    }

    /// Authenticate. A rejected login leaves the state unchanged.
    pub async fn login(&self, identity: &str, credential: &str) -> AdminResult<()> {
        let command = Command::builder("login")
            .param("client_login_name", identity)
            .secret("client_login_password", credential)
            .requires(SessionState::Connected)
            .build()?;

        let response = self
            .dispatch(&command, |machine| machine.logged_in(identity))
            .await?;
        if !response.is_ok() {
            let Status { id, message, .. } = response.status;
            warn!(parent: &self.span, id, %message, login = %identity, "login rejected");
            return Err(AdminError::Auth { id, message });
        }

        info!(parent: &self.span, login = %identity, "logged in");
        Ok(())
    }

    /// Drop the login. Identity and selected context are cleared.
    pub async fn logout(&self) -> AdminResult<()> {
        let command = Command::builder("logout")
            .requires(SessionState::Authenticated)
            .build()?;

        self.dispatch(&command, SessionMachine::logged_out)
            .await?
            .into_result()?;
        info!(parent: &self.span, "logged out");
        Ok(())
    }

    /// Select a virtual server. Failure keeps the previous state and context.
    pub async fn select_context(&self, id: u64) -> AdminResult<Status> {
        let command = Command::builder("use")
            .param("sid", id)
            .requires(SessionState::Authenticated)
            .build()?;

        let response = self
            .dispatch(&command, |machine| machine.context_selected(id))
            .await?
            .into_result()?;
        info!(parent: &self.span, context = id, "virtual server selected");
        Ok(response.status)
    }

    /// Send a command and return its response.
    ///
    /// Fails with [`AdminError::Precondition`] (nothing sent) when the
    /// session is below the state the command requires, and with
    /// [`AdminError::Command`] when the server rejects it. The verbs that
    /// change session state (`login`, `logout`, `use`) are rejected with
    /// [`AdminError::Validation`]; use [`login`](Self::login),
    /// [`logout`](Self::logout) and [`select_context`](Self::select_context).
    pub async fn execute(&self, command: Command) -> AdminResult<Response> {
        if let Some(method) = state_changing(command.verb()) {
            return Err(AdminError::Validation(format!(
                "`{}` changes session state, use Session::{method} instead",
                command.verb()
            )));
        }
        Ok(self.dispatch(&command, |_| {}).await?.into_result()?)
    }

    /// Close the session. Idempotent.
    ///
    /// The in-flight command and every queued command fail with
    /// [`AdminError::Closed`].
    pub async fn close(&self) {
        self.cancel.cancel();
        let was_open = {
            let mut machine = self.machine.lock();
            let was_open = !machine.is_terminated();
            machine.terminated();
            was_open
        };

        self.conn.lock().await.close().await;
        if was_open {
            info!(parent: &self.span, commands = self.sequence(), "session closed");
        }
    }

    /// One serialized round trip. The status is not interpreted here.
    ///
    /// `on_success` runs against the state machine before the connection is
    /// released, and only when the server answered `id=0`.
    async fn dispatch<F>(&self, command: &Command, on_success: F) -> AdminResult<Response>
    where
        F: FnOnce(&mut SessionMachine),
    {
        self.machine.lock().check(command.requires())?;
        if self.cancel.is_cancelled() {
            return Err(AdminError::Closed);
        }

        let mut conn = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(AdminError::Closed),
            conn = self.conn.lock() => conn,
        };

        // The state may have changed while this command was queued.
        let context = {
            let machine = self.machine.lock();
            machine.check(command.requires())?;
            machine.context()
        };

        let seq = self.seq.fetch_add(1, Ordering::Relaxed) + 1;
        let span = self
            .span
            .in_scope(|| spans::command(command.verb(), seq, context));
        let _timer = CommandTimer::new(command.verb(), seq);

        let outcome = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(AdminError::Closed),
            result = conn.round_trip(command).instrument(span.clone()) => {
                result.map_err(AdminError::from)
            }
        };

        match outcome {
            Ok(response) => {
                if response.is_ok() {
                    let mut machine = self.machine.lock();
                    on_success(&mut *machine);
                }
                debug!(
                    parent: &span,
                    status = response.status.id,
                    rows = response.rows.len(),
                    "response received"
                );
                Ok(response)
            }
            Err(err) => {
                if matches!(err, AdminError::Closed) {
                    debug!(parent: &span, "command aborted by close");
                } else {
                    warn!(parent: &span, error = %err, code = err.error_code(), "session terminated");
                }
                self.machine.lock().terminated();
                conn.close().await;
                Err(err)
            }
        }
    }
}

/// Session method owning a state-changing verb.
fn state_changing(verb: &str) -> Option<&'static str> {
    match verb {
        "login" => Some("login"),
        "logout" => Some("logout"),
        "use" => Some("select_context"),
        _ => None,
    }
}
