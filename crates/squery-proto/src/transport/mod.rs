//! Query transport layer for async I/O.
//!
//! [`Connection`] wraps a TCP stream (or any `AsyncRead + AsyncWrite`
//! stream, which is how the tests drive it) in a [`LineCodec`] frame and
//! offers strict request/response round trips:
//!
//! ```ignore
//! use squery_proto::{Command, ConnectOptions, Connection, SessionState};
//!
//! let mut conn = Connection::connect("localhost", 10011, ConnectOptions::default()).await?;
//! let version = Command::builder("version")
//!     .requires(SessionState::Connected)
//!     .build()?;
//! let response = conn.round_trip(&version).await?;
//! conn.close().await;
//! ```
//!
//! [`LineCodec`]: crate::line::LineCodec

mod connection;
mod error;

pub use connection::{ConnectOptions, Connection, WIRE_TARGET};
pub use error::TransportError;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{Command, Status};
    use crate::error::ProtocolError;
    use std::time::Duration;
    use tokio::io::{duplex, AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream};

    const GREETING: &[u8] = b"TS3\n\rWelcome to the query interface.\n\r";

    fn options() -> ConnectOptions {
        ConnectOptions {
            read_timeout: Duration::from_millis(200),
            banner: Some("TS3".to_string()),
            ..ConnectOptions::default()
        }
    }

    async fn connected() -> (Connection<DuplexStream>, BufReader<DuplexStream>) {
        let (client, mut server) = duplex(4096);
        server.write_all(GREETING).await.unwrap();
        let conn = Connection::handshake(client, options()).await.unwrap();
        (conn, BufReader::new(server))
    }

    fn probe() -> Command {
        Command::builder("clientlist").flag("-uid").build().unwrap()
    }

    #[tokio::test]
    async fn test_greeting_is_recorded() {
        let (conn, _server) = connected().await;
        assert_eq!(
            conn.greeting(),
            &["TS3".to_string(), "Welcome to the query interface.".to_string()]
        );
        assert!(conn.is_open());
    }

    #[tokio::test]
    async fn test_unexpected_banner() {
        let (client, mut server) = duplex(1024);
        server.write_all(b"SSH-2.0-OpenSSH\n").await.unwrap();

        match Connection::handshake(client, options()).await {
            Err(TransportError::Protocol(ProtocolError::UnexpectedBanner { actual, .. })) => {
                assert_eq!(actual, "SSH-2.0-OpenSSH");
            }
            other => panic!("expected UnexpectedBanner, got {:?}", other.err()),
        }
    }

    #[tokio::test]
    async fn test_round_trip_with_rows() {
        let (mut conn, mut server) = connected().await;

        let server_task = tokio::spawn(async move {
            let mut line = String::new();
            server.read_line(&mut line).await.unwrap();
            assert_eq!(line, "clientlist -uid\n");
            let stream = server.get_mut();
            // Split the reply across writes to exercise line buffering.
            stream.write_all(b"clid=1 client_nickname=a|cl").await.unwrap();
            stream.flush().await.unwrap();
            tokio::time::sleep(Duration::from_millis(10)).await;
            stream
                .write_all(b"id=2 client_nickname=b\n\rerror id=0 msg=ok\n\r")
                .await
                .unwrap();
            server
        });

        let response = conn.round_trip(&probe()).await.unwrap();
        assert_eq!(response.rows.len(), 2);
        assert_eq!(response.rows[1].get("client_nickname"), Some("b"));
        assert_eq!(response.status, Status::ok());
        server_task.await.unwrap();
    }

    #[tokio::test]
    async fn test_notifications_skipped() {
        let (mut conn, mut server) = connected().await;
        server
            .get_mut()
            .write_all(b"notifytextmessage msg=hi\n\rerror id=0 msg=ok\n\r")
            .await
            .unwrap();

        conn.send(&probe()).await.unwrap();
        let response = conn.receive_until_status().await.unwrap();
        assert!(response.rows.is_empty());
    }

    #[tokio::test]
    async fn test_failure_status_is_not_transport_error() {
        let (mut conn, mut server) = connected().await;
        server
            .get_mut()
            .write_all(b"error id=1281 msg=database\\sempty\\sresult\\sset\n\r")
            .await
            .unwrap();

        let response = conn.round_trip(&probe()).await.unwrap();
        assert_eq!(response.status.id, 1281);
        assert!(conn.is_open());
    }

    #[tokio::test]
    async fn test_timeout_breaks_connection() {
        let (mut conn, _server) = connected().await;

        let err = conn.round_trip(&probe()).await.unwrap_err();
        assert!(matches!(err, TransportError::Timeout(_)));
        assert!(!conn.is_open());
        assert!(matches!(
            conn.send(&probe()).await,
            Err(TransportError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_peer_disconnect() {
        let (mut conn, server) = connected().await;
        drop(server);

        let err = conn.round_trip(&probe()).await.unwrap_err();
        assert!(matches!(
            err,
            TransportError::ConnectionClosed | TransportError::Io(_)
        ));
        assert!(!conn.is_open());
    }

    #[tokio::test]
    async fn test_malformed_status_breaks_connection() {
        let (mut conn, mut server) = connected().await;
        server.get_mut().write_all(b"error msg=ok\n").await.unwrap();

        let err = conn.round_trip(&probe()).await.unwrap_err();
        assert!(matches!(
            err,
            TransportError::Protocol(ProtocolError::MalformedStatus { .. })
        ));
        assert!(!conn.is_open());
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let (mut conn, _server) = connected().await;
        conn.close().await;
        conn.close().await;
        assert!(!conn.is_open());
        assert!(matches!(
            conn.receive_until_status().await,
            Err(TransportError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let err = Connection::connect("127.0.0.1", port, ConnectOptions::default())
            .await
            .err()
            .expect("connect should fail");
        assert!(err.is_connect());
    }
}
