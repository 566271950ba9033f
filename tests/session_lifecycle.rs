//! Integration tests for the session lifecycle: connect, login, context
//! selection, logout and close against a mock query server.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{MockServer, Reply, standard_reply};
use sqadmin::admin::ClientListFlag;
use sqadmin::{AdminError, Session};
use squery_proto::{Command, SessionState};

async fn logged_in(server: &MockServer) -> anyhow::Result<Session> {
    let session = Session::connect(&server.config()).await?;
    session.login("serveradmin", common::server::PASSWORD).await?;
    Ok(session)
}

#[tokio::test]
async fn test_full_admin_flow() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    let session = Session::connect(&server.config()).await?;
    assert_eq!(session.state(), SessionState::Connected);

    session.login("serveradmin", "secret").await?;
    assert_eq!(session.state(), SessionState::Authenticated);
    assert_eq!(session.identity().as_deref(), Some("serveradmin"));

    let admin = session.admin();
    let status = admin.select_server(2).await?;
    assert!(status.is_ok());
    assert_eq!(session.state(), SessionState::ContextSelected);
    assert_eq!(session.context(), Some(2));

    let clients = admin.client_list(&[ClientListFlag::Uid]).await?;
    assert_eq!(clients.len(), 3);
    assert_eq!(clients[2].nickname, "bob the builder");
    assert!(clients[0].is_query());

    session.logout().await?;
    assert_eq!(session.state(), SessionState::Connected);
    assert_eq!(session.identity(), None);
    assert_eq!(session.context(), None);

    session.close().await;
    assert_eq!(
        server.received(),
        vec![
            "login client_login_name=serveradmin client_login_password=secret",
            "use sid=2",
            "clientlist -uid",
            "logout",
        ]
    );
    assert_eq!(session.sequence(), 4);
    Ok(())
}

#[tokio::test]
async fn test_wrong_password_is_retryable() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    let session = Session::connect(&server.config()).await?;

    let err = session.login("serveradmin", "guess").await.unwrap_err();
    assert!(matches!(err, AdminError::Auth { id: 520, .. }));
    assert_eq!(session.state(), SessionState::Connected);

    session.login("serveradmin", "secret").await?;
    assert_eq!(session.state(), SessionState::Authenticated);
    Ok(())
}

#[tokio::test]
async fn test_failed_select_keeps_state() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    let session = logged_in(&server).await?;
    let admin = session.admin();

    let err = admin.select_server(999).await.unwrap_err();
    assert_eq!(err.status_id(), Some(1281));
    assert!(!err.is_fatal());
    assert_eq!(session.state(), SessionState::Authenticated);
    assert_eq!(session.context(), None);

    admin.select_server(1).await?;
    let err = admin.select_server(999).await.unwrap_err();
    assert!(matches!(err, AdminError::Command(_)));
    assert_eq!(session.context(), Some(1));
    Ok(())
}

#[tokio::test]
async fn test_precondition_sends_nothing() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    let session = Session::connect(&server.config()).await?;

    let err = session.admin().client_list(&[]).await.unwrap_err();
    assert!(matches!(
        err,
        AdminError::Precondition {
            required: SessionState::ContextSelected,
            actual: SessionState::Connected,
        }
    ));
    let err = session.logout().await.unwrap_err();
    assert!(err.is_client_side());

    // The next round trip proves nothing else reached the wire.
    session.login("serveradmin", "secret").await?;
    assert_eq!(server.received().len(), 1);
    assert_eq!(session.sequence(), 1);
    Ok(())
}

#[tokio::test]
async fn test_execute_raw_command() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    let session = logged_in(&server).await?;
    session.select_context(1).await?;

    let command = Command::builder("channellist").flag("-topic").build()?;
    let response = session.execute(command).await?;
    assert_eq!(response.rows.len(), 2);
    assert_eq!(response.rows[0].get("channel_name"), Some("Default Channel"));
    Ok(())
}

#[tokio::test]
async fn test_execute_keeps_state_verbs_on_session_methods() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    let session = logged_in(&server).await?;
    session.select_context(1).await?;
    let sent = server.received().len();

    let switch = Command::builder("use").param("sid", 2).build()?;
    let err = session.execute(switch).await.unwrap_err();
    assert!(matches!(err, AdminError::Validation(_)));
    assert_eq!(session.context(), Some(1));

    let logout = Command::builder("logout").build()?;
    let err = session.execute(logout).await.unwrap_err();
    assert!(matches!(err, AdminError::Validation(_)));
    assert_eq!(session.state(), SessionState::ContextSelected);
    assert_eq!(session.identity().as_deref(), Some("serveradmin"));
    assert_eq!(server.received().len(), sent);

    // Through the session method the state follows the server.
    session.logout().await?;
    let err = session.admin().channel_list(&[]).await.unwrap_err();
    assert!(matches!(err, AdminError::Precondition { .. }));
    assert_eq!(server.last().as_deref(), Some("logout"));
    Ok(())
}

#[tokio::test]
async fn test_empty_result_is_a_command_error() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    let session = logged_in(&server).await?;
    let admin = session.admin();
    admin.select_server(1).await?;

    let err = admin.ban_list().await.unwrap_err();
    assert_eq!(err.status_id(), Some(1281));
    assert_eq!(session.state(), SessionState::ContextSelected);
    Ok(())
}

#[tokio::test]
async fn test_timeout_terminates_session() -> anyhow::Result<()> {
    let server = MockServer::with_handler(Arc::new(|command: &Command| {
        if command.verb() == "serverlist" {
            Reply::ok().after(Duration::from_millis(1500))
        } else {
            standard_reply(command)
        }
    }))
    .await;
    let mut config = server.config();
    config.timeouts.read_secs = 1;

    let session = Session::connect(&config).await?;
    session.login("serveradmin", "secret").await?;

    let err = session.admin().server_list().await.unwrap_err();
    assert!(matches!(err, AdminError::Timeout(_)));
    assert!(session.is_closed());
    assert_eq!(session.state(), SessionState::Disconnected);

    let err = session.admin().server_list().await.unwrap_err();
    assert!(matches!(err, AdminError::Closed));
    Ok(())
}

#[tokio::test]
async fn test_peer_disconnect_terminates_session() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    let session = logged_in(&server).await?;
    drop(server);
    tokio::time::sleep(Duration::from_millis(50)).await;

    let err = session.admin().server_list().await.unwrap_err();
    assert!(err.is_fatal(), "unexpected error: {err}");
    assert!(session.is_closed());
    Ok(())
}

#[tokio::test]
async fn test_wrong_banner_is_rejected() {
    let server = MockServer::start().await;
    let mut config = server.config();
    config.server.banner = Some("SSH-2.0".to_string());

    let err = Session::connect(&config).await.err().expect("banner mismatch");
    assert!(matches!(err, AdminError::Protocol(_)));
}

#[tokio::test]
async fn test_connect_refused() {
    let server = MockServer::start().await;
    let mut config = server.config();
    let unused = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    config.server.port = unused.local_addr().expect("local addr").port();
    drop(unused);

    let err = Session::connect(&config).await.err().expect("nothing listens");
    assert!(matches!(err, AdminError::Connection { .. }));
    assert_eq!(err.error_code(), "connection_error");
}

#[tokio::test]
async fn test_close_is_idempotent() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    let session = logged_in(&server).await?;

    session.close().await;
    session.close().await;
    assert!(session.is_closed());

    let err = session.login("serveradmin", "secret").await.unwrap_err();
    assert!(matches!(err, AdminError::Closed));
    assert_eq!(server.received().len(), 1);
    Ok(())
}
