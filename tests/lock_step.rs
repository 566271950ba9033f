//! Concurrency tests: one command in flight per session, FIFO order for
//! queued callers, and close failing everything still queued.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{MockServer, Reply, standard_reply};
use sqadmin::{AdminError, Session};
use squery_proto::{Command, SessionState};

/// `clientfind` answers slowly so later callers have to queue.
fn slow_find(delay: Duration) -> common::server::Handler {
    Arc::new(move |command: &Command| {
        if command.verb() == "clientfind" {
            Reply::ok().after(delay)
        } else {
            standard_reply(command)
        }
    })
}

async fn selected(server: &MockServer) -> anyhow::Result<Arc<Session>> {
    let session = Session::connect(&server.config()).await?;
    session.login("serveradmin", "secret").await?;
    session.select_context(1).await?;
    Ok(Arc::new(session))
}

#[tokio::test]
async fn test_concurrent_callers_are_serialized_in_order() -> anyhow::Result<()> {
    let server = MockServer::with_handler(slow_find(Duration::from_millis(100))).await;
    let session = selected(&server).await?;

    let mut handles = Vec::new();
    for pattern in ["alpha", "beta", "gamma", "delta"] {
        let session = Arc::clone(&session);
        handles.push(tokio::spawn(async move {
            session.admin().client_find(pattern).await
        }));
        // Give each task time to reach the queue before the next one starts.
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    for handle in handles {
        assert!(handle.await?.is_ok());
    }

    assert!(!server.saw_pipelining());
    let finds: Vec<String> = server
        .received()
        .into_iter()
        .filter(|line| line.starts_with("clientfind"))
        .collect();
    assert_eq!(
        finds,
        vec![
            "clientfind pattern=alpha",
            "clientfind pattern=beta",
            "clientfind pattern=gamma",
            "clientfind pattern=delta",
        ]
    );
    assert_eq!(session.sequence(), 6);
    Ok(())
}

#[tokio::test]
async fn test_close_fails_in_flight_and_queued_commands() -> anyhow::Result<()> {
    let server = MockServer::with_handler(slow_find(Duration::from_millis(500))).await;
    let session = selected(&server).await?;

    let mut handles = Vec::new();
    for pattern in ["first", "second", "third"] {
        let session = Arc::clone(&session);
        handles.push(tokio::spawn(async move {
            session.admin().client_find(pattern).await
        }));
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    session.close().await;
    for handle in handles {
        let err = handle.await?.unwrap_err();
        assert!(matches!(err, AdminError::Closed), "unexpected error: {err}");
    }

    assert_eq!(session.state(), SessionState::Disconnected);
    // Only the in-flight command reached the server.
    let finds = server
        .received()
        .into_iter()
        .filter(|line| line.starts_with("clientfind"))
        .count();
    assert_eq!(finds, 1);
    Ok(())
}

// Two workers: the queued caller may resume before the logout caller returns,
// so the state change has to land before the connection is released.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_queued_command_rechecks_state() -> anyhow::Result<()> {
    let server = MockServer::with_handler(Arc::new(|command: &Command| {
        if command.verb() == "logout" {
            Reply::ok().after(Duration::from_millis(100))
        } else {
            standard_reply(command)
        }
    }))
    .await;
    let session = selected(&server).await?;

    let logout = {
        let session = Arc::clone(&session);
        tokio::spawn(async move { session.logout().await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    // Accepted at call time, rejected once the logout ahead of it completes.
    let err = session.admin().channel_list(&[]).await.unwrap_err();
    assert!(matches!(
        err,
        AdminError::Precondition {
            required: SessionState::ContextSelected,
            actual: SessionState::Connected,
        }
    ));
    logout.await??;

    assert!(!server.received().iter().any(|line| line.starts_with("channellist")));
    Ok(())
}
