//! Virtual server operations.

use squery_proto::{Command, SessionState, Status};
use tokio::io::{AsyncRead, AsyncWrite};

use super::{ServerAdmin, non_empty, unsupported};
use crate::entity::VirtualServer;
use crate::error::AdminResult;

impl<S> ServerAdmin<'_, S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// All virtual servers on the instance.
    pub async fn server_list(&self) -> AdminResult<Vec<VirtualServer>> {
        let command = Command::builder("serverlist")
            .requires(SessionState::Authenticated)
            .build()?;
        self.query(command).await
    }

    /// Ids of all virtual servers, in listing order.
    pub async fn virtual_server_ids(&self) -> AdminResult<Vec<u64>> {
        Ok(self
            .server_list()
            .await?
            .into_iter()
            .map(|server| server.id)
            .collect())
    }

    /// Select the virtual server later commands apply to.
    pub async fn select_server(&self, id: u64) -> AdminResult<Status> {
        self.session.select_context(id).await
    }

    /// Send a message to every virtual server.
    pub async fn broadcast(&self, message: &str) -> AdminResult<Status> {
        non_empty(message, "broadcast message")?;
        let command = Command::builder("gm")
            .param("msg", message)
            .requires(SessionState::Authenticated)
            .build()?;
        self.action(command).await
    }

    /// Not available on this client.
    pub async fn server_stop(&self) -> AdminResult<Status> {
        unsupported("server_stop")
    }

    /// Not available on this client.
    pub async fn snapshot_create(&self) -> AdminResult<Status> {
        unsupported("snapshot_create")
    }

    /// Not available on this client.
    pub async fn snapshot_deploy(&self, _snapshot: &str) -> AdminResult<Status> {
        unsupported("snapshot_deploy")
    }
}
