//! Ban rules and direct bans.

use std::time::Duration;

use squery_proto::{Command, Status};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, instrument};

use super::{ServerAdmin, non_empty};
use crate::entity::BanRule;
use crate::error::{AdminError, AdminResult};

/// Rule lifetime when none is given.
const DEFAULT_RULE_DURATION: Duration = Duration::from_secs(600);

/// A ban rule to add.
///
/// A rule matches on exactly one target. When several are set the name
/// pattern wins over the ip pattern, which wins over the unique id; the
/// others are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BanRequest {
    /// Nickname pattern.
    pub name: Option<String>,
    /// Address pattern.
    pub ip: Option<String>,
    /// Client unique identity.
    pub uid: Option<String>,
    /// Shown to banned clients. Omitted from the command when unset.
    pub reason: Option<String>,
    /// Defaults to ten minutes. Zero means permanent.
    pub duration: Option<Duration>,
}

impl BanRequest {
    /// Ban nicknames matching a pattern.
    pub fn name(pattern: impl Into<String>) -> Self {
        Self {
            name: Some(pattern.into()),
            ..Self::default()
        }
    }

    /// Ban addresses matching a pattern.
    pub fn ip(pattern: impl Into<String>) -> Self {
        Self {
            ip: Some(pattern.into()),
            ..Self::default()
        }
    }

    /// Ban one client unique id.
    pub fn uid(uid: impl Into<String>) -> Self {
        Self {
            uid: Some(uid.into()),
            ..Self::default()
        }
    }

    /// Set the reason shown to banned clients.
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Set the rule lifetime, rounded down to whole seconds.
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    /// The parameter this rule matches on, after precedence.
    pub fn target(&self) -> Option<(&'static str, &str)> {
        let candidates = [
            ("name", self.name.as_deref()),
            ("ip", self.ip.as_deref()),
            ("uid", self.uid.as_deref()),
        ];
        candidates
            .into_iter()
            .find_map(|(key, value)| value.filter(|v| !v.is_empty()).map(|v| (key, v)))
    }

    fn ignored_targets(&self, chosen: &str) -> Vec<&'static str> {
        [
            ("name", &self.name),
            ("ip", &self.ip),
            ("uid", &self.uid),
        ]
        .into_iter()
        .filter(|(key, value)| *key != chosen && value.as_deref().is_some_and(|v| !v.is_empty()))
        .map(|(key, _)| key)
        .collect()
    }
}

impl<S> ServerAdmin<'_, S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Ban rules of the selected virtual server.
    pub async fn ban_list(&self) -> AdminResult<Vec<BanRule>> {
        let command = Command::builder("banlist").build()?;
        self.query(command).await
    }

    /// Add a ban rule.
    #[instrument(skip(self), level = "debug")]
    pub async fn ban_add(&self, request: BanRequest) -> AdminResult<Status> {
        let Some((key, pattern)) = request.target() else {
            return Err(AdminError::Validation(
                "ban rule needs a name pattern, an ip pattern or a unique id".to_string(),
            ));
        };

        let ignored = request.ignored_targets(key);
        if !ignored.is_empty() {
            debug!(used = key, ?ignored, "ban rule has several targets, using one");
        }

        let duration = request.duration.unwrap_or(DEFAULT_RULE_DURATION);
        let command = Command::builder("banadd")
            .param(key, pattern)
            .param("time", duration.as_secs())
            .param_opt("banreason", request.reason.as_deref())
            .build()?;
        self.action(command).await
    }

    /// Ban a connected client (and its address) directly.
    pub async fn ban_client(
        &self,
        client_id: u64,
        duration: Duration,
        reason: Option<&str>,
    ) -> AdminResult<Status> {
        if let Some(reason) = reason {
            non_empty(reason, "ban reason")?;
        }

        let command = Command::builder("banclient")
            .param("clid", client_id)
            .param("time", duration.as_secs())
            .param_opt("banreason", reason)
            .build()?;
        self.action(command).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precedence_name_over_ip_over_uid() {
        let all = BanRequest {
            name: Some("troll*".into()),
            ip: Some("10.0.0.*".into()),
            uid: Some("abc=".into()),
            ..BanRequest::default()
        };
        assert_eq!(all.target(), Some(("name", "troll*")));
        assert_eq!(all.ignored_targets("name"), vec!["ip", "uid"]);

        let ip_and_uid = BanRequest {
            name: None,
            ..all.clone()
        };
        assert_eq!(ip_and_uid.target(), Some(("ip", "10.0.0.*")));

        assert_eq!(BanRequest::uid("abc=").target(), Some(("uid", "abc=")));
    }

    #[test]
    fn test_empty_targets_do_not_count() {
        let request = BanRequest {
            name: Some(String::new()),
            ..BanRequest::ip("1.2.3.4")
        };
        assert_eq!(request.target(), Some(("ip", "1.2.3.4")));
        assert_eq!(BanRequest::default().target(), None);
    }
}
