// SPDX-License-Identifier: MIT OR Apache-2.0

//! Long-poll coordinator.
//!
//! Notification-id protocols such as Apollo's `notifications/v2` hold a
//! request open until one of the watched namespaces moves past the id the
//! client sent. The coordinator keeps those ids and re-issues the poll; the
//! wire details live behind [`NotificationTransport`].

use crate::domain::Result;
use crate::ports::{ChangeCallback, ChangeCoordinator, ChangeNotice};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Id meaning "no known baseline"; the server answers with the current id.
pub const INITIAL_NOTIFICATION_ID: i64 = -1;

/// Default pause after a failed poll.
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_secs(3);

/// A namespace and its notification id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Namespace name
    #[serde(rename = "namespaceName")]
    pub namespace: String,
    /// Last seen, or newly reported, notification id
    #[serde(rename = "notificationId")]
    pub id: i64,
}

impl Notification {
    /// Creates a notification entry.
    pub fn new(namespace: impl Into<String>, id: i64) -> Self {
        Self {
            namespace: namespace.into(),
            id,
        }
    }
}

/// Result of one long poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// Nothing changed before the server gave up waiting.
    NotModified,
    /// These namespaces moved to the given ids.
    Changed(Vec<Notification>),
}

/// One long-poll round trip.
#[async_trait]
pub trait NotificationTransport: Send + Sync {
    /// Returns a display name used as the notice origin.
    fn name(&self) -> &str;

    /// Returns the namespaces to watch.
    fn namespaces(&self) -> Vec<String>;

    /// Sends the current ids and waits for the answer.
    ///
    /// Any error is treated as transient by the coordinator.
    async fn poll(&self, current: &[Notification]) -> Result<PollOutcome>;
}

/// Drives a [`NotificationTransport`] until cancelled.
///
/// Every namespace starts at [`INITIAL_NOTIFICATION_ID`]. A `Changed` answer
/// advances the reported ids and raises one notice for the whole batch, even
/// on the first poll. Transport errors are logged and followed by a fixed
/// backoff; this coordinator only returns on cancellation.
///
/// # Examples
///
/// ```rust,no_run
/// # #[cfg(feature = "apollo")]
/// # async fn run() -> cfgweave::domain::Result<()> {
/// use cfgweave::adapters::ApolloNotificationClient;
/// use cfgweave::adapters::watchers::LongPollCoordinator;
/// use cfgweave::ports::ChangeCoordinator;
/// use std::sync::Arc;
/// use tokio_util::sync::CancellationToken;
///
/// let transport = ApolloNotificationClient::new(
///     "http://apollo:8080",
///     "my-app",
///     "default",
///     ["application", "db.yaml"],
/// );
/// let coordinator = LongPollCoordinator::new(transport);
/// coordinator
///     .start(CancellationToken::new(), Arc::new(|notice| println!("{:?}", notice.keys)))
///     .await
/// # }
/// ```
#[derive(Debug)]
pub struct LongPollCoordinator<T> {
    transport: T,
    backoff: Duration,
}

impl<T: NotificationTransport> LongPollCoordinator<T> {
    /// Creates a coordinator with the default backoff.
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            backoff: DEFAULT_RETRY_BACKOFF,
        }
    }

    /// Sets the pause after a failed poll.
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Returns the transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }
}

#[async_trait]
impl<T: NotificationTransport> ChangeCoordinator for LongPollCoordinator<T> {
    fn name(&self) -> &str {
        self.transport.name()
    }

    async fn start(&self, cancel: CancellationToken, on_change: ChangeCallback) -> Result<()> {
        let name = self.transport.name();
        let mut ids: BTreeMap<String, i64> = self
            .transport
            .namespaces()
            .into_iter()
            .map(|ns| (ns, INITIAL_NOTIFICATION_ID))
            .collect();

        loop {
            let current: Vec<Notification> = ids
                .iter()
                .map(|(ns, id)| Notification::new(ns.as_str(), *id))
                .collect();

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(()),
                outcome = self.transport.poll(&current) => outcome,
            };

            match outcome {
                Ok(PollOutcome::NotModified) => {
                    tracing::debug!("{}: not modified", name);
                }
                Ok(PollOutcome::Changed(changes)) if changes.is_empty() => {
                    tracing::debug!("{}: empty change list", name);
                }
                Ok(PollOutcome::Changed(changes)) => {
                    for change in &changes {
                        ids.insert(change.namespace.clone(), change.id);
                    }
                    tracing::debug!("{}: {} namespace(s) changed", name, changes.len());
                    on_change(
                        ChangeNotice::new(name).with_keys(changes.into_iter().map(|c| c.namespace)),
                    );
                }
                Err(e) => {
                    tracing::warn!("{}: poll failed, retrying in {:?}: {}", name, self.backoff, e);
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Ok(()),
                        _ = tokio::time::sleep(self.backoff) => {}
                    }
                }
            }
        }
    }
}
