// SPDX-License-Identifier: MIT OR Apache-2.0

//! Change coordinator trait definition.
//!
//! A coordinator watches one upstream source for change and reports it through
//! a callback. It never holds a reference to the aggregator: what to reload,
//! and when, is up to whoever receives the [`ChangeNotice`].

use crate::domain::{ConfigKey, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Describes one observed upstream change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChangeNotice {
    /// Name of the coordinator that observed the change
    pub origin: String,
    /// Keys, namespaces or paths reported as changed, when the upstream says
    pub keys: Vec<ConfigKey>,
}

impl ChangeNotice {
    /// Creates a notice with no key detail.
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            keys: Vec::new(),
        }
    }

    /// Attaches the changed keys.
    pub fn with_keys<I, K>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<ConfigKey>,
    {
        self.keys = keys.into_iter().map(Into::into).collect();
        self
    }
}

/// Callback invoked once per observed change batch.
///
/// It is called from the coordinator's task and is expected to return quickly;
/// hand heavy work, such as a reload, to another task.
pub type ChangeCallback = Arc<dyn Fn(ChangeNotice) + Send + Sync>;

/// A long-running watcher for one upstream source.
///
/// `start` runs until `cancel` fires, in which case it returns `Ok(())`, or
/// until a fatal condition, which it returns as an error. Transient failures
/// are handled inside the loop and never surface.
#[async_trait]
pub trait ChangeCoordinator: Send + Sync {
    /// Returns the name used as [`ChangeNotice::origin`].
    fn name(&self) -> &str;

    /// Watches until cancelled or until a fatal error.
    async fn start(&self, cancel: CancellationToken, on_change: ChangeCallback) -> Result<()>;
}

/// Forwards every notice into an unbounded channel.
///
/// This keeps the reload policy with the receiver: it can debounce, coalesce or
/// reorder notices before calling `load` again.
///
/// # Examples
///
/// ```
/// use cfgweave::ports::{channel_callback, ChangeNotice};
///
/// let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
/// let callback = channel_callback(tx);
/// callback(ChangeNotice::new("etcd[/app]"));
/// assert_eq!(rx.try_recv().unwrap().origin, "etcd[/app]");
/// ```
pub fn channel_callback(sender: UnboundedSender<ChangeNotice>) -> ChangeCallback {
    Arc::new(move |notice: ChangeNotice| {
        if sender.send(notice).is_err() {
            tracing::debug!("change receiver dropped; notice discarded");
        }
    })
}

/// Runs a coordinator on the current Tokio runtime.
pub fn spawn_coordinator(
    coordinator: Arc<dyn ChangeCoordinator>,
    cancel: CancellationToken,
    on_change: ChangeCallback,
) -> JoinHandle<Result<()>> {
    tokio::spawn(async move {
        tracing::info!("starting change coordinator '{}'", coordinator.name());
        let result = coordinator.start(cancel, on_change).await;
        match &result {
            Ok(()) => tracing::info!("change coordinator '{}' stopped", coordinator.name()),
            Err(e) => tracing::error!("change coordinator '{}' failed: {}", coordinator.name(), e),
        }
        result
    })
}
