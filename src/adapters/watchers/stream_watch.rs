// SPDX-License-Identifier: MIT OR Apache-2.0

//! Stream-watch coordinator.
//!
//! Some stores push changes over a subscription: an etcd watch, Redis
//! keyspace notifications. [`StreamWatchCoordinator`] drives any such
//! subscription through the [`WatchFeed`] and [`WatchStream`] seams and turns
//! each non-empty event batch into exactly one [`ChangeNotice`].

use crate::domain::{ConfigError, ConfigKey, Result};
use crate::ports::{ChangeCallback, ChangeCoordinator, ChangeNotice};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// An open subscription delivering batches of changed keys.
#[async_trait]
pub trait WatchStream: Send {
    /// Waits for the next batch.
    ///
    /// Returns `Ok(None)` when the server closed the stream. A batch may be
    /// empty, for example a progress notification.
    async fn next_batch(&mut self) -> Result<Option<Vec<ConfigKey>>>;
}

/// Something that can be probed and subscribed to.
#[async_trait]
pub trait WatchFeed: Send + Sync {
    /// The subscription type.
    type Stream: WatchStream;

    /// Returns a display name such as `etcd[/configs/app.yaml]`.
    fn name(&self) -> &str;

    /// Checks once that the watched key is readable.
    async fn probe(&self) -> Result<()>;

    /// Opens the subscription.
    async fn subscribe(&self) -> Result<Self::Stream>;
}

/// Watches a push feed until cancellation or a fatal stream condition.
///
/// A failed probe, a failed subscribe, a closed stream and a stream error all
/// end the watch with an error; retrying is up to the caller.
///
/// # Examples
///
/// ```rust,no_run
/// # #[cfg(feature = "etcd")]
/// # async fn run() -> cfgweave::domain::Result<()> {
/// use cfgweave::adapters::watchers::{EtcdWatchFeed, StreamWatchCoordinator};
/// use cfgweave::ports::{channel_callback, ChangeCoordinator};
/// use tokio_util::sync::CancellationToken;
///
/// let feed = EtcdWatchFeed::connect(&["127.0.0.1:2379"], "/configs/app.yaml").await?;
/// let coordinator = StreamWatchCoordinator::new(feed);
///
/// let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
/// let cancel = CancellationToken::new();
/// tokio::spawn(async move { coordinator.start(cancel, channel_callback(tx)).await });
///
/// while let Some(notice) = rx.recv().await {
///     println!("{} changed", notice.origin);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct StreamWatchCoordinator<F> {
    feed: F,
}

impl<F: WatchFeed> StreamWatchCoordinator<F> {
    /// Creates a coordinator over `feed`.
    pub fn new(feed: F) -> Self {
        Self { feed }
    }

    /// Returns the feed.
    pub fn feed(&self) -> &F {
        &self.feed
    }
}

#[async_trait]
impl<F: WatchFeed> ChangeCoordinator for StreamWatchCoordinator<F> {
    fn name(&self) -> &str {
        self.feed.name()
    }

    async fn start(&self, cancel: CancellationToken, on_change: ChangeCallback) -> Result<()> {
        let name = self.feed.name();

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(()),
            probed = self.feed.probe() => probed?,
        }

        let mut stream = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(()),
            stream = self.feed.subscribe() => stream?,
        };
        tracing::info!("watching {}", name);

        loop {
            let batch = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(()),
                batch = stream.next_batch() => batch,
            };

            match batch {
                Ok(Some(keys)) if keys.is_empty() => continue,
                Ok(Some(keys)) => {
                    tracing::debug!("{}: {} change(s)", name, keys.len());
                    on_change(ChangeNotice::new(name).with_keys(keys));
                }
                Ok(None) => {
                    tracing::error!("{}: watch stream closed", name);
                    return Err(ConfigError::WatcherError {
                        message: format!("{}: watch stream closed", name),
                        source: None,
                    });
                }
                Err(e) => {
                    tracing::error!("{}: watch stream failed: {}", name, e);
                    return Err(e);
                }
            }
        }
    }
}
