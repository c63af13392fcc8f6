// SPDX-License-Identifier: MIT OR Apache-2.0

//! etcd watch feed.
//!
//! Watches one etcd key. Every watch response that carries events becomes one
//! batch for [`StreamWatchCoordinator`](super::StreamWatchCoordinator).

use super::stream_watch::{WatchFeed, WatchStream};
use crate::adapters::etcd::EtcdSource;
use crate::domain::{ConfigError, ConfigKey, Result};
use async_trait::async_trait;
use etcd_client::{Client, Watcher};
use std::fmt;
use std::time::Duration;

/// Default timeout for the initial readability check.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// A [`WatchFeed`] over one etcd key.
#[derive(Clone)]
pub struct EtcdWatchFeed {
    client: Client,
    key: String,
    name: String,
    probe_timeout: Duration,
}

impl EtcdWatchFeed {
    /// Creates a feed from a connected client.
    pub fn new(client: Client, key: impl Into<String>) -> Self {
        let key = key.into().trim().to_string();
        Self {
            client,
            name: format!("etcd[{}]", key),
            key,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    /// Connects to `endpoints` and creates a feed for `key`.
    pub async fn connect<S: AsRef<str>>(endpoints: &[S], key: impl Into<String>) -> Result<Self> {
        let endpoints: Vec<String> = endpoints.iter().map(|s| s.as_ref().to_string()).collect();
        let client = Client::connect(endpoints, None)
            .await
            .map_err(|e| ConfigError::watcher_error("failed to connect to etcd", e))?;
        Ok(Self::new(client, key))
    }

    /// Watches the key an [`EtcdSource`] reads, sharing its client.
    pub fn for_source(source: &EtcdSource) -> Self {
        Self::new(source.client(), source.key())
    }

    /// Sets the probe timeout. A zero timeout is ignored.
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        if !timeout.is_zero() {
            self.probe_timeout = timeout;
        }
        self
    }

    /// Returns the watched key.
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl fmt::Debug for EtcdWatchFeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EtcdWatchFeed")
            .field("key", &self.key)
            .field("probe_timeout", &self.probe_timeout)
            .finish_non_exhaustive()
    }
}

/// An open etcd watch.
pub struct EtcdWatchStream {
    // dropping the watcher ends the watch
    _watcher: Watcher,
    stream: etcd_client::WatchStream,
}

#[async_trait]
impl WatchStream for EtcdWatchStream {
    async fn next_batch(&mut self) -> Result<Option<Vec<ConfigKey>>> {
        let response = self
            .stream
            .message()
            .await
            .map_err(|e| ConfigError::watcher_error("etcd watch error", e))?;

        let Some(response) = response else {
            return Ok(None);
        };
        if response.canceled() {
            return Err(ConfigError::WatcherError {
                message: format!("etcd watch canceled: {}", response.cancel_reason()),
                source: None,
            });
        }

        let keys = response
            .events()
            .iter()
            .filter_map(|event| event.kv())
            .filter_map(|kv| kv.key_str().ok())
            .map(ConfigKey::from)
            .collect();
        Ok(Some(keys))
    }
}

#[async_trait]
impl WatchFeed for EtcdWatchFeed {
    type Stream = EtcdWatchStream;

    fn name(&self) -> &str {
        &self.name
    }

    async fn probe(&self) -> Result<()> {
        if self.key.is_empty() {
            return Err(ConfigError::WatcherError {
                message: "etcd watch key is empty".to_string(),
                source: None,
            });
        }

        let mut client = self.client.clone();
        tokio::time::timeout(self.probe_timeout, client.get(self.key.as_str(), None))
            .await
            .map_err(|_| ConfigError::WatcherError {
                message: format!("initial get of key {:?} timed out", self.key),
                source: None,
            })?
            .map_err(|e| ConfigError::watcher_error(format!("initial get of key {:?} failed", self.key), e))?;
        Ok(())
    }

    async fn subscribe(&self) -> Result<EtcdWatchStream> {
        let mut client = self.client.clone();
        let (watcher, stream) = client
            .watch(self.key.as_str(), None)
            .await
            .map_err(|e| ConfigError::watcher_error(format!("failed to watch key {:?}", self.key), e))?;
        Ok(EtcdWatchStream {
            _watcher: watcher,
            stream,
        })
    }
}
