// SPDX-License-Identifier: MIT OR Apache-2.0

//! Redis keyspace-notification feed.
//!
//! Redis publishes `__keyspace@<db>__:<key>` messages when keyspace
//! notifications are enabled on the server:
//!
//! ```text
//! CONFIG SET notify-keyspace-events KEA
//! ```
//!
//! Each message becomes a one-key batch for
//! [`StreamWatchCoordinator`](super::StreamWatchCoordinator).

use super::stream_watch::{WatchFeed, WatchStream};
use crate::adapters::redis::RedisSource;
use crate::domain::{ConfigError, ConfigKey, Result};
use async_trait::async_trait;
use futures_util::stream::{BoxStream, StreamExt};
use redis::{AsyncCommands, Client, Msg};
use std::fmt;

/// A [`WatchFeed`] over a Redis key or key pattern.
#[derive(Clone)]
pub struct RedisWatchFeed {
    client: Client,
    pattern: String,
    name: String,
    enable_notifications: bool,
}

impl RedisWatchFeed {
    /// Creates a feed for `pattern`, a key or a glob such as `config:*`.
    pub fn new(client: Client, pattern: impl Into<String>) -> Self {
        let pattern = pattern.into().trim().to_string();
        Self {
            client,
            name: format!("redis[{}]", pattern),
            pattern,
            enable_notifications: false,
        }
    }

    /// Opens a client for `url`.
    pub fn open(url: &str, pattern: impl Into<String>) -> Result<Self> {
        let client =
            Client::open(url).map_err(|e| ConfigError::watcher_error("invalid redis url", e))?;
        Ok(Self::new(client, pattern))
    }

    /// Watches the key a [`RedisSource`] reads.
    pub fn for_source(source: &RedisSource) -> Self {
        Self::new(source.client(), source.key())
    }

    /// Tries `CONFIG SET notify-keyspace-events KEA` before subscribing.
    /// Failure is logged, since managed servers often forbid `CONFIG`.
    pub fn enable_notifications(mut self, enable: bool) -> Self {
        self.enable_notifications = enable;
        self
    }

    /// Returns the keyspace channel pattern subscribed to.
    pub fn channel_pattern(&self) -> String {
        format!("{}{}", self.channel_prefix(), self.pattern)
    }

    fn channel_prefix(&self) -> String {
        format!("__keyspace@{}__:", self.client.get_connection_info().redis.db)
    }

    async fn try_enable_notifications(&self) {
        let result = async {
            let mut conn = self.client.get_multiplexed_async_connection().await?;
            redis::cmd("CONFIG")
                .arg("SET")
                .arg("notify-keyspace-events")
                .arg("KEA")
                .query_async::<_, ()>(&mut conn)
                .await
        }
        .await;

        match result {
            Ok(()) => tracing::info!("enabled redis keyspace notifications"),
            Err(e) => tracing::warn!(
                "could not enable keyspace notifications, enable manually with CONFIG SET notify-keyspace-events KEA: {}",
                e
            ),
        }
    }
}

impl fmt::Debug for RedisWatchFeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisWatchFeed")
            .field("pattern", &self.pattern)
            .field("enable_notifications", &self.enable_notifications)
            .finish_non_exhaustive()
    }
}

/// An open keyspace subscription.
pub struct RedisWatchStream {
    messages: BoxStream<'static, Msg>,
    prefix: String,
}

#[async_trait]
impl WatchStream for RedisWatchStream {
    async fn next_batch(&mut self) -> Result<Option<Vec<ConfigKey>>> {
        let Some(message) = self.messages.next().await else {
            return Ok(None);
        };
        let channel = message.get_channel_name();
        let key = channel.strip_prefix(self.prefix.as_str()).unwrap_or(channel);
        Ok(Some(vec![ConfigKey::from(key)]))
    }
}

#[async_trait]
impl WatchFeed for RedisWatchFeed {
    type Stream = RedisWatchStream;

    fn name(&self) -> &str {
        &self.name
    }

    async fn probe(&self) -> Result<()> {
        if self.pattern.is_empty() {
            return Err(ConfigError::WatcherError {
                message: "redis watch pattern is empty".to_string(),
                source: None,
            });
        }
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| ConfigError::watcher_error("failed to connect to redis", e))?;
        if !self.pattern.contains('*') {
            conn.get::<_, Option<Vec<u8>>>(self.pattern.as_str())
                .await
                .map_err(|e| ConfigError::watcher_error(format!("initial get of key {:?} failed", self.pattern), e))?;
        }
        Ok(())
    }

    async fn subscribe(&self) -> Result<RedisWatchStream> {
        if self.enable_notifications {
            self.try_enable_notifications().await;
        }

        let mut pubsub = self
            .client
            .get_async_connection()
            .await
            .map_err(|e| ConfigError::watcher_error("failed to connect to redis", e))?
            .into_pubsub();
        let pattern = self.channel_pattern();
        pubsub
            .psubscribe(pattern.as_str())
            .await
            .map_err(|e| ConfigError::watcher_error(format!("failed to subscribe to {}", pattern), e))?;
        tracing::debug!("subscribed to {}", pattern);

        Ok(RedisWatchStream {
            messages: pubsub.into_on_message().boxed(),
            prefix: self.channel_prefix(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_pattern_uses_database() {
        let feed = RedisWatchFeed::open("redis://127.0.0.1:6379/2", "config:app.json").unwrap();
        assert_eq!(feed.channel_pattern(), "__keyspace@2__:config:app.json");
        assert_eq!(feed.name, "redis[config:app.json]");
    }

    #[tokio::test]
    async fn test_empty_pattern_fails_probe() {
        let feed = RedisWatchFeed::open("redis://127.0.0.1:6379", " ").unwrap();
        assert!(feed.probe().await.is_err());
    }
}
