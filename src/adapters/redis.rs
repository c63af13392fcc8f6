// SPDX-License-Identifier: MIT OR Apache-2.0

//! Redis configuration source.

use crate::domain::{detect_format_from_path, normalize_format, ConfigError, Result};
use crate::ports::{ConfigSource, Payload};
use crate::runtime;
use redis::{AsyncCommands, Client};
use std::time::Duration;

/// Default timeout for one `GET`, connection included.
pub const DEFAULT_REDIS_READ_TIMEOUT: Duration = Duration::from_secs(3);

/// Reads one Redis string key per load.
///
/// The key holds a whole configuration document. Without an explicit format
/// it is detected from the key suffix, so `config:app.json` decodes as JSON.
///
/// # Examples
///
/// ```rust,no_run
/// use cfgweave::adapters::RedisSource;
/// use cfgweave::ports::ConfigSource;
///
/// let source = RedisSource::open("redis://127.0.0.1:6379", "config:app")?
///     .with_format("yaml");
/// let payload = source.load()?;
/// # Ok::<(), cfgweave::domain::ConfigError>(())
/// ```
#[derive(Debug, Clone)]
pub struct RedisSource {
    client: Client,
    key: String,
    format: Option<String>,
    name: String,
    read_timeout: Duration,
}

impl RedisSource {
    /// Wraps an existing client. The display name is `redis[<key>]`.
    pub fn new(client: Client, key: impl Into<String>) -> Self {
        let key = key.into().trim().to_string();
        Self {
            client,
            name: format!("redis[{}]", key),
            key,
            format: None,
            read_timeout: DEFAULT_REDIS_READ_TIMEOUT,
        }
    }

    /// Opens a client for `url` and creates a source for `key`.
    ///
    /// No connection is made until the first load.
    pub fn open(url: &str, key: impl Into<String>) -> Result<Self> {
        let client = Client::open(url)
            .map_err(|e| ConfigError::source_error("redis", "invalid redis url", e))?;
        Ok(Self::new(client, key))
    }

    /// Sets the format explicitly instead of detecting it from the key suffix.
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        let format = format.into();
        if !format.trim().is_empty() {
            self.format = Some(normalize_format(&format));
        }
        self
    }

    /// Overrides the display name. Blank names are ignored.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !name.trim().is_empty() {
            self.name = name;
        }
        self
    }

    /// Sets the read timeout. A zero timeout is ignored.
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        if !timeout.is_zero() {
            self.read_timeout = timeout;
        }
        self
    }

    /// Returns the key this source reads.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns a handle to the underlying client.
    pub fn client(&self) -> Client {
        self.client.clone()
    }

    fn error(&self, message: impl Into<String>) -> ConfigError {
        ConfigError::SourceError {
            source_name: self.name.clone(),
            message: message.into(),
            source: None,
        }
    }

    async fn fetch(&self) -> Result<Vec<u8>> {
        let read = async {
            let mut conn = self
                .client
                .get_multiplexed_async_connection()
                .await
                .map_err(|e| ConfigError::source_error(self.name.as_str(), "failed to connect to redis", e))?;
            conn.get::<_, Option<Vec<u8>>>(self.key.as_str())
                .await
                .map_err(|e| ConfigError::source_error(self.name.as_str(), format!("get key {:?} failed", self.key), e))
        };

        tokio::time::timeout(self.read_timeout, read)
            .await
            .map_err(|_| self.error(format!("get key {:?} timed out after {:?}", self.key, self.read_timeout)))??
            .ok_or_else(|| self.error(format!("key {:?} not found", self.key)))
    }
}

impl ConfigSource for RedisSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&self) -> Result<Payload> {
        if self.key.is_empty() {
            return Err(self.error("key is empty"));
        }
        let format = match &self.format {
            Some(format) => format.clone(),
            None => detect_format_from_path(&self.key)?,
        };

        let bytes = runtime::block_on(self.fetch())??;
        tracing::debug!("read {} bytes from redis key {}", bytes.len(), self.key);
        Ok(Payload::new(bytes, format, self.name.as_str()))
    }
}
