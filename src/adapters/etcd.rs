// SPDX-License-Identifier: MIT OR Apache-2.0

//! etcd configuration source.
//!
//! The value of one etcd key is one configuration document. Watching the key
//! for change is the job of
//! [`EtcdWatchFeed`](crate::adapters::watchers::EtcdWatchFeed), not of this
//! source.

use crate::domain::{detect_format_from_path, normalize_format, ConfigError, Result};
use crate::ports::{ConfigSource, Payload};
use crate::runtime;
use etcd_client::Client;
use std::fmt;
use std::time::Duration;

/// Default timeout for one `GET`.
pub const DEFAULT_ETCD_READ_TIMEOUT: Duration = Duration::from_secs(3);

/// Reads a single etcd key per load.
///
/// # Examples
///
/// ```rust,no_run
/// use cfgweave::adapters::{EtcdSource, FileSource};
/// use cfgweave::service::Aggregator;
///
/// let etcd = EtcdSource::connect(&["127.0.0.1:2379"], "/configs/app.yaml")?
///     .with_name("etcd-app-config");
///
/// // etcd overrides the local file
/// let aggregator = Aggregator::builder()
///     .with_source(FileSource::new("config/local.yaml"))
///     .with_source(etcd)
///     .build()?;
/// # Ok::<(), cfgweave::domain::ConfigError>(())
/// ```
#[derive(Clone)]
pub struct EtcdSource {
    client: Client,
    key: String,
    format: Option<String>,
    name: String,
    read_timeout: Duration,
}

impl EtcdSource {
    /// Wraps an existing client. The display name defaults to the key.
    ///
    /// The client should have been connected on a runtime that outlives the
    /// source; [`connect`](Self::connect) uses the crate's shared runtime.
    pub fn new(client: Client, key: impl Into<String>) -> Self {
        let key = key.into().trim().to_string();
        Self {
            client,
            name: key.clone(),
            key,
            format: None,
            read_timeout: DEFAULT_ETCD_READ_TIMEOUT,
        }
    }

    /// Connects to `endpoints` and creates a source for `key`.
    pub fn connect<S: AsRef<str>>(endpoints: &[S], key: impl Into<String>) -> Result<Self> {
        let client = connect_client(endpoints)?;
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

    /// Returns the watched key.
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
        let mut client = self.client.clone();
        let response = tokio::time::timeout(self.read_timeout, client.get(self.key.as_str(), None))
            .await
            .map_err(|_| self.error(format!("get key {:?} timed out after {:?}", self.key, self.read_timeout)))?
            .map_err(|e| ConfigError::source_error(self.name.as_str(), format!("get key {:?} failed", self.key), e))?;

        response
            .kvs()
            .last()
            .map(|kv| kv.value().to_vec())
            .ok_or_else(|| self.error(format!("key {:?} not found", self.key)))
    }
}

/// Connects an etcd client on the shared runtime.
pub(crate) fn connect_client<S: AsRef<str>>(endpoints: &[S]) -> Result<Client> {
    let endpoints: Vec<String> = endpoints.iter().map(|s| s.as_ref().to_string()).collect();
    runtime::block_on(async move { Client::connect(endpoints, None).await })?
        .map_err(|e| ConfigError::source_error("etcd", "failed to connect to etcd", e))
}

impl fmt::Debug for EtcdSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EtcdSource")
            .field("key", &self.key)
            .field("format", &self.format)
            .field("name", &self.name)
            .field("read_timeout", &self.read_timeout)
            .finish_non_exhaustive()
    }
}

impl ConfigSource for EtcdSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&self) -> Result<Payload> {
        if self.key.is_empty() {
            return Err(self.error("key is empty"));
        }

        let bytes = runtime::block_on(self.fetch())??;
        let format = match &self.format {
            Some(format) => format.clone(),
            None => detect_format_from_path(&self.key)?,
        };
        tracing::debug!("read {} bytes from etcd key {}", bytes.len(), self.key);
        Ok(Payload::new(bytes, format, self.name.as_str()))
    }
}
