// SPDX-License-Identifier: MIT OR Apache-2.0

//! Apollo configuration-center sources and notification transport.
//!
//! Apollo serves each namespace from `GET {base}/configs/{app}/{cluster}/{ns}`
//! as a JSON envelope whose `configurations` map holds either flat properties
//! (for properties namespaces) or a single `content` entry with the raw
//! document (for `json`, `yaml` and `toml` namespaces such as `db.yaml`).
//!
//! Change detection uses the `notifications/v2` long-poll endpoint through
//! [`ApolloNotificationClient`], driven by
//! [`LongPollCoordinator`](crate::adapters::watchers::LongPollCoordinator).

use crate::adapters::decoders::{builtin_decoder, nest_properties, JsonDecoder};
use crate::adapters::watchers::long_poll::{Notification, NotificationTransport, PollOutcome};
use crate::domain::{detect_format_from_path, normalize_format, ConfigError, Result, Tree, Value};
use crate::ports::{ConfigSource, Decoder, Payload};
use crate::runtime;
use async_trait::async_trait;
use once_cell::sync::OnceCell;
use reqwest::StatusCode;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

/// Default timeout for a config fetch.
pub const DEFAULT_APOLLO_TIMEOUT: Duration = Duration::from_secs(5);

/// Default timeout for a notification long poll. Apollo holds the request for
/// up to 60 seconds.
pub const DEFAULT_NOTIFICATION_TIMEOUT: Duration = Duration::from_secs(70);

/// Apollo server address plus application coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApolloEndpoint {
    base_url: String,
    app_id: String,
    cluster: String,
}

impl ApolloEndpoint {
    /// Creates an endpoint. Trailing slashes on `base_url` are dropped.
    pub fn new(base_url: &str, app_id: &str, cluster: &str) -> Self {
        Self {
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            app_id: app_id.trim().to_string(),
            cluster: cluster.trim().to_string(),
        }
    }

    /// Returns the application id.
    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    /// Returns the cluster.
    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    fn is_complete(&self) -> bool {
        !self.base_url.is_empty() && !self.app_id.is_empty() && !self.cluster.is_empty()
    }

    fn config_url(&self, namespace: &str) -> String {
        format!(
            "{}/configs/{}/{}/{}",
            self.base_url, self.app_id, self.cluster, namespace
        )
    }

    fn notifications_url(&self) -> String {
        format!("{}/notifications/v2", self.base_url)
    }
}

/// One Apollo namespace and the format of its content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApolloNamespace {
    name: String,
    format: String,
}

impl ApolloNamespace {
    /// Creates a namespace whose format follows its suffix: `db.yaml` is
    /// YAML, `application` is properties.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into().trim().to_string();
        let format = detect_format_from_path(&name).unwrap_or_else(|_| "properties".to_string());
        Self { name, format }
    }

    /// Creates a namespace with an explicit format.
    pub fn with_format(name: impl Into<String>, format: &str) -> Self {
        Self {
            name: name.into().trim().to_string(),
            format: normalize_format(format),
        }
    }

    /// Returns the namespace name as Apollo knows it.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the content format.
    pub fn format(&self) -> &str {
        &self.format
    }

    /// Returns the name without a known format extension; `db.yaml` gives
    /// `db`.
    pub fn key(&self) -> &str {
        match self.name.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() && detect_format_from_path(&self.name).is_ok() => stem,
            _ => &self.name,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ConfigEnvelope {
    #[serde(default)]
    configurations: BTreeMap<String, String>,
}

fn build_client(timeout: Duration, source_name: &str) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ConfigError::source_error(source_name, "failed to build HTTP client", e))
}

/// Fetches one namespace and returns its document bytes and format.
///
/// Properties namespaces are nested on `.` and re-encoded as JSON.
async fn fetch_namespace(
    client: &reqwest::Client,
    endpoint: &ApolloEndpoint,
    namespace: &ApolloNamespace,
    source_name: &str,
) -> Result<(Vec<u8>, String)> {
    let url = endpoint.config_url(namespace.name());
    let response = client
        .get(&url)
        .header(reqwest::header::ACCEPT, "*/*")
        .send()
        .await
        .map_err(|e| ConfigError::source_error(source_name, format!("request to {} failed", url), e))?;

    let status = response.status();
    if status != StatusCode::OK {
        return Err(ConfigError::SourceError {
            source_name: source_name.to_string(),
            message: format!(
                "unexpected status code {} for namespace {}",
                status.as_u16(),
                namespace.name()
            ),
            source: None,
        });
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| ConfigError::source_error(source_name, "failed to read response body", e))?;
    let mut envelope: ConfigEnvelope = serde_json::from_slice(&body)
        .map_err(|e| ConfigError::source_error(source_name, "failed to parse apollo response", e))?;

    if namespace.format() == "properties" {
        let tree = nest_properties(envelope.configurations);
        let bytes = serde_json::to_vec(&tree)
            .map_err(|e| ConfigError::source_error(source_name, "failed to encode configurations", e))?;
        Ok((bytes, "json".to_string()))
    } else {
        let content = envelope.configurations.remove("content").unwrap_or_default();
        Ok((content.into_bytes(), namespace.format().to_string()))
    }
}

/// Reads one Apollo namespace per load.
///
/// # Examples
///
/// ```rust,no_run
/// use cfgweave::adapters::ApolloSource;
/// use cfgweave::service::Aggregator;
///
/// let apollo = ApolloSource::new("http://apollo:8080", "my-app", "default", "application");
/// assert_eq!(cfgweave::ports::ConfigSource::name(&apollo), "apollo[my-app:default:application]");
///
/// let aggregator = Aggregator::builder().with_source(apollo).build()?;
/// # Ok::<(), cfgweave::domain::ConfigError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ApolloSource {
    endpoint: ApolloEndpoint,
    namespace: ApolloNamespace,
    name: String,
    timeout: Duration,
}

impl ApolloSource {
    /// Creates a source for one namespace.
    pub fn new(base_url: &str, app_id: &str, cluster: &str, namespace: &str) -> Self {
        let endpoint = ApolloEndpoint::new(base_url, app_id, cluster);
        let namespace = ApolloNamespace::new(namespace);
        let name = format!(
            "apollo[{}:{}:{}]",
            endpoint.app_id,
            endpoint.cluster,
            namespace.name()
        );
        Self {
            endpoint,
            namespace,
            name,
            timeout: DEFAULT_APOLLO_TIMEOUT,
        }
    }

    /// Forces the namespace content format.
    pub fn with_format(mut self, format: &str) -> Self {
        if !format.trim().is_empty() {
            self.namespace = ApolloNamespace::with_format(self.namespace.name.clone(), format);
        }
        self
    }

    /// Overrides the display name. Blank names are ignored.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !name.trim().is_empty() {
            self.name = name.trim().to_string();
        }
        self
    }

    /// Sets the request timeout. A zero timeout is ignored.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        if !timeout.is_zero() {
            self.timeout = timeout;
        }
        self
    }

    /// Returns the namespace.
    pub fn namespace(&self) -> &ApolloNamespace {
        &self.namespace
    }
}

impl ConfigSource for ApolloSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&self) -> Result<Payload> {
        if !self.endpoint.is_complete() || self.namespace.name().is_empty() {
            return Err(ConfigError::SourceError {
                source_name: self.name.clone(),
                message: "missing base url, app id, cluster or namespace".to_string(),
                source: None,
            });
        }

        let client = build_client(self.timeout, &self.name)?;
        let (bytes, format) = runtime::block_on(fetch_namespace(
            &client,
            &self.endpoint,
            &self.namespace,
            &self.name,
        ))??;
        tracing::debug!("fetched apollo namespace {} ({})", self.namespace.name(), format);
        Ok(Payload::new(bytes, format, self.name.as_str()))
    }
}

/// Last successful payload per namespace.
///
/// Safe to share between sources and threads. Entries live in memory only.
#[derive(Debug, Default)]
pub struct FallbackCache {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl FallbackCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the payload for `namespace`, replacing any previous one.
    pub fn set(&self, namespace: &str, bytes: Vec<u8>) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(namespace.to_string(), bytes);
    }

    /// Returns a copy of the payload cached for `namespace`.
    pub fn get(&self, namespace: &str) -> Option<Vec<u8>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(namespace)
            .cloned()
    }

    /// Returns the number of cached namespaces.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Returns `true` when nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Reads several Apollo namespaces into one document.
///
/// The payload is a JSON object keyed by [`ApolloNamespace::key`]:
///
/// ```json
/// { "application": { ... }, "db": { ... } }
/// ```
///
/// When a namespace cannot be fetched or decoded, the last good copy from the
/// [`FallbackCache`] stands in for it. Without a cached copy the whole load
/// fails.
#[derive(Debug, Clone)]
pub struct ApolloMultiSource {
    endpoint: ApolloEndpoint,
    namespaces: Vec<ApolloNamespace>,
    name: String,
    timeout: Duration,
    cache: Arc<FallbackCache>,
}

impl ApolloMultiSource {
    /// Creates a source for `namespaces`, in order.
    pub fn new(base_url: &str, app_id: &str, cluster: &str, namespaces: Vec<ApolloNamespace>) -> Self {
        let endpoint = ApolloEndpoint::new(base_url, app_id, cluster);
        let name = format!("apollo-multi[{}]", endpoint.app_id);
        Self {
            endpoint,
            namespaces,
            name,
            timeout: DEFAULT_APOLLO_TIMEOUT,
            cache: Arc::new(FallbackCache::new()),
        }
    }

    /// Overrides the display name. Blank names are ignored.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !name.trim().is_empty() {
            self.name = name.trim().to_string();
        }
        self
    }

    /// Sets the per-request timeout. A zero timeout is ignored.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        if !timeout.is_zero() {
            self.timeout = timeout;
        }
        self
    }

    /// Uses a cache shared with other owners.
    pub fn with_cache(mut self, cache: Arc<FallbackCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Returns the fallback cache.
    pub fn cache(&self) -> &Arc<FallbackCache> {
        &self.cache
    }

    /// Returns the namespaces, in load order.
    pub fn namespaces(&self) -> &[ApolloNamespace] {
        &self.namespaces
    }

    /// Fetches and decodes one namespace into JSON tree bytes.
    async fn fetch_tree(&self, client: &reqwest::Client, namespace: &ApolloNamespace) -> Result<Vec<u8>> {
        let (bytes, format) = fetch_namespace(client, &self.endpoint, namespace, &self.name).await?;
        let decoder = builtin_decoder(&format).ok_or_else(|| ConfigError::NoDecoder {
            format: format.clone(),
        })?;
        let tree = decoder.decode(&bytes)?;
        serde_json::to_vec(&tree)
            .map_err(|e| ConfigError::source_error(self.name.as_str(), "failed to encode namespace", e))
    }
}

impl ConfigSource for ApolloMultiSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&self) -> Result<Payload> {
        let client = build_client(self.timeout, &self.name)?;
        let fetched = runtime::block_on(async {
            let mut results = Vec::with_capacity(self.namespaces.len());
            for namespace in &self.namespaces {
                results.push(self.fetch_tree(&client, namespace).await);
            }
            results
        })?;

        let mut document = Tree::new();
        for (namespace, result) in self.namespaces.iter().zip(fetched) {
            let bytes = match result {
                Ok(bytes) => {
                    self.cache.set(namespace.name(), bytes.clone());
                    bytes
                }
                Err(e) => match self.cache.get(namespace.name()) {
                    Some(cached) => {
                        tracing::warn!(
                            "apollo namespace {} failed, using cached copy: {}",
                            namespace.name(),
                            e
                        );
                        cached
                    }
                    None => {
                        return Err(ConfigError::SourceError {
                            source_name: self.name.clone(),
                            message: format!("namespace {} load failed", namespace.name()),
                            source: Some(Box::new(e)),
                        })
                    }
                },
            };
            let tree = JsonDecoder::new().decode(&bytes)?;
            document.insert(namespace.key().to_string(), Value::Map(tree));
        }

        let bytes = serde_json::to_vec(&document)
            .map_err(|e| ConfigError::source_error(self.name.as_str(), "failed to encode document", e))?;
        Ok(Payload::new(bytes, "json", self.name.as_str()))
    }
}

/// Long-poll transport for Apollo's `notifications/v2` endpoint.
///
/// Each poll sends the last seen notification id of every namespace; the
/// server answers `304 Not Modified` or the list of namespaces whose id moved.
#[derive(Debug)]
pub struct ApolloNotificationClient {
    endpoint: ApolloEndpoint,
    namespaces: Vec<String>,
    name: String,
    timeout: Duration,
    client: OnceCell<reqwest::Client>,
}

impl ApolloNotificationClient {
    /// Creates a transport for `namespaces`.
    pub fn new<I, S>(base_url: &str, app_id: &str, cluster: &str, namespaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let endpoint = ApolloEndpoint::new(base_url, app_id, cluster);
        let name = format!("apollo-notifications[{}]", endpoint.app_id);
        Self {
            endpoint,
            namespaces: namespaces.into_iter().map(Into::into).collect(),
            name,
            timeout: DEFAULT_NOTIFICATION_TIMEOUT,
            client: OnceCell::new(),
        }
    }

    /// Sets the long-poll request timeout. A zero timeout is ignored.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        if !timeout.is_zero() {
            self.timeout = timeout;
            self.client = OnceCell::new();
        }
        self
    }

    fn client(&self) -> Result<&reqwest::Client> {
        self.client.get_or_try_init(|| {
            reqwest::Client::builder()
                .timeout(self.timeout)
                .build()
                .map_err(|e| ConfigError::watcher_error("failed to build HTTP client", e))
        })
    }
}

#[async_trait]
impl NotificationTransport for ApolloNotificationClient {
    fn name(&self) -> &str {
        &self.name
    }

    fn namespaces(&self) -> Vec<String> {
        self.namespaces.clone()
    }

    async fn poll(&self, current: &[Notification]) -> Result<PollOutcome> {
        let notifications = serde_json::to_string(current)
            .map_err(|e| ConfigError::watcher_error("failed to encode notifications", e))?;

        let response = self
            .client()?
            .get(self.endpoint.notifications_url())
            .query(&[
                ("appId", self.endpoint.app_id.as_str()),
                ("cluster", self.endpoint.cluster.as_str()),
                ("notifications", notifications.as_str()),
            ])
            .send()
            .await
            .map_err(|e| ConfigError::watcher_error("notification request failed", e))?;

        match response.status() {
            StatusCode::NOT_MODIFIED => Ok(PollOutcome::NotModified),
            StatusCode::OK => {
                let body = response
                    .bytes()
                    .await
                    .map_err(|e| ConfigError::watcher_error("failed to read notification body", e))?;
                let changed: Vec<Notification> = serde_json::from_slice(&body)
                    .map_err(|e| ConfigError::watcher_error("malformed notification body", e))?;
                Ok(PollOutcome::Changed(changed))
            }
            other => Err(ConfigError::WatcherError {
                message: format!("unexpected notification status {}", other.as_u16()),
                source: None,
            }),
        }
    }
}
