// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP(S) configuration source.

use crate::domain::{
    detect_format_from_content_type, detect_format_from_path, normalize_format, ConfigError, Result,
};
use crate::ports::{ConfigSource, Payload};
use crate::runtime;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, Url};
use std::collections::BTreeMap;
use std::time::Duration;

/// Default request timeout.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(5);

/// Fetches one configuration document over HTTP per load.
///
/// The format is taken, in order, from [`with_format`](Self::with_format),
/// from the extension of the URL path, or from the response `Content-Type`.
/// Any non-2xx status fails the load.
///
/// # Examples
///
/// ```rust,no_run
/// use cfgweave::adapters::HttpSource;
/// use cfgweave::service::Aggregator;
/// use std::time::Duration;
///
/// let remote = HttpSource::new("https://config.example.com/app.yaml")
///     .with_name("remote-app-config")
///     .with_header("Authorization", "Bearer token")
///     .with_timeout(Duration::from_secs(2));
///
/// let aggregator = Aggregator::builder().with_source(remote).build()?;
/// # Ok::<(), cfgweave::domain::ConfigError>(())
/// ```
#[derive(Debug, Clone)]
pub struct HttpSource {
    url: String,
    method: Method,
    headers: BTreeMap<String, String>,
    format: Option<String>,
    name: String,
    timeout: Duration,
}

impl HttpSource {
    /// Creates a `GET` source for `url`. The display name defaults to the URL.
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into().trim().to_string();
        Self {
            name: url.clone(),
            url,
            method: Method::GET,
            headers: BTreeMap::new(),
            format: None,
            timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }

    /// Sets the request method. Blank or invalid methods are ignored.
    pub fn with_method(mut self, method: &str) -> Self {
        match Method::from_bytes(method.trim().to_uppercase().as_bytes()) {
            Ok(method) if !method.as_str().is_empty() => self.method = method,
            _ => tracing::debug!("ignoring invalid HTTP method {:?}", method),
        }
        self
    }

    /// Adds a request header, replacing an earlier one with the same name.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Sets the format explicitly, bypassing detection.
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

    /// Sets the request timeout. A zero timeout is ignored.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        if !timeout.is_zero() {
            self.timeout = timeout;
        }
        self
    }

    fn error(&self, message: impl Into<String>) -> ConfigError {
        ConfigError::SourceError {
            source_name: self.name.clone(),
            message: message.into(),
            source: None,
        }
    }

    async fn fetch(&self, url: Url) -> Result<(Vec<u8>, Option<String>)> {
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| ConfigError::source_error(self.name.as_str(), "failed to build HTTP client", e))?;

        let mut request = client.request(self.method.clone(), url);
        for (name, value) in &self.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request
            .send()
            .await
            .map_err(|e| ConfigError::source_error(self.name.as_str(), "request failed", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(self.error(format!("non-2xx status code: {}", status.as_u16())));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response
            .bytes()
            .await
            .map_err(|e| ConfigError::source_error(self.name.as_str(), "failed to read response body", e))?;

        Ok((body.to_vec(), content_type))
    }

    fn resolve_format(&self, url: &Url, content_type: Option<&str>) -> Result<String> {
        if let Some(format) = &self.format {
            return Ok(format.clone());
        }
        if let Ok(format) = detect_format_from_path(url.path()) {
            return Ok(format);
        }
        content_type
            .and_then(|ct| detect_format_from_content_type(ct).ok())
            .ok_or_else(|| {
                self.error(format!(
                    "cannot detect format from url or content-type (url={:?})",
                    self.url
                ))
            })
    }
}

impl ConfigSource for HttpSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&self) -> Result<Payload> {
        if self.url.is_empty() {
            return Err(self.error("url is empty"));
        }
        let url = Url::parse(&self.url)
            .map_err(|e| ConfigError::source_error(self.name.as_str(), format!("invalid url {:?}", self.url), e))?;

        let (bytes, content_type) = runtime::block_on(self.fetch(url.clone()))??;
        let format = self.resolve_format(&url, content_type.as_deref())?;
        tracing::debug!("fetched {} bytes from {}", bytes.len(), self.url);
        Ok(Payload::new(bytes, format, self.name.as_str()))
    }
}
