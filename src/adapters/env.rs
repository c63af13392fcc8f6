// SPDX-License-Identifier: MIT OR Apache-2.0

//! Environment variable configuration source.
//!
//! The variables are turned into a nested tree by
//! [`EnvMaterializer`](crate::domain::EnvMaterializer) and handed to the
//! aggregator as a JSON document, so they merge like any other source.

use crate::domain::{ConfigError, EnvMaterializer, Result, Value};
use crate::ports::{ConfigSource, Payload};
use std::fmt;
use std::sync::Arc;

/// Keys longer than this are ignored.
const MAX_ENV_KEY_LEN: usize = 512;

/// Values longer than this are ignored.
const MAX_ENV_VALUE_LEN: usize = 1024 * 1024;

type Environ = Arc<dyn Fn() -> Vec<String> + Send + Sync>;

/// Configuration source backed by `KEY=VALUE` environment pairs.
///
/// # Examples
///
/// ```rust
/// use cfgweave::adapters::EnvSource;
/// use cfgweave::ports::ConfigSource;
///
/// let source = EnvSource::new()
///     .with_prefix("MYAPP_")
///     .strip_prefix(true)
///     .with_environ(|| vec!["MYAPP_DB__PORT=3306".to_string(), "HOME=/root".to_string()]);
///
/// let payload = source.load().unwrap();
/// assert_eq!(payload.metadata.format, "json");
/// assert_eq!(payload.bytes, br#"{"db":{"port":3306}}"#);
/// ```
#[derive(Clone)]
pub struct EnvSource {
    materializer: EnvMaterializer,
    name: String,
    environ: Environ,
}

impl EnvSource {
    /// Creates a source reading the whole process environment with the
    /// default materializer settings.
    pub fn new() -> Self {
        Self {
            materializer: EnvMaterializer::new(),
            name: "env".to_string(),
            environ: Arc::new(process_environ),
        }
    }

    /// Keeps only variables starting with `prefix`.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.materializer = self.materializer.with_prefix(prefix);
        self
    }

    /// Removes the prefix before the key is split.
    pub fn strip_prefix(mut self, strip: bool) -> Self {
        self.materializer = self.materializer.strip_prefix(strip);
        self
    }

    /// Sets the nesting separator (default `__`).
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.materializer = self.materializer.with_separator(separator);
        self
    }

    /// Replaces the key segment normalizer.
    pub fn with_key_normalizer<F>(mut self, normalizer: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.materializer = self.materializer.with_key_normalizer(normalizer);
        self
    }

    /// Replaces the value parser.
    pub fn with_value_parser<F>(mut self, parser: F) -> Self
    where
        F: Fn(&str) -> Value + Send + Sync + 'static,
    {
        self.materializer = self.materializer.with_value_parser(parser);
        self
    }

    /// Overrides the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Replaces the process environment with another pair provider.
    pub fn with_environ<F>(mut self, environ: F) -> Self
    where
        F: Fn() -> Vec<String> + Send + Sync + 'static,
    {
        self.environ = Arc::new(environ);
        self
    }
}

fn process_environ() -> Vec<String> {
    std::env::vars_os()
        .filter_map(|(k, v)| Some(format!("{}={}", k.into_string().ok()?, v.into_string().ok()?)))
        .collect()
}

fn within_limits(pair: &str) -> bool {
    match pair.split_once('=') {
        Some((key, value)) => key.len() <= MAX_ENV_KEY_LEN && value.len() <= MAX_ENV_VALUE_LEN,
        None => true,
    }
}

impl Default for EnvSource {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EnvSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvSource")
            .field("name", &self.name)
            .field("materializer", &self.materializer)
            .finish_non_exhaustive()
    }
}

impl ConfigSource for EnvSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&self) -> Result<Payload> {
        let pairs = (self.environ)();
        let total = pairs.len();
        let pairs: Vec<String> = pairs.into_iter().filter(|p| within_limits(p)).collect();
        if pairs.len() < total {
            tracing::warn!(
                "ignored {} oversized environment variable(s)",
                total - pairs.len()
            );
        }

        let tree = self.materializer.materialize(&pairs);
        let bytes = serde_json::to_vec(&tree)
            .map_err(|e| ConfigError::source_error(self.name.as_str(), "failed to encode environment", e))?;
        Ok(Payload::new(bytes, "json", self.name.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::decoders::JsonDecoder;
    use crate::ports::Decoder;

    fn environ(pairs: &'static [&'static str]) -> impl Fn() -> Vec<String> + Send + Sync {
        move || pairs.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_name_and_format() {
        let source = EnvSource::new().with_environ(environ(&[]));
        assert_eq!(source.name(), "env");
        let payload = source.load().unwrap();
        assert_eq!(payload.metadata.format, "json");
        assert_eq!(payload.bytes, b"{}");
    }

    #[test]
    fn test_prefix_filter_without_strip() {
        let source = EnvSource::new()
            .with_prefix("APP_")
            .with_environ(environ(&["APP_PORT=1", "OTHER=2"]));
        let tree = JsonDecoder::new().decode(&source.load().unwrap().bytes).unwrap();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree["app_port"], Value::Integer(1));
    }

    #[test]
    fn test_typed_leaves_survive_encoding() {
        let source = EnvSource::new()
            .with_prefix("MYAPP_")
            .strip_prefix(true)
            .with_environ(environ(&[
                "MYAPP_DEBUG=on",
                "MYAPP_RATIO=0.5",
                "MYAPP_TIMEOUT=1m30s",
                "MYAPP_DB__HOST=db",
            ]));
        let tree = JsonDecoder::new().decode(&source.load().unwrap().bytes).unwrap();
        assert_eq!(tree["debug"], Value::Bool(true));
        assert_eq!(tree["ratio"], Value::Float(0.5));
        assert_eq!(tree["timeout"], Value::from("1m30s"));
        assert_eq!(tree["db"].as_map().unwrap()["host"], Value::from("db"));
    }

    #[test]
    fn test_out_of_range_numbers_are_not_lost() {
        let source = EnvSource::new()
            .with_prefix("MYAPP_")
            .strip_prefix(true)
            .with_environ(environ(&["MYAPP_HUGE=1e999"]));
        let tree = JsonDecoder::new().decode(&source.load().unwrap().bytes).unwrap();
        assert_eq!(tree["huge"], Value::from("1e999"));
    }

    #[test]
    fn test_non_finite_float_from_custom_parser_keeps_its_text() {
        let source = EnvSource::new()
            .with_value_parser(|_| Value::Float(f64::INFINITY))
            .with_environ(environ(&["LIMIT=unbounded"]));
        let tree = JsonDecoder::new().decode(&source.load().unwrap().bytes).unwrap();
        assert_eq!(tree["limit"], Value::from("inf"));
    }

    #[test]
    fn test_custom_separator_and_normalizer() {
        let source = EnvSource::new()
            .with_separator("_")
            .with_key_normalizer(|s| s.to_string())
            .with_value_parser(|s| Value::from(s))
            .with_environ(environ(&["DB_PORT=5432"]));
        let tree = JsonDecoder::new().decode(&source.load().unwrap().bytes).unwrap();
        assert_eq!(tree["DB"].as_map().unwrap()["PORT"], Value::from("5432"));
    }

    #[test]
    fn test_oversized_values_are_ignored() {
        let big = format!("BIG={}", "x".repeat(MAX_ENV_VALUE_LEN + 1));
        let source = EnvSource::new().with_environ(move || vec![big.clone(), "SMALL=1".to_string()]);
        let tree = JsonDecoder::new().decode(&source.load().unwrap().bytes).unwrap();
        assert!(!tree.contains_key("big"));
        assert_eq!(tree["small"], Value::Integer(1));
    }

    #[test]
    fn test_process_environment_is_default() {
        std::env::set_var("CFGWEAVE_ENV_SOURCE_TEST__FLAG", "yes");
        let source = EnvSource::new().with_prefix("CFGWEAVE_ENV_SOURCE_TEST").strip_prefix(true);
        let tree = JsonDecoder::new().decode(&source.load().unwrap().bytes).unwrap();
        assert_eq!(tree["flag"], Value::Bool(true));
    }
}
