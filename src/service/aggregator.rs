// SPDX-License-Identifier: MIT OR Apache-2.0

//! The aggregator: the configuration facade.
//!
//! `load` folds an ordered list of sources into one tree. Each payload is
//! decoded by the decoder registered for its format and merged over everything
//! loaded before it. Placeholders are resolved once, on the merged tree, so a
//! value overridden by a later source is never expanded. The result is
//! published atomically; readers only ever see a complete tree.

use crate::adapters::decoders::builtin_decoders;
use crate::domain::{
    leaf_keys, lookup, normalize_format, ConfigError, ConfigKey, ConfigurationService, LoadStage,
    Result, Tree, Value,
};
use crate::ports::{env_lookup, ConfigSource, Decoder, Lookup, MergeStrategy, VariableExpander};
use crate::service::expand::{expand_tree, DefaultExpander};
use crate::service::merge::DeepMerge;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

/// Source name reported for placeholder failures, which are raised on the
/// merged tree rather than on any one source.
pub const AGGREGATED_SOURCE: &str = "<aggregated>";

/// Aggregates sources into one published configuration tree.
///
/// # Concurrency
///
/// Loads are serialized by an internal mutex and the new tree is swapped in
/// while that mutex is held. Reads take a short read lock to clone an `Arc`
/// of the published tree and never wait on I/O. A failed load leaves the
/// previously published tree untouched.
///
/// # Examples
///
/// ```
/// use cfgweave::prelude::*;
/// use cfgweave::service::Aggregator;
///
/// struct Inline(&'static str, &'static str);
///
/// impl ConfigSource for Inline {
///     fn name(&self) -> &str {
///         self.0
///     }
///
///     fn load(&self) -> Result<Payload> {
///         Ok(Payload::new(self.1, "json", self.0))
///     }
/// }
///
/// let aggregator = Aggregator::new();
/// aggregator
///     .load(&[
///         &Inline("defaults", r#"{"host": "a"}"#),
///         &Inline("override", r#"{"host": "b", "port": 1}"#),
///     ])
///     .unwrap();
///
/// assert_eq!(aggregator.get_string("host").as_deref(), Some("b"));
/// assert_eq!(aggregator.get_int("port"), Some(1));
/// ```
pub struct Aggregator {
    decoders: HashMap<String, Arc<dyn Decoder>>,
    merge: Arc<dyn MergeStrategy>,
    expander: Arc<dyn VariableExpander>,
    lookup: Option<Lookup>,
    sources: Vec<Arc<dyn ConfigSource>>,
    load_lock: Mutex<()>,
    published: RwLock<Arc<Tree>>,
}

impl Aggregator {
    /// Creates an aggregator with the built-in decoders, deep merge and no
    /// placeholder expansion.
    pub fn new() -> Self {
        AggregatorBuilder::new().assemble()
    }

    /// Creates a builder.
    pub fn builder() -> AggregatorBuilder {
        AggregatorBuilder::new()
    }

    /// Loads `sources` in order and publishes the merged result.
    ///
    /// Later sources override earlier ones at every nesting level. The call is
    /// all-or-nothing: the first failing source aborts it, the error names
    /// that source, and the published tree is left as it was. Loading an empty
    /// list is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::LoadFailed`] wrapping the source, decode, merge
    /// or placeholder error.
    pub fn load(&self, sources: &[&dyn ConfigSource]) -> Result<()> {
        let _guard = self.load_lock.lock().unwrap_or_else(PoisonError::into_inner);

        if sources.is_empty() {
            tracing::debug!("load called without sources; keeping published tree");
            return Ok(());
        }

        let mut merged = Tree::new();
        for source in sources {
            let (name, tree) = self.load_one(*source)?;
            merged = self
                .merge
                .merge(merged, &tree)
                .map_err(|e| e.in_source(name.as_str(), LoadStage::Merge))?;
        }

        if let Some(lookup) = &self.lookup {
            expand_tree(&mut merged, self.expander.as_ref(), lookup.as_ref())
                .map_err(|e| e.in_source(AGGREGATED_SOURCE, LoadStage::Expand))?;
        }

        let leaf_count = leaf_keys(&merged).len();
        *self.published.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(merged);
        tracing::info!(
            "published configuration from {} source(s), {} key(s)",
            sources.len(),
            leaf_count
        );
        Ok(())
    }

    fn load_one(&self, source: &dyn ConfigSource) -> Result<(String, Tree)> {
        let payload = source
            .load()
            .map_err(|e| e.in_source(source.name(), LoadStage::Load))?;

        let name = if payload.metadata.source.is_empty() {
            source.name().to_string()
        } else {
            payload.metadata.source.clone()
        };

        let format = normalize_format(&payload.metadata.format);
        let decoder = self.decoders.get(&format).ok_or_else(|| {
            ConfigError::NoDecoder {
                format: format.clone(),
            }
            .in_source(name.as_str(), LoadStage::Decode)
        })?;

        let tree = decoder
            .decode(&payload.bytes)
            .map_err(|e| e.in_source(name.as_str(), LoadStage::Decode))?;

        tracing::debug!(
            "decoded source '{}' ({} bytes, format {})",
            name,
            payload.bytes.len(),
            format
        );
        Ok((name, tree))
    }

    /// Returns the currently published tree.
    pub fn snapshot(&self) -> Arc<Tree> {
        Arc::clone(&self.published.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Returns the registered sources, in load order.
    pub fn sources(&self) -> &[Arc<dyn ConfigSource>] {
        &self.sources
    }

    /// Returns the decoder registered for a format tag.
    pub fn decoder(&self, format: &str) -> Option<Arc<dyn Decoder>> {
        self.decoders.get(&normalize_format(format)).cloned()
    }

    /// Deserializes the whole published tree.
    ///
    /// Durations are presented as literals such as `"500ms"`.
    pub fn unmarshal<T: DeserializeOwned>(&self) -> Result<T> {
        let snapshot = self.snapshot();
        deserialize_value(&Value::Map((*snapshot).clone()), "")
    }

    /// Deserializes the sub-tree or leaf at a dotted path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ConfigKeyNotFound`] when the path is absent.
    pub fn unmarshal_key<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let value = self.get(path).ok_or_else(|| ConfigError::ConfigKeyNotFound {
            key: path.to_string(),
        })?;
        deserialize_value(&value, path)
    }
}

fn deserialize_value<T: DeserializeOwned>(value: &Value, key: &str) -> Result<T> {
    let conversion = |e: serde_json::Error| ConfigError::TypeConversionError {
        key: key.to_string(),
        target_type: std::any::type_name::<T>().to_string(),
        source: Box::new(e),
    };
    let json = serde_json::to_value(value).map_err(conversion)?;
    serde_json::from_value(json).map_err(conversion)
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Aggregator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut formats: Vec<&String> = self.decoders.keys().collect();
        formats.sort();
        f.debug_struct("Aggregator")
            .field("formats", &formats)
            .field("expansion", &self.lookup.is_some())
            .field("sources", &self.sources.iter().map(|s| s.name()).collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl ConfigurationService for Aggregator {
    fn get(&self, path: &str) -> Option<Value> {
        let snapshot = self.snapshot();
        let key = ConfigKey::from(path);
        if key.is_root() {
            return Some(Value::Map((*snapshot).clone()));
        }
        lookup(&snapshot, &key).cloned()
    }

    fn keys(&self) -> Vec<String> {
        leaf_keys(&self.snapshot())
    }

    fn reload(&self) -> Result<()> {
        let sources: Vec<&dyn ConfigSource> = self
            .sources
            .iter()
            .map(|s| s.as_ref() as &dyn ConfigSource)
            .collect();
        self.load(&sources)
    }
}

/// Builder for [`Aggregator`].
///
/// # Examples
///
/// ```
/// use cfgweave::prelude::*;
/// use cfgweave::service::Aggregator;
///
/// let aggregator = Aggregator::builder()
///     .with_lookup(|name| (name == "HOST").then(|| "db.internal".to_string()))
///     .build()
///     .unwrap();
/// assert!(aggregator.keys().is_empty());
/// ```
pub struct AggregatorBuilder {
    decoders: HashMap<String, Arc<dyn Decoder>>,
    merge: Arc<dyn MergeStrategy>,
    expander: Arc<dyn VariableExpander>,
    lookup: Option<Lookup>,
    sources: Vec<Arc<dyn ConfigSource>>,
}

impl AggregatorBuilder {
    /// Creates a builder with every built-in decoder registered.
    pub fn new() -> Self {
        let decoders = builtin_decoders()
            .into_iter()
            .map(|d| (d.format().to_string(), d))
            .collect();
        Self {
            decoders,
            merge: Arc::new(DeepMerge),
            expander: Arc::new(DefaultExpander::new()),
            lookup: None,
            sources: Vec::new(),
        }
    }

    /// Registers a decoder under its format tag, replacing any previous one.
    pub fn with_decoder<D: Decoder + 'static>(mut self, decoder: D) -> Self {
        let format = normalize_format(decoder.format());
        self.decoders.insert(format, Arc::new(decoder));
        self
    }

    /// Removes every registered decoder, built-ins included.
    pub fn without_decoders(mut self) -> Self {
        self.decoders.clear();
        self
    }

    /// Replaces the merge strategy.
    pub fn with_merge_strategy<M: MergeStrategy + 'static>(mut self, merge: M) -> Self {
        self.merge = Arc::new(merge);
        self
    }

    /// Replaces the placeholder expander.
    pub fn with_expander<E: VariableExpander + 'static>(mut self, expander: E) -> Self {
        self.expander = Arc::new(expander);
        self
    }

    /// Uses the built-in expander in strict mode: a placeholder that misses
    /// and has no default fails the load.
    pub fn with_strict_placeholders(self) -> Self {
        self.with_expander(DefaultExpander::strict())
    }

    /// Enables placeholder expansion against process environment variables,
    /// looking up `prefix + name`.
    pub fn with_env_expand(mut self, prefix: impl Into<String>) -> Self {
        self.lookup = Some(env_lookup(prefix));
        self
    }

    /// Enables placeholder expansion against a custom lookup.
    pub fn with_lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.lookup = Some(Arc::new(lookup));
        self
    }

    /// Registers a source for [`ConfigurationService::reload`]. Sources load in
    /// registration order.
    pub fn with_source<S: ConfigSource + 'static>(mut self, source: S) -> Self {
        self.sources.push(Arc::new(source));
        self
    }

    /// Registers a source that is shared with other owners, such as a
    /// polling coordinator.
    pub fn with_shared_source(mut self, source: Arc<dyn ConfigSource>) -> Self {
        self.sources.push(source);
        self
    }

    /// Builds the aggregator and, when sources were registered, performs the
    /// first load.
    ///
    /// # Errors
    ///
    /// Returns the error of the initial load.
    pub fn build(self) -> Result<Aggregator> {
        let aggregator = self.assemble();
        if !aggregator.sources.is_empty() {
            aggregator.reload()?;
        }
        Ok(aggregator)
    }

    fn assemble(self) -> Aggregator {
        Aggregator {
            decoders: self.decoders,
            merge: self.merge,
            expander: self.expander,
            lookup: self.lookup,
            sources: self.sources,
            load_lock: Mutex::new(()),
            published: RwLock::new(Arc::new(Tree::new())),
        }
    }
}

impl Default for AggregatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::Payload;
    use serde::Deserialize;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct Fixed {
        name: &'static str,
        format: &'static str,
        body: &'static str,
    }

    impl Fixed {
        fn json(name: &'static str, body: &'static str) -> Self {
            Self {
                name,
                format: "json",
                body,
            }
        }
    }

    impl ConfigSource for Fixed {
        fn name(&self) -> &str {
            self.name
        }

        fn load(&self) -> Result<Payload> {
            Ok(Payload::new(self.body, self.format, self.name))
        }
    }

    struct Failing;

    impl ConfigSource for Failing {
        fn name(&self) -> &str {
            "remote"
        }

        fn load(&self) -> Result<Payload> {
            Err(ConfigError::SourceError {
                source_name: "remote".to_string(),
                message: "connection refused".to_string(),
                source: None,
            })
        }
    }

    struct Counting(AtomicUsize);

    impl ConfigSource for Counting {
        fn name(&self) -> &str {
            "counting"
        }

        fn load(&self) -> Result<Payload> {
            let n = self.0.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(Payload::new(format!(r#"{{"generation": {}}}"#, n), "json", "counting"))
        }
    }

    #[test]
    fn test_later_source_wins() {
        let agg = Aggregator::new();
        agg.load(&[
            &Fixed::json("a", r#"{"host": "a"}"#),
            &Fixed::json("b", r#"{"host": "b", "port": 1}"#),
        ])
        .unwrap();

        let mut expected = Tree::new();
        expected.insert("host".to_string(), Value::from("b"));
        expected.insert("port".to_string(), Value::from(1));
        assert_eq!(*agg.snapshot(), expected);
    }

    #[test]
    fn test_failed_load_keeps_previous_tree() {
        let agg = Aggregator::new();
        agg.load(&[&Fixed::json("base", r#"{"host": "old"}"#)]).unwrap();

        let err = agg
            .load(&[&Fixed::json("a", r#"{"host": "new"}"#), &Failing])
            .unwrap_err();

        assert!(matches!(
            err,
            ConfigError::LoadFailed { ref source_name, stage: LoadStage::Load, .. } if source_name == "remote"
        ));
        assert_eq!(agg.get_string("host").as_deref(), Some("old"));
    }

    #[test]
    fn test_failed_first_load_leaves_empty_tree() {
        let agg = Aggregator::new();
        assert!(agg
            .load(&[&Fixed::json("a", r#"{"host": "a"}"#), &Failing])
            .is_err());
        assert!(agg.snapshot().is_empty());
    }

    #[test]
    fn test_unknown_format_names_source() {
        let agg = Aggregator::new();
        let err = agg
            .load(&[&Fixed {
                name: "legacy.ini",
                format: "INI",
                body: "[a]",
            }])
            .unwrap_err();
        assert!(err.to_string().contains("no decoder registered for format: ini"));
        assert!(err.to_string().contains("legacy.ini"));
    }

    #[test]
    fn test_decode_error_is_wrapped() {
        let agg = Aggregator::new();
        let err = agg.load(&[&Fixed::json("broken.json", "{")]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::LoadFailed { stage: LoadStage::Decode, .. }
        ));
    }

    #[test]
    fn test_empty_source_list_is_noop() {
        let agg = Aggregator::new();
        agg.load(&[&Fixed::json("a", r#"{"k": 1}"#)]).unwrap();
        agg.load(&[]).unwrap();
        assert_eq!(agg.get_int("k"), Some(1));
    }

    #[test]
    fn test_get_root_and_paths() {
        let agg = Aggregator::new();
        agg.load(&[&Fixed::json(
            "a",
            r#"{"db": {"host": "h", "port": "5432"}, "debug": "yes", "timeout": "1.5s"}"#,
        )])
        .unwrap();

        assert!(agg.get("").unwrap().is_map());
        assert!(agg.get("db").unwrap().is_map());
        assert_eq!(agg.get_int("db.port"), Some(5432));
        assert_eq!(agg.get_bool("debug"), Some(true));
        assert_eq!(agg.get_duration("timeout"), Some(Duration::from_millis(1500)));
        assert_eq!(agg.get("db.user"), None);
        assert_eq!(agg.keys(), vec!["db.host", "db.port", "debug", "timeout"]);
    }

    #[test]
    fn test_expansion_uses_lookup() {
        let agg = Aggregator::builder()
            .with_lookup(|name| match name {
                "HOST" => Some("10.1.1.1".to_string()),
                "REDIS_PORT" => Some("6380".to_string()),
                _ => None,
            })
            .build()
            .unwrap();
        agg.load(&[&Fixed::json(
            "a",
            r#"{"db": "${env.HOST|127.0.0.1}", "cache": ["${redis.port|6379}"], "user": "${env.USER|guest}"}"#,
        )])
        .unwrap();

        assert_eq!(agg.get_string("db").as_deref(), Some("10.1.1.1"));
        assert_eq!(
            agg.get("cache"),
            Some(Value::List(vec![Value::from("6380")]))
        );
        assert_eq!(agg.get_string("user").as_deref(), Some("guest"));
    }

    #[test]
    fn test_expansion_disabled_by_default() {
        let agg = Aggregator::new();
        agg.load(&[&Fixed::json("a", r#"{"db": "${env.HOST}"}"#)]).unwrap();
        assert_eq!(agg.get_string("db").as_deref(), Some("${env.HOST}"));
    }

    #[test]
    fn test_placeholder_error_is_attributed_to_merged_tree() {
        let agg = Aggregator::builder().with_lookup(|_| None).build().unwrap();
        let err = agg
            .load(&[&Fixed::json("app.json", r#"{"db": "${env.HOST"}"#)])
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::LoadFailed { ref source_name, stage: LoadStage::Expand, .. } if source_name == AGGREGATED_SOURCE
        ));
    }

    #[test]
    fn test_overridden_strict_placeholder_is_not_resolved() {
        let agg = Aggregator::builder()
            .with_lookup(|_| None)
            .with_strict_placeholders()
            .build()
            .unwrap();
        agg.load(&[
            &Fixed::json("defaults", r#"{"db": {"password": "${env.DB_PASSWORD}"}}"#),
            &Fixed::json("secrets", r#"{"db": {"password": "hunter2"}}"#),
        ])
        .unwrap();
        assert_eq!(agg.get_string("db.password").as_deref(), Some("hunter2"));
    }

    #[test]
    fn test_overridden_malformed_placeholder_is_not_resolved() {
        let agg = Aggregator::builder().with_lookup(|_| None).build().unwrap();
        agg.load(&[
            &Fixed::json("defaults", r#"{"x": "${broken"}"#),
            &Fixed::json("site", r#"{"x": "ok"}"#),
        ])
        .unwrap();
        assert_eq!(agg.get_string("x").as_deref(), Some("ok"));
    }

    #[test]
    fn test_placeholder_from_earlier_source_survives_merge() {
        let agg = Aggregator::builder()
            .with_lookup(|name| (name == "HOST").then(|| "db.internal".to_string()))
            .with_strict_placeholders()
            .build()
            .unwrap();
        agg.load(&[
            &Fixed::json("base", r#"{"db": {"url": "pg://${env.HOST}"}}"#),
            &Fixed::json("site", r#"{"db": {"pool": 4}}"#),
        ])
        .unwrap();
        assert_eq!(agg.get_string("db.url").as_deref(), Some("pg://db.internal"));
        assert_eq!(agg.get_int("db.pool"), Some(4));
    }

    #[test]
    fn test_strict_placeholders() {
        let agg = Aggregator::builder()
            .with_lookup(|_| None)
            .with_strict_placeholders()
            .build()
            .unwrap();
        assert!(agg
            .load(&[&Fixed::json("a", r#"{"db": "${env.HOST}"}"#)])
            .is_err());
    }

    #[test]
    fn test_build_loads_registered_sources_and_reload_refreshes() {
        let agg = Aggregator::builder()
            .with_source(Counting(AtomicUsize::new(0)))
            .build()
            .unwrap();
        assert_eq!(agg.get_int("generation"), Some(1));
        agg.reload().unwrap();
        assert_eq!(agg.get_int("generation"), Some(2));
    }

    #[test]
    fn test_build_fails_when_initial_load_fails() {
        assert!(Aggregator::builder().with_source(Failing).build().is_err());
    }

    #[test]
    fn test_custom_decoder_replaces_builtin() {
        struct Shout;
        impl Decoder for Shout {
            fn format(&self) -> &str {
                "JSON"
            }
            fn decode(&self, _bytes: &[u8]) -> Result<Tree> {
                let mut t = Tree::new();
                t.insert("shout".to_string(), Value::from(true));
                Ok(t)
            }
        }

        let agg = Aggregator::builder().with_decoder(Shout).build().unwrap();
        agg.load(&[&Fixed::json("a", "{}")]).unwrap();
        assert_eq!(agg.get_bool("shout"), Some(true));
        assert_eq!(agg.decoder("json").unwrap().format(), "JSON");
    }

    #[test]
    fn test_without_decoders() {
        let agg = Aggregator::builder().without_decoders().build().unwrap();
        assert!(agg.decoder("json").is_none());
        assert!(agg.load(&[&Fixed::json("a", "{}")]).is_err());
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Db {
        host: String,
        port: u16,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct AppConfig {
        name: String,
        db: Db,
        timeout: String,
    }

    #[test]
    fn test_unmarshal() {
        let agg = Aggregator::builder()
            .with_source(Fixed::json(
                "a",
                r#"{"name": "svc", "db": {"host": "h", "port": 5432}, "timeout": "30s"}"#,
            ))
            .build()
            .unwrap();

        let config: AppConfig = agg.unmarshal().unwrap();
        assert_eq!(config.db, Db { host: "h".to_string(), port: 5432 });
        assert_eq!(config.timeout, "30s");

        let db: Db = agg.unmarshal_key("db").unwrap();
        assert_eq!(db.port, 5432);

        assert!(matches!(
            agg.unmarshal_key::<Db>("missing"),
            Err(ConfigError::ConfigKeyNotFound { .. })
        ));
        assert!(matches!(
            agg.unmarshal_key::<Db>("name"),
            Err(ConfigError::TypeConversionError { .. })
        ));
    }

    #[test]
    fn test_concurrent_readers_see_whole_trees() {
        let agg = Arc::new(
            Aggregator::builder()
                .with_source(Counting(AtomicUsize::new(0)))
                .build()
                .unwrap(),
        );

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let agg = Arc::clone(&agg);
                std::thread::spawn(move || {
                    for _ in 0..200 {
                        assert!(agg.get_int("generation").is_some());
                    }
                })
            })
            .collect();
        for _ in 0..50 {
            agg.reload().unwrap();
        }
        for reader in readers {
            reader.join().unwrap();
        }
        assert_eq!(agg.get_int("generation"), Some(51));
    }
}
