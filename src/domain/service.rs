// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration service trait definition.
//!
//! `ConfigurationService` is the read side of the crate: dotted-path queries
//! against an already published tree, plus a `reload` hook. Reads never touch
//! a source; only `reload` does.

use crate::domain::{ConfigKey, Result, Value};
use std::time::Duration;

/// Query interface over a published configuration tree.
///
/// Only [`get`](ConfigurationService::get), [`keys`](ConfigurationService::keys)
/// and [`reload`](ConfigurationService::reload) must be implemented; the typed
/// accessors coerce the generic value and return `None` when the path is
/// missing or the value does not convert.
///
/// # Examples
///
/// ```
/// use cfgweave::prelude::*;
/// use cfgweave::service::Aggregator;
///
/// let aggregator = Aggregator::new();
/// assert!(aggregator.get("missing").is_none());
/// assert!(aggregator.keys().is_empty());
/// ```
pub trait ConfigurationService: Send + Sync {
    /// Returns the value at a dotted path. The empty path returns the whole
    /// tree as a map.
    fn get(&self, path: &str) -> Option<Value>;

    /// Lists the dotted path of every leaf.
    fn keys(&self) -> Vec<String>;

    /// Recomputes the published tree from the registered sources.
    fn reload(&self) -> Result<()>;

    /// Returns `true` if the path resolves to a value.
    fn has(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    /// Returns the value rendered as text.
    fn get_string(&self, path: &str) -> Option<String> {
        self.get(path).map(|v| v.coerce_string())
    }

    /// Returns the value as an integer.
    fn get_int(&self, path: &str) -> Option<i64> {
        self.get(path).and_then(|v| v.coerce_i64())
    }

    /// Returns the value as a float.
    fn get_float(&self, path: &str) -> Option<f64> {
        self.get(path).and_then(|v| v.coerce_f64())
    }

    /// Returns the value as a boolean.
    fn get_bool(&self, path: &str) -> Option<bool> {
        self.get(path).and_then(|v| v.coerce_bool())
    }

    /// Returns the value as a duration.
    fn get_duration(&self, path: &str) -> Option<Duration> {
        self.get(path).and_then(|v| v.coerce_duration())
    }

    /// Returns the value as text, or `default` when it is absent.
    fn get_or_default(&self, path: &str, default: &str) -> String {
        self.get_string(path).unwrap_or_else(|| default.to_string())
    }

    /// Returns the value at a typed key.
    fn get_key(&self, key: &ConfigKey) -> Option<Value> {
        self.get(key.as_str())
    }
}
