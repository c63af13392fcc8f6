// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turns flat `KEY=VALUE` pairs into a nested, typed tree.
//!
//! This is how environment variables become configuration: with the prefix
//! `MYAPP_` stripped and the default `__` separator, `MYAPP_DB__PORT=3306`
//! becomes `{db: {port: 3306}}` with `port` typed as an integer.

use crate::domain::duration::parse_duration;
use crate::domain::path::insert_nested;
use crate::domain::value::{Tree, Value};
use std::fmt;
use std::sync::Arc;

/// Converts a raw value into a typed leaf.
pub type ValueParser = Arc<dyn Fn(&str) -> Value + Send + Sync>;

/// Normalizes a single key segment.
pub type KeyNormalizer = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// The default path separator, two underscores.
pub const DEFAULT_SEPARATOR: &str = "__";

/// Trims and lower-cases a key segment.
pub fn default_key_normalizer(segment: &str) -> String {
    segment.trim().to_lowercase()
}

/// Infers the type of a raw value.
///
/// The trimmed text is tried, in order, as a boolean literal
/// (`true/yes/y/on`, `false/no/n/off`), a base-10 integer, a finite float (only when
/// it contains `.`, `e` or `E`), and a duration literal with a unit. Anything
/// else stays a string. `"0"` and `"1"` are integers, never booleans.
///
/// # Examples
///
/// ```
/// use cfgweave::domain::{default_value_parser, Value};
///
/// assert_eq!(default_value_parser("on"), Value::Bool(true));
/// assert_eq!(default_value_parser("0"), Value::Integer(0));
/// assert_eq!(default_value_parser("hello"), Value::from("hello"));
/// ```
pub fn default_value_parser(raw: &str) -> Value {
    let s = raw.trim();
    if s.is_empty() {
        return Value::String(String::new());
    }

    match s.to_ascii_lowercase().as_str() {
        "true" | "yes" | "y" | "on" => return Value::Bool(true),
        "false" | "no" | "n" | "off" => return Value::Bool(false),
        _ => {}
    }

    if let Ok(i) = s.parse::<i64>() {
        return Value::Integer(i);
    }

    if s.contains(&['.', 'e', 'E'][..]) {
        // out-of-range literals such as `1e999` stay strings
        match s.parse::<f64>() {
            Ok(f) if f.is_finite() => return Value::Float(f),
            _ => {}
        }
    }

    if let Some(d) = parse_duration(s) {
        return Value::Duration(d);
    }

    Value::String(s.to_string())
}

/// Settings for turning `KEY=VALUE` pairs into a tree.
///
/// # Examples
///
/// ```
/// use cfgweave::domain::{EnvMaterializer, Value};
///
/// let tree = EnvMaterializer::new()
///     .with_prefix("MYAPP_")
///     .strip_prefix(true)
///     .materialize(["MYAPP_DB__HOST=127.0.0.1", "MYAPP_DB__PORT=3306", "PATH=/bin"]);
///
/// let db = tree["db"].as_map().unwrap();
/// assert_eq!(db["host"], Value::from("127.0.0.1"));
/// assert_eq!(db["port"], Value::Integer(3306));
/// assert!(!tree.contains_key("path"));
/// ```
#[derive(Clone)]
pub struct EnvMaterializer {
    prefix: Option<String>,
    strip_prefix: bool,
    separator: String,
    key_normalizer: KeyNormalizer,
    value_parser: ValueParser,
}

impl EnvMaterializer {
    /// Creates a materializer with no prefix, the `__` separator and the
    /// default normalizer and parser.
    pub fn new() -> Self {
        Self {
            prefix: None,
            strip_prefix: false,
            separator: DEFAULT_SEPARATOR.to_string(),
            key_normalizer: Arc::new(default_key_normalizer),
            value_parser: Arc::new(default_value_parser),
        }
    }

    /// Keeps only keys starting with `prefix`. An empty prefix keeps everything.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        self.prefix = if prefix.is_empty() { None } else { Some(prefix) };
        self
    }

    /// Removes the prefix from matching keys before splitting them.
    pub fn strip_prefix(mut self, strip: bool) -> Self {
        self.strip_prefix = strip;
        self
    }

    /// Sets the path separator. An empty separator keeps each key as one segment.
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// Replaces the key segment normalizer.
    pub fn with_key_normalizer<F>(mut self, normalizer: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.key_normalizer = Arc::new(normalizer);
        self
    }

    /// Replaces the value parser.
    pub fn with_value_parser<F>(mut self, parser: F) -> Self
    where
        F: Fn(&str) -> Value + Send + Sync + 'static,
    {
        self.value_parser = Arc::new(parser);
        self
    }

    /// Builds a tree from `KEY=VALUE` pairs.
    ///
    /// Pairs without `=` or with an empty key are skipped, as are keys whose
    /// segments all normalize to nothing. Later pairs overwrite earlier ones
    /// at the same path.
    pub fn materialize<I, S>(&self, pairs: I) -> Tree
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tree = Tree::new();
        for pair in pairs {
            let pair = pair.as_ref();
            let Some((key, raw)) = split_pair(pair) else {
                tracing::debug!("skipping malformed pair {:?}", pair);
                continue;
            };

            let key = match &self.prefix {
                Some(prefix) => match key.strip_prefix(prefix.as_str()) {
                    Some(rest) if self.strip_prefix => rest,
                    Some(_) => key,
                    None => continue,
                },
                None => key,
            };

            let path = self.path_segments(key);
            if path.is_empty() {
                continue;
            }
            insert_nested(&mut tree, &path, (self.value_parser)(raw));
        }
        tree
    }

    fn path_segments(&self, key: &str) -> Vec<String> {
        let key = key.trim();
        if key.is_empty() {
            return Vec::new();
        }
        let raw_segments: Vec<&str> = if self.separator.is_empty() {
            vec![key]
        } else {
            key.split(self.separator.as_str()).collect()
        };
        raw_segments
            .into_iter()
            .filter(|s| !s.is_empty())
            .map(|s| (self.key_normalizer)(s))
            .filter(|s| !s.is_empty())
            .collect()
    }
}

impl Default for EnvMaterializer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EnvMaterializer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvMaterializer")
            .field("prefix", &self.prefix)
            .field("strip_prefix", &self.strip_prefix)
            .field("separator", &self.separator)
            .finish_non_exhaustive()
    }
}

/// Splits on the first `=`; `None` when there is no `=` or the key is empty.
fn split_pair(pair: &str) -> Option<(&str, &str)> {
    match pair.split_once('=') {
        Some((key, value)) if !key.is_empty() => Some((key, value)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_default_value_parser_inference_order() {
        assert_eq!(default_value_parser("true"), Value::Bool(true));
        assert_eq!(default_value_parser(" OFF "), Value::Bool(false));
        assert_eq!(default_value_parser("0"), Value::Integer(0));
        assert_eq!(default_value_parser("1"), Value::Integer(1));
        assert_eq!(default_value_parser("-42"), Value::Integer(-42));
        assert_eq!(default_value_parser("1.5"), Value::Float(1.5));
        assert_eq!(default_value_parser("2e3"), Value::Float(2000.0));
        assert_eq!(
            default_value_parser("500ms"),
            Value::Duration(Duration::from_millis(500))
        );
        assert_eq!(default_value_parser("hello"), Value::from("hello"));
        assert_eq!(default_value_parser("   "), Value::from(""));
    }

    #[test]
    fn test_out_of_range_float_stays_string() {
        assert_eq!(default_value_parser("1e999"), Value::from("1e999"));
        assert_eq!(default_value_parser("-1E400"), Value::from("-1E400"));
    }

    #[test]
    fn test_example_pairs() {
        let tree = EnvMaterializer::new()
            .with_prefix("MYAPP_")
            .strip_prefix(true)
            .materialize(["MYAPP_DB__HOST=127.0.0.1", "MYAPP_DB__PORT=3306"]);

        let db = tree["db"].as_map().unwrap();
        assert_eq!(db["host"], Value::from("127.0.0.1"));
        assert_eq!(db["port"], Value::Integer(3306));
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_prefix_without_strip_keeps_prefix_segment() {
        let tree = EnvMaterializer::new()
            .with_prefix("APP_")
            .materialize(["APP_NAME=svc", "OTHER=x"]);
        assert_eq!(tree["app_name"], Value::from("svc"));
        assert!(!tree.contains_key("other"));
    }

    #[test]
    fn test_malformed_pairs_are_skipped() {
        let tree = EnvMaterializer::new().materialize(["NOEQUALS", "=value", "OK=1"]);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree["ok"], Value::Integer(1));
    }

    #[test]
    fn test_value_may_contain_equals() {
        let tree = EnvMaterializer::new().materialize(["DSN=a=b;c=d"]);
        assert_eq!(tree["dsn"], Value::from("a=b;c=d"));
    }

    #[test]
    fn test_empty_segments_are_dropped() {
        let tree = EnvMaterializer::new().materialize(["__A____B__=x", "____=y"]);
        let a = tree["a"].as_map().unwrap();
        assert_eq!(a["b"], Value::from("x"));
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_deeper_path_overwrites_scalar() {
        let tree = EnvMaterializer::new().materialize(["DB=plain", "DB__HOST=h"]);
        let db = tree["db"].as_map().unwrap();
        assert_eq!(db["host"], Value::from("h"));
    }

    #[test]
    fn test_empty_separator_keeps_single_segment() {
        let tree = EnvMaterializer::new()
            .with_separator("")
            .materialize(["DB__HOST=h"]);
        assert_eq!(tree["db__host"], Value::from("h"));
    }

    #[test]
    fn test_custom_normalizer_and_parser() {
        let tree = EnvMaterializer::new()
            .with_separator("_")
            .with_key_normalizer(|s| s.to_string())
            .with_value_parser(|raw| Value::from(raw))
            .materialize(["Server_Port=8080"]);
        let server = tree["Server"].as_map().unwrap();
        assert_eq!(server["Port"], Value::from("8080"));
    }
}
