// SPDX-License-Identifier: MIT OR Apache-2.0

//! YAML format.

use crate::domain::{ConfigError, Result, Tree, Value};
use crate::ports::decoder::{is_blank, Decoder};

/// Decoder for the `yaml` format.
///
/// YAML allows keys of any type; they are rendered as strings, recursively,
/// including inside sequences. A document whose root is not a mapping decodes
/// to an empty tree.
#[derive(Debug, Clone, Default)]
pub struct YamlDecoder;

impl YamlDecoder {
    /// Creates a new YAML decoder.
    pub fn new() -> Self {
        YamlDecoder
    }

    fn key_to_string(key: serde_yaml::Value) -> Option<String> {
        match key {
            serde_yaml::Value::String(s) => Some(s),
            serde_yaml::Value::Number(n) => Some(n.to_string()),
            serde_yaml::Value::Bool(b) => Some(b.to_string()),
            serde_yaml::Value::Null => Some("null".to_string()),
            serde_yaml::Value::Tagged(tagged) => Self::key_to_string(tagged.value),
            complex => serde_yaml::to_string(&complex)
                .ok()
                .map(|s| s.trim().to_string()),
        }
    }

    fn convert(value: serde_yaml::Value) -> Value {
        match value {
            serde_yaml::Value::Null => Value::String(String::new()),
            serde_yaml::Value::Bool(b) => Value::Bool(b),
            serde_yaml::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_yaml::Value::String(s) => Value::String(s),
            serde_yaml::Value::Sequence(items) => {
                Value::List(items.into_iter().map(Self::convert).collect())
            }
            serde_yaml::Value::Mapping(map) => Value::Map(Self::convert_mapping(map)),
            serde_yaml::Value::Tagged(tagged) => Self::convert(tagged.value),
        }
    }

    fn convert_mapping(map: serde_yaml::Mapping) -> Tree {
        let mut tree = Tree::new();
        for (key, value) in map {
            match Self::key_to_string(key) {
                Some(key) => {
                    tree.insert(key, Self::convert(value));
                }
                None => tracing::debug!("dropping yaml entry with unrepresentable key"),
            }
        }
        tree
    }
}

impl Decoder for YamlDecoder {
    fn format(&self) -> &str {
        "yaml"
    }

    fn decode(&self, bytes: &[u8]) -> Result<Tree> {
        if is_blank(bytes) {
            return Ok(Tree::new());
        }

        let doc: serde_yaml::Value =
            serde_yaml::from_slice(bytes).map_err(|e| ConfigError::parse_error("yaml", e))?;
        match doc {
            serde_yaml::Value::Mapping(map) => Ok(Self::convert_mapping(map)),
            other => {
                tracing::debug!("yaml root is not a mapping ({:?}); using empty tree", other);
                Ok(Tree::new())
            }
        }
    }
}
