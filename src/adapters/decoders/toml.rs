// SPDX-License-Identifier: MIT OR Apache-2.0

//! TOML format.

use crate::domain::{ConfigError, Result, Tree, Value};
use crate::ports::decoder::{is_blank, Decoder};

/// Decoder for the `toml` format. Datetimes become strings.
#[derive(Debug, Clone, Default)]
pub struct TomlDecoder;

impl TomlDecoder {
    /// Creates a new TOML decoder.
    pub fn new() -> Self {
        TomlDecoder
    }

    fn convert(value: toml::Value) -> Value {
        match value {
            toml::Value::String(s) => Value::String(s),
            toml::Value::Integer(i) => Value::Integer(i),
            toml::Value::Float(f) => Value::Float(f),
            toml::Value::Boolean(b) => Value::Bool(b),
            toml::Value::Datetime(dt) => Value::String(dt.to_string()),
            toml::Value::Array(items) => Value::List(items.into_iter().map(Self::convert).collect()),
            toml::Value::Table(table) => Value::Map(Self::convert_table(table)),
        }
    }

    fn convert_table(table: toml::Table) -> Tree {
        table
            .into_iter()
            .map(|(k, v)| (k, Self::convert(v)))
            .collect()
    }
}

impl Decoder for TomlDecoder {
    fn format(&self) -> &str {
        "toml"
    }

    fn decode(&self, bytes: &[u8]) -> Result<Tree> {
        if is_blank(bytes) {
            return Ok(Tree::new());
        }

        let text = std::str::from_utf8(bytes).map_err(|e| ConfigError::parse_error("toml", e))?;
        let table: toml::Table =
            toml::from_str(text).map_err(|e| ConfigError::parse_error("toml", e))?;
        Ok(Self::convert_table(table))
    }
}
