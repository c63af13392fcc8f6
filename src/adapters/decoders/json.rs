// SPDX-License-Identifier: MIT OR Apache-2.0

//! JSON format.

use crate::domain::{ConfigError, Result, Tree, Value};
use crate::ports::decoder::{is_blank, Decoder};

/// Decoder for the `json` format.
///
/// The document root must be an object; `null` decodes to an empty tree.
#[derive(Debug, Clone, Default)]
pub struct JsonDecoder;

impl JsonDecoder {
    /// Creates a new JSON decoder.
    pub fn new() -> Self {
        JsonDecoder
    }
}

impl Decoder for JsonDecoder {
    fn format(&self) -> &str {
        "json"
    }

    fn decode(&self, bytes: &[u8]) -> Result<Tree> {
        if is_blank(bytes) {
            return Ok(Tree::new());
        }

        let doc: serde_json::Value =
            serde_json::from_slice(bytes).map_err(|e| ConfigError::parse_error("json", e))?;
        if doc.is_null() {
            return Ok(Tree::new());
        }
        if !doc.is_object() {
            return Err(ConfigError::ParseError {
                message: format!("json document root must be an object, found {}", doc),
                source: None,
            });
        }
        match Value::from(doc) {
            Value::Map(tree) => Ok(tree),
            _ => Ok(Tree::new()),
        }
    }
}
