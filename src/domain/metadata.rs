// SPDX-License-Identifier: MIT OR Apache-2.0

//! Payload metadata and format tags.

use crate::domain::errors::{ConfigError, Result};
use std::path::Path;

/// Describes a byte payload produced by a source.
///
/// `format` selects the decoder; `source` is the display name used in logs
/// and in wrapped errors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Metadata {
    /// Format tag such as `json`, `yaml`, `toml` or `properties`
    pub format: String,
    /// Display name of the originating source
    pub source: String,
}

impl Metadata {
    /// Creates metadata for a payload.
    pub fn new(format: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            format: format.into(),
            source: source.into(),
        }
    }
}

/// Canonicalizes a format tag: trimmed, lower-cased, `yml` becomes `yaml`.
///
/// # Examples
///
/// ```
/// use cfgweave::domain::normalize_format;
///
/// assert_eq!(normalize_format(" YML "), "yaml");
/// assert_eq!(normalize_format("Json"), "json");
/// ```
pub fn normalize_format(format: &str) -> String {
    let format = format.trim().to_ascii_lowercase();
    if format == "yml" {
        "yaml".to_string()
    } else {
        format
    }
}

/// Infers the format tag from a file extension.
pub fn detect_format_from_path(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("json") => Ok("json".to_string()),
        Some("yaml") | Some("yml") => Ok("yaml".to_string()),
        Some("toml") => Ok("toml".to_string()),
        Some("properties") => Ok("properties".to_string()),
        _ => Err(ConfigError::UnknownFormat {
            hint: path.display().to_string(),
        }),
    }
}

/// Infers the format tag from an HTTP `Content-Type` header value.
///
/// Parameters such as `; charset=utf-8` are ignored.
pub fn detect_format_from_content_type(content_type: &str) -> Result<String> {
    let media_type = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    match media_type.as_str() {
        "application/json" => Ok("json".to_string()),
        "application/x-yaml" | "text/yaml" | "text/x-yaml" => Ok("yaml".to_string()),
        "application/toml" | "text/x-toml" => Ok("toml".to_string()),
        _ => Err(ConfigError::UnknownFormat {
            hint: content_type.to_string(),
        }),
    }
}
