// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the configuration crate.
//!
//! Every fallible operation in the crate returns [`ConfigError`]. The variants
//! follow the stages of the aggregation pipeline: reading bytes from a source,
//! decoding them, merging, placeholder expansion, and the change coordinators
//! that run next to the pipeline.

use std::fmt;
use thiserror::Error;

/// The pipeline stage at which a [`ConfigError::LoadFailed`] was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStage {
    /// Fetching raw bytes from the source.
    Load,
    /// Decoding bytes into a tree.
    Decode,
    /// Folding the decoded tree into the accumulated tree.
    Merge,
    /// Resolving placeholders in the merged tree.
    Expand,
}

impl fmt::Display for LoadStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self {
            LoadStage::Load => "load",
            LoadStage::Decode => "decode",
            LoadStage::Merge => "merge",
            LoadStage::Expand => "expand",
        };
        f.write_str(stage)
    }
}

/// The main error type for configuration operations.
///
/// It is marked as `#[non_exhaustive]` so new failure modes can be added
/// without breaking callers that match on it.
///
/// # Examples
///
/// ```
/// use cfgweave::domain::errors::ConfigError;
///
/// fn decoder_for(format: &str) -> Result<(), ConfigError> {
///     Err(ConfigError::NoDecoder {
///         format: format.to_string(),
///     })
/// }
///
/// let err = decoder_for("ini").unwrap_err();
/// assert_eq!(err.to_string(), "no decoder registered for format: ini");
/// ```
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The requested configuration key was not found.
    #[error("Configuration key not found: {key}")]
    ConfigKeyNotFound {
        /// The key that was not found
        key: String,
    },

    /// Failed to convert configuration data to the requested type.
    #[error(
        "Failed to convert configuration value for key '{key}' to type {target_type}: {source}"
    )]
    TypeConversionError {
        /// The key being converted, empty for the whole tree
        key: String,
        /// The target type name
        target_type: String,
        /// The underlying conversion error
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A source could not produce its raw bytes.
    #[error("Configuration source '{source_name}' error: {message}")]
    SourceError {
        /// The name of the source that encountered the error
        source_name: String,
        /// The error message
        message: String,
        /// The underlying error, if any
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// No decoder is registered for the format a source declared.
    #[error("no decoder registered for format: {format}")]
    NoDecoder {
        /// The normalized format tag
        format: String,
    },

    /// A format could not be inferred from a path, URL or content type.
    #[error("unable to detect configuration format from '{hint}'")]
    UnknownFormat {
        /// The path, key or content type that was inspected
        hint: String,
    },

    /// Failed to decode configuration bytes.
    #[error("Failed to parse configuration: {message}")]
    ParseError {
        /// The error message
        message: String,
        /// The underlying parsing error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The properties text violates the properties grammar.
    #[error("properties syntax error at line {line}: {message}")]
    GrammarError {
        /// One-based logical line number
        line: usize,
        /// What went wrong
        message: String,
    },

    /// A merge strategy refused to combine two trees.
    #[error("merge failed: {message}")]
    MergeError {
        /// The error message
        message: String,
    },

    /// A `${source.key|default}` token is malformed.
    #[error("invalid placeholder in '{input}': {message}")]
    PlaceholderError {
        /// The string that contained the token
        input: String,
        /// What is wrong with the token
        message: String,
    },

    /// Strict expansion found a placeholder with no value and no default.
    #[error("unresolved placeholder: {name}")]
    UnresolvedPlaceholder {
        /// The effective lookup name that missed
        name: String,
    },

    /// A source failed somewhere in the aggregation pipeline.
    #[error("{stage} source '{source_name}' failed: {source}")]
    LoadFailed {
        /// Display name of the offending source
        source_name: String,
        /// The stage that failed
        stage: LoadStage,
        /// The originating error
        #[source]
        source: Box<ConfigError>,
    },

    /// An error occurred in a change coordinator.
    #[error("Configuration watcher error: {message}")]
    WatcherError {
        /// The error message
        message: String,
        /// The underlying error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// An I/O error occurred while reading configuration.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ConfigError {
    /// Creates a `SourceError` that carries an underlying error.
    pub fn source_error<E>(source_name: impl Into<String>, message: impl Into<String>, err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        ConfigError::SourceError {
            source_name: source_name.into(),
            message: message.into(),
            source: Some(Box::new(err)),
        }
    }

    /// Creates a `ParseError` from a decoder's native error.
    pub fn parse_error<E>(format: &str, err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        ConfigError::ParseError {
            message: format!("invalid {} document: {}", format, err),
            source: Some(Box::new(err)),
        }
    }

    /// Creates a `WatcherError` that carries an underlying error.
    pub fn watcher_error<E>(message: impl Into<String>, err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        ConfigError::WatcherError {
            message: message.into(),
            source: Some(Box::new(err)),
        }
    }

    /// Wraps this error with the display name of the source and the failing stage.
    pub fn in_source(self, source_name: impl Into<String>, stage: LoadStage) -> Self {
        ConfigError::LoadFailed {
            source_name: source_name.into(),
            stage,
            source: Box::new(self),
        }
    }
}

/// A specialized Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;
