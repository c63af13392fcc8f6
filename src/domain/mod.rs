// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain layer containing core business logic and types.
//!
//! The generic configuration tree, dotted keys, payload metadata, the
//! environment materializer and the error type live here. Nothing in this
//! layer performs I/O.

pub mod config_key;
pub mod duration;
pub mod errors;
pub mod materializer;
pub mod metadata;
pub mod path;
pub mod service;
pub mod value;

// Re-export commonly used types
pub use config_key::ConfigKey;
pub use duration::{format_duration, parse_duration};
pub use errors::{ConfigError, LoadStage, Result};
pub use materializer::{
    default_key_normalizer, default_value_parser, EnvMaterializer, KeyNormalizer, ValueParser,
};
pub use metadata::{
    detect_format_from_content_type, detect_format_from_path, normalize_format, Metadata,
};
pub use path::{insert_nested, leaf_keys, lookup};
pub use service::ConfigurationService;
pub use value::{Tree, Value};
