// SPDX-License-Identifier: MIT OR Apache-2.0

//! Format decoders.
//!
//! JSON and properties are always available; YAML and TOML follow the `yaml`
//! and `toml` features.

pub mod json;
pub mod properties;
#[cfg(feature = "toml")]
pub mod toml;
#[cfg(feature = "yaml")]
pub mod yaml;

pub use self::json::JsonDecoder;
pub use properties::{nest_properties, parse_properties, PropertiesDecoder};
#[cfg(feature = "toml")]
pub use self::toml::TomlDecoder;
#[cfg(feature = "yaml")]
pub use self::yaml::YamlDecoder;

use crate::domain::normalize_format;
use crate::ports::Decoder;
use std::sync::Arc;

/// Returns every decoder compiled into the crate.
pub fn builtin_decoders() -> Vec<Arc<dyn Decoder>> {
    let mut decoders: Vec<Arc<dyn Decoder>> =
        vec![Arc::new(JsonDecoder::new()), Arc::new(PropertiesDecoder::new())];
    #[cfg(feature = "yaml")]
    decoders.push(Arc::new(YamlDecoder::new()));
    #[cfg(feature = "toml")]
    decoders.push(Arc::new(TomlDecoder::new()));
    decoders
}

/// Finds the built-in decoder for a format tag, after normalization.
pub fn builtin_decoder(format: &str) -> Option<Arc<dyn Decoder>> {
    let format = normalize_format(format);
    builtin_decoders()
        .into_iter()
        .find(|decoder| decoder.format() == format)
}
