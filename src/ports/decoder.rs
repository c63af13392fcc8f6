// SPDX-License-Identifier: MIT OR Apache-2.0

//! Format decoder trait definition.
//!
//! A decoder turns one format's bytes into the generic [`Tree`]. Decoders are
//! stateless and registered with the aggregator under their format tag.

use crate::domain::{Result, Tree};

/// A trait for format decoders.
///
/// # Contract
///
/// - Empty input decodes to an empty tree, never an error.
/// - Malformed input is reported as a parse error, verbatim; there is no retry.
/// - Maps keyed by anything other than strings are normalized to string keys
///   recursively, including maps nested inside lists.
///
/// # Examples
///
/// ```rust
/// use cfgweave::ports::Decoder;
/// use cfgweave::domain::{Result, Tree, Value};
///
/// struct LinesDecoder;
///
/// impl Decoder for LinesDecoder {
///     fn format(&self) -> &str {
///         "lines"
///     }
///
///     fn decode(&self, bytes: &[u8]) -> Result<Tree> {
///         let text = String::from_utf8_lossy(bytes);
///         Ok(text
///             .lines()
///             .enumerate()
///             .map(|(i, line)| (i.to_string(), Value::from(line)))
///             .collect())
///     }
/// }
///
/// let tree = LinesDecoder.decode(b"a\nb").unwrap();
/// assert_eq!(tree["1"], Value::from("b"));
/// ```
pub trait Decoder: Send + Sync {
    /// Returns the format tag this decoder is registered under.
    fn format(&self) -> &str;

    /// Decodes a document into a tree.
    fn decode(&self, bytes: &[u8]) -> Result<Tree>;
}

/// Returns `true` when the input holds nothing but whitespace.
pub fn is_blank(bytes: &[u8]) -> bool {
    bytes.iter().all(u8::is_ascii_whitespace)
}
