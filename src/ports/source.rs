// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration source trait definition.
//!
//! A source produces raw bytes plus the [`Metadata`] that says how to decode
//! them. Sources know nothing about trees, merging or placeholders.

use crate::domain::{Metadata, Result};
use std::sync::Arc;

/// Raw bytes produced by a source together with their metadata.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Payload {
    /// The undecoded document
    pub bytes: Vec<u8>,
    /// Format tag and display name
    pub metadata: Metadata,
}

impl Payload {
    /// Creates a payload.
    pub fn new(bytes: impl Into<Vec<u8>>, format: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            metadata: Metadata::new(format, source),
        }
    }
}

/// A trait for configuration sources.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`: the aggregator may be asked to load
/// from any thread, and coordinators poll sources from background tasks.
///
/// # Blocking
///
/// `load` is synchronous. Network-backed sources drive their async clients on
/// a shared runtime, so `load` must not be awaited from inside a
/// current-thread runtime without moving it to a blocking task.
///
/// # Examples
///
/// ```rust
/// use cfgweave::ports::{ConfigSource, Payload};
/// use cfgweave::domain::Result;
///
/// struct Inline;
///
/// impl ConfigSource for Inline {
///     fn name(&self) -> &str {
///         "inline"
///     }
///
///     fn load(&self) -> Result<Payload> {
///         Ok(Payload::new(r#"{"port": 8080}"#, "json", self.name()))
///     }
/// }
///
/// let payload = Inline.load().unwrap();
/// assert_eq!(payload.metadata.format, "json");
/// ```
pub trait ConfigSource: Send + Sync {
    /// Returns the display name used in logs and wrapped errors.
    fn name(&self) -> &str;

    /// Fetches the raw document.
    ///
    /// # Errors
    ///
    /// Returns a source error when the bytes cannot be obtained.
    fn load(&self) -> Result<Payload>;
}

impl<T: ConfigSource + ?Sized> ConfigSource for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn load(&self) -> Result<Payload> {
        (**self).load()
    }
}

impl<T: ConfigSource + ?Sized> ConfigSource for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn load(&self) -> Result<Payload> {
        (**self).load()
    }
}
