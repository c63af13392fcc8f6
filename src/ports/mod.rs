// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ports layer containing trait definitions.
//!
//! These traits are the seams of the aggregation pipeline: where bytes come
//! from, how they are decoded, how trees combine, how placeholders resolve and
//! how upstream change is reported. Adapters and the service layer implement
//! them.

pub mod decoder;
pub mod expander;
pub mod merge;
pub mod source;
pub mod watcher;

// Re-export commonly used types
pub use decoder::Decoder;
pub use expander::{env_lookup, Lookup, VariableExpander};
pub use merge::MergeStrategy;
pub use source::{ConfigSource, Payload};
pub use watcher::{
    channel_callback, spawn_coordinator, ChangeCallback, ChangeCoordinator, ChangeNotice,
};
