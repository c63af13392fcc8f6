// SPDX-License-Identifier: MIT OR Apache-2.0

//! Service layer: the aggregator and its default strategies.
//!
//! [`Aggregator`] is the configuration facade. It owns the decoder registry,
//! the merge strategy and the placeholder expander, and publishes the merged
//! tree that [`ConfigurationService`](crate::domain::ConfigurationService)
//! readers see.

pub mod aggregator;
pub mod expand;
pub mod merge;

// Re-export commonly used types
pub use aggregator::{Aggregator, AggregatorBuilder, AGGREGATED_SOURCE};
pub use expand::{expand_tree, lookup_name, DefaultExpander, UnresolvedPolicy};
pub use merge::{deep_merge, DeepMerge};
