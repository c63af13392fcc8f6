// SPDX-License-Identifier: MIT OR Apache-2.0

//! A hexagonal architecture configuration aggregation crate.
//!
//! `cfgweave` loads configuration from an ordered list of sources (files,
//! environment variables, HTTP endpoints, etcd, Redis, Apollo), decodes each
//! payload by its format tag, resolves `${NAME}` placeholders, deep-merges the
//! resulting trees so later sources win, and publishes the merged tree
//! atomically. Change coordinators watch upstream sources and report changes
//! so the caller can decide when to load again.
//!
//! # Architecture
//!
//! - **Domain Layer**: the generic tree ([`Value`](domain::Value),
//!   [`Tree`](domain::Tree)), dotted keys, payload metadata and errors
//! - **Ports**: the seams of the pipeline ([`ConfigSource`](ports::ConfigSource),
//!   [`Decoder`](ports::Decoder), [`MergeStrategy`](ports::MergeStrategy),
//!   [`VariableExpander`](ports::VariableExpander),
//!   [`ChangeCoordinator`](ports::ChangeCoordinator))
//! - **Adapters**: sources, decoders and change coordinators
//! - **Service**: the [`Aggregator`](service::Aggregator) facade and its
//!   default merge and expansion strategies
//!
//! # Feature Flags
//!
//! - `yaml`: YAML decoder (default)
//! - `toml`: TOML decoder (default)
//! - `env`: environment variable source (default)
//! - `reload`: file watching coordinator
//! - `etcd`: etcd source and watch feed
//! - `redis`: Redis source and keyspace notification feed
//! - `http`: HTTP source
//! - `apollo`: Apollo sources and long-poll notification client
//! - `remote`: all remote sources
//! - `full`: everything
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use cfgweave::adapters::{EnvSource, FileSource};
//! use cfgweave::prelude::*;
//!
//! # fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
//! let aggregator = Aggregator::builder()
//!     .with_env_expand("")
//!     .with_source(FileSource::new("config/base.yaml"))
//!     .with_source(FileSource::new("config/production.toml"))
//!     .with_source(EnvSource::new().with_prefix("APP_").strip_prefix(true))
//!     .build()?;
//!
//! let port = aggregator.get_int("server.port").unwrap_or(8080);
//! println!("listening on {}", port);
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod runtime;
pub mod service;

/// Commonly used types and traits.
///
/// This module re-exports the most commonly used types and traits for convenient access.
pub mod prelude {
    pub use crate::domain::{ConfigError, ConfigKey, ConfigurationService, Result, Tree, Value};
    pub use crate::ports::{
        ChangeCallback, ChangeCoordinator, ChangeNotice, ConfigSource, Decoder, MergeStrategy,
        Payload, VariableExpander,
    };
    pub use crate::service::Aggregator;
}
