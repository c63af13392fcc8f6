// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapters layer: decoders, sources and change coordinators.
//!
//! Every source implements [`ConfigSource`](crate::ports::ConfigSource) and
//! yields raw bytes plus a format tag; the decoders registered on the
//! aggregator turn those bytes into trees. Network-backed adapters sit behind
//! Cargo features.

pub mod decoders;
#[cfg(feature = "env")]
pub mod env;
pub mod file;
pub mod watchers;

#[cfg(feature = "apollo")]
pub mod apollo;
#[cfg(feature = "etcd")]
pub mod etcd;
#[cfg(feature = "http")]
pub mod http;
#[cfg(feature = "redis")]
pub mod redis;

// Re-export adapters based on feature flags
#[cfg(feature = "env")]
pub use env::EnvSource;
pub use file::FileSource;

#[cfg(feature = "apollo")]
pub use apollo::{
    ApolloEndpoint, ApolloMultiSource, ApolloNamespace, ApolloNotificationClient, ApolloSource,
    FallbackCache,
};
#[cfg(feature = "etcd")]
pub use etcd::EtcdSource;
#[cfg(feature = "http")]
pub use http::HttpSource;
#[cfg(feature = "redis")]
pub use self::redis::RedisSource;
