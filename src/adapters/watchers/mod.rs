// SPDX-License-Identifier: MIT OR Apache-2.0

//! Change coordinators.
//!
//! Each coordinator implements [`ChangeCoordinator`](crate::ports::ChangeCoordinator)
//! for one family of upstream change signals:
//!
//! - [`StreamWatchCoordinator`] over a push subscription (`EtcdWatchFeed`,
//!   `RedisWatchFeed`)
//! - [`LongPollCoordinator`] over a notification-id protocol
//! - [`PollingCoordinator`] over any source, comparing payload bytes
//! - `FileWatchCoordinator` over a local file (`reload` feature)

#[cfg(feature = "etcd")]
pub mod etcd_watcher;
#[cfg(feature = "reload")]
pub mod file_watcher;
pub mod long_poll;
pub mod polling;
#[cfg(feature = "redis")]
pub mod redis_watcher;
pub mod stream_watch;

#[cfg(feature = "etcd")]
pub use etcd_watcher::{EtcdWatchFeed, EtcdWatchStream};
#[cfg(feature = "reload")]
pub use file_watcher::FileWatchCoordinator;
pub use long_poll::{LongPollCoordinator, Notification, NotificationTransport, PollOutcome};
pub use polling::PollingCoordinator;
#[cfg(feature = "redis")]
pub use redis_watcher::{RedisWatchFeed, RedisWatchStream};
pub use stream_watch::{StreamWatchCoordinator, WatchFeed, WatchStream};
